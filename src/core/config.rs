//! Monitor configuration.
//!
//! The configuration file is plain text with one entry per line. Settings are
//! `key=value` pairs; sensor declarations are comma separated field lists
//! whose first field is a sensor kind tag:
//!
//! ```text
//! username=admin
//! tcpip=192.168.1.50
//! sample_time=10
//! temp, 1, 4, Tank temperature, 76-80, 10000, -0.5
//! light, 2, 24, Lights, 08:00-20:00=600-1023+20:30-07:30=0-200
//! ```

use log::warn;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::sensor::SensorKind;
use crate::error::{ReefError, Result};

const DEFAULT_TELNET_PORT: u16 = 23;
const CONFIG_FILE_NAME: &str = "config.txt";

/// One sensor declaration, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDecl {
    pub kind: SensorKind,
    pub index: u32,
    pub nag_hours: u32,
    pub label: String,
    pub rule: String,
    /// Variant specific calibration / rendering fields
    pub extra: Vec<String>,
}

/// SMTP settings, present only when an `smtp` host is configured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    #[serde(skip)]
    pub smtp_password: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub username: String,
    #[serde(skip)]
    pub password: String,
    /// `host:port` of the GPIO controller
    pub address: String,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub reconnect_attempts: u32,
    /// Seconds between external status publishes
    pub server_update_freq: u64,
    /// Seconds between sampling cycles
    pub sample_time: u64,
    pub stats_file: PathBuf,
    /// Directory prefix, used verbatim, for `current.txt` and `phlog.txt`
    pub cloud_store: String,
    pub email: Option<EmailSettings>,
    pub sensors: Vec<SensorDecl>,
}

#[derive(Default)]
struct RawSettings {
    username: Option<String>,
    password: Option<String>,
    tcpip: Option<String>,
    connect_timeout: Option<String>,
    reconnect_delay: Option<String>,
    reconnect_attempts: Option<String>,
    server_update_freq: Option<String>,
    sample_time: Option<String>,
    stats_file: Option<String>,
    cloud_store: Option<String>,
    smtp: Option<String>,
    smtp_password: Option<String>,
    notify: Option<String>,
    email_subject: Option<String>,
    email_from: Option<String>,
}

impl Config {
    /// Load and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ReefError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::parse(&text)
    }

    /// Locate the configuration file: `./config.txt` first, then the user
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir().map(|dir| dir.join("reefmon").join(CONFIG_FILE_NAME))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut raw = RawSettings::default();
        let mut sensors = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let first = line.split(',').next().unwrap_or_default().trim();
            if let Some(kind) = SensorKind::from_tag(first) {
                sensors.push(parse_sensor_line(kind, line, number + 1)?);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ReefError::config(format!(
                    "line {}: expected key=value or a sensor declaration, got {:?}",
                    number + 1,
                    line
                )));
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                "username" => raw.username = value,
                "password" => raw.password = value,
                "tcpip" => raw.tcpip = value,
                "connect_timeout" => raw.connect_timeout = value,
                "reconnect_delay" => raw.reconnect_delay = value,
                "reconnect_attempts" => raw.reconnect_attempts = value,
                "server_update_freq" => raw.server_update_freq = value,
                "sample_time" => raw.sample_time = value,
                "stats_file" => raw.stats_file = value,
                "cloud_store" => raw.cloud_store = value,
                "smtp" => raw.smtp = value,
                "smtp_password" => raw.smtp_password = value,
                "notify" => raw.notify = value,
                "email_subject" => raw.email_subject = value,
                "email_from" => raw.email_from = value,
                other => warn!("Ignoring unknown config key {:?} on line {}", other, number + 1),
            }
        }

        let sample_time = parse_number::<u64>("sample_time", required("sample_time", raw.sample_time)?)?;
        if sample_time == 0 {
            return Err(ReefError::config("sample_time must be greater than zero"));
        }

        let email = match raw.smtp {
            Some(smtp_host) if !smtp_host.is_empty() => Some(EmailSettings {
                smtp_host,
                smtp_password: raw.smtp_password.unwrap_or_default(),
                recipients: raw
                    .notify
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect(),
                subject: raw.email_subject.unwrap_or_else(|| "Reef monitor alert".to_string()),
                from: raw.email_from.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Config {
            username: required("username", raw.username)?,
            password: required("password", raw.password)?,
            address: with_default_port(&required("tcpip", raw.tcpip)?),
            connect_timeout: Duration::from_secs(parse_number(
                "connect_timeout",
                required("connect_timeout", raw.connect_timeout)?,
            )?),
            reconnect_delay: Duration::from_secs(parse_number(
                "reconnect_delay",
                required("reconnect_delay", raw.reconnect_delay)?,
            )?),
            reconnect_attempts: parse_number(
                "reconnect_attempts",
                required("reconnect_attempts", raw.reconnect_attempts)?,
            )?,
            server_update_freq: parse_number(
                "server_update_freq",
                required("server_update_freq", raw.server_update_freq)?,
            )?,
            sample_time,
            stats_file: PathBuf::from(required("stats_file", raw.stats_file)?),
            cloud_store: required("cloud_store", raw.cloud_store)?,
            email,
            sensors,
        })
    }

    /// Path of the published status copy
    pub fn current_status_path(&self) -> PathBuf {
        PathBuf::from(format!("{}current.txt", self.cloud_store))
    }

    /// Path of the pH measurement log
    pub fn measurement_log_path(&self) -> PathBuf {
        PathBuf::from(format!("{}phlog.txt", self.cloud_store))
    }
}

fn parse_sensor_line(kind: SensorKind, line: &str, number: usize) -> Result<SensorDecl> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(ReefError::config(format!(
            "line {}: sensor declaration needs kind, index, nag hours, label and rule",
            number
        )));
    }

    Ok(SensorDecl {
        kind,
        index: parse_number("sensor index", fields[1].to_string())
            .map_err(|e| ReefError::config(format!("line {}: {}", number, e)))?,
        nag_hours: parse_number("nag hours", fields[2].to_string())
            .map_err(|e| ReefError::config(format!("line {}: {}", number, e)))?,
        label: fields[3].to_string(),
        rule: fields[4].to_string(),
        extra: fields[5..].iter().map(|f| f.to_string()).collect(),
    })
}

fn required(key: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| ReefError::config(format!("missing required setting {:?}", key)))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: String) -> Result<T> {
    value
        .parse()
        .map_err(|_| ReefError::config(format!("{} is not a valid number: {:?}", key, value)))
}

fn with_default_port(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_TELNET_PORT)
    }
}
