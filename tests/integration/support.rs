//! Simulated GPIO controller and recording collaborators shared by the
//! integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use reefmon::core::channel::{ChannelSettings, Connector, DeviceChannel, Transport};
use reefmon::core::report::{MeasurementLog, Notifier, Publisher};
use reefmon::{ChannelFailure, Config, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared state of the simulated controller
#[derive(Default)]
pub struct Device {
    /// Reply per command, e.g. `"adc read 3"`
    pub values: HashMap<String, u16>,
    pub password: String,
    /// Opens still to be refused
    pub refuse_opens: u32,
    /// Reads still to be answered with garbage
    pub garbage_reads: u32,
    pub opens: u32,
    pub commands: Vec<String>,
    /// Set when an open is refused, standing in for Ctrl+C mid-backoff
    pub trip_on_refuse: Option<Arc<AtomicBool>>,
}

impl Device {
    pub fn new(password: &str) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            password: password.to_string(),
            ..Default::default()
        }))
    }
}

pub fn set_value(device: &Rc<RefCell<Device>>, command: &str, value: u16) {
    device.borrow_mut().values.insert(command.to_string(), value);
}

#[derive(Clone)]
pub struct SimConnector {
    pub device: Rc<RefCell<Device>>,
}

pub struct SimSession {
    device: Rc<RefCell<Device>>,
    outgoing: VecDeque<String>,
    logins: u32,
}

impl Connector for SimConnector {
    type Transport = SimSession;

    fn open(&mut self, _timeout: Duration) -> std::result::Result<SimSession, ChannelFailure> {
        let mut device = self.device.borrow_mut();
        device.opens += 1;
        if device.refuse_opens > 0 {
            device.refuse_opens -= 1;
            if let Some(flag) = &device.trip_on_refuse {
                flag.store(true, Ordering::Relaxed);
            }
            return Err(ChannelFailure::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(SimSession {
            device: self.device.clone(),
            outgoing: VecDeque::from(vec!["\r\nUser Name: ".to_string()]),
            logins: 0,
        })
    }
}

impl Transport for SimSession {
    fn send(&mut self, text: &str) -> std::result::Result<(), ChannelFailure> {
        let line = text.trim_end().to_string();
        let mut device = self.device.borrow_mut();
        device.commands.push(line.clone());

        match self.logins {
            0 => {
                self.logins = 1;
                self.outgoing.push_back("Password: ".to_string());
            }
            1 => {
                self.logins = 2;
                if line == device.password {
                    self.outgoing.push_back("Welcome\r\n>>".to_string());
                }
            }
            _ => {
                if device.garbage_reads > 0 {
                    device.garbage_reads -= 1;
                    self.outgoing.push_back("Unknown command\r\n>".to_string());
                } else if let Some(value) = device.values.get(&line) {
                    self.outgoing.push_back(format!("{}\r\n>", value));
                }
            }
        }
        Ok(())
    }

    fn read_until(
        &mut self,
        marker: &str,
        timeout: Duration,
    ) -> std::result::Result<String, ChannelFailure> {
        match self.outgoing.pop_front() {
            Some(text) => match text.find(marker) {
                Some(end) => Ok(text[..end].to_string()),
                None => Err(ChannelFailure::Timeout {
                    waiting_for: marker.to_string(),
                    timeout,
                }),
            },
            None => Err(ChannelFailure::Timeout {
                waiting_for: marker.to_string(),
                timeout,
            }),
        }
    }

    fn close(&mut self) {}
}

pub fn sim_channel(device: &Rc<RefCell<Device>>, config: &Config) -> DeviceChannel<SimConnector> {
    let mut settings = ChannelSettings::from_config(config);
    settings.reconnect_delay = Duration::ZERO;
    DeviceChannel::new(
        SimConnector {
            device: device.clone(),
        },
        settings,
    )
}

/// Notifier that keeps every delivery
#[derive(Clone, Default)]
pub struct Outbox {
    pub sent: Rc<RefCell<Vec<(Vec<String>, String)>>>,
}

impl Notifier for Outbox {
    fn notify(&mut self, alerts: &[String], status: &str) -> Result<()> {
        self.sent
            .borrow_mut()
            .push((alerts.to_vec(), status.to_string()));
        Ok(())
    }
}

/// Publisher that counts publishes and remembers the published contents
#[derive(Clone, Default)]
pub struct Board {
    pub published: Rc<RefCell<Vec<String>>>,
}

impl Publisher for Board {
    fn publish(&mut self, status_file: &Path) -> Result<()> {
        let text = std::fs::read_to_string(status_file)?;
        self.published.borrow_mut().push(text);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct Rows {
    pub rows: Rc<RefCell<Vec<(NaiveDateTime, f64)>>>,
}

impl MeasurementLog for Rows {
    fn append(&mut self, at: NaiveDateTime, value: f64) -> Result<()> {
        self.rows.borrow_mut().push((at, value));
        Ok(())
    }
}

pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

/// A complete config with the given sensor lines, writing into `dir`
pub fn config_text(dir: &Path, sensors: &str) -> String {
    format!(
        "username=admin\n\
         password=reef\n\
         tcpip=127.0.0.1\n\
         connect_timeout=1\n\
         reconnect_delay=0\n\
         reconnect_attempts=3\n\
         server_update_freq=300\n\
         sample_time=10\n\
         stats_file={}\n\
         cloud_store={}/\n\
         {}",
        dir.join("status.txt").display(),
        dir.display(),
        sensors
    )
}

pub fn status_path(dir: &Path) -> PathBuf {
    dir.join("status.txt")
}
