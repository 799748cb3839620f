use chrono::NaiveDate;
use reefmon::core::sensor::{Sensor, SensorKind};
use reefmon::core::AlertEvaluator;
use reefmon::{Config, ReefError};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const FULL_CONFIG: &str = "\
# Reef monitor configuration
username=admin
password=reef
tcpip=192.168.1.50
connect_timeout=5
reconnect_delay=30
reconnect_attempts=10
server_update_freq=600
sample_time=10
stats_file=/var/tmp/reef_status.txt
cloud_store=/home/reef/Dropbox/
smtp=smtp.example.com
smtp_password=app-password
notify=keeper@example.com
email_from=reef@example.com
email_subject=Reef tank alert

gpioa, 0, 12, Return pump, 100-1023
gpiod, 1, 12, Skimmer, 1, Off, On
temp, 2, 4, Tank temp, 76-80, 10000, -0.5
rflow, 3, 2, Wavemaker, 20-1023
flow, 4, 2, Sump flow, 300-1023
light, 5, 24, Lights, 08:00-20:00=600-1023+20:30-07:30=0-200
floor, 6, 1, Floor, 1, Wet, Dry
co2, 7, 6, CO2, 0-1, On for, Off for
hilow, 1, 6, ATO reservoir, 256-1023, High, Low, OK
ph, 6, 6, PH, 7.9-8.5, 59.0, 0.0
";

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.txt");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.address, "192.168.1.50:23");
    assert_eq!(config.reconnect_delay, Duration::from_secs(30));
    assert_eq!(config.server_update_freq, 600);
    assert_eq!(config.stats_file, PathBuf::from("/var/tmp/reef_status.txt"));
    assert_eq!(
        config.current_status_path(),
        PathBuf::from("/home/reef/Dropbox/current.txt")
    );

    let email = config.email.as_ref().unwrap();
    assert_eq!(email.subject, "Reef tank alert");
    assert_eq!(email.smtp_password, "app-password");
    assert_eq!(email.recipients, vec!["keeper@example.com"]);
}

#[test]
fn test_every_sensor_kind_in_file_order() {
    let config = Config::parse(FULL_CONFIG).unwrap();
    let kinds: Vec<SensorKind> = config.sensors.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, SensorKind::ALL.to_vec());

    let light = &config.sensors[5];
    assert_eq!(light.rule, "08:00-20:00=600-1023+20:30-07:30=0-200");
    let hilow = &config.sensors[8];
    assert_eq!(hilow.extra, vec!["High", "Low", "OK"]);
}

#[test]
fn test_every_declaration_builds() {
    let config = Config::parse(FULL_CONFIG).unwrap();
    let now = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();

    for decl in &config.sensors {
        let sensor = Sensor::from_decl(decl, config.sample_time, now).unwrap();
        assert_eq!(sensor.label(), decl.label);
        assert_eq!(sensor.resource(), (decl.kind.resource(), decl.index));
        AlertEvaluator::from_decl(decl, now).unwrap();
    }
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(&temp_dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, ReefError::Config(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_bad_sensor_line_reports_line_number() {
    let text = FULL_CONFIG.replace("gpiod, 1, 12, Skimmer", "gpiod, one, 12, Skimmer");
    let err = Config::parse(&text).unwrap_err();
    assert!(err.to_string().contains("line 19"), "{}", err);
}

#[test]
fn test_missing_calibration_fields_rejected_at_build() {
    let text = FULL_CONFIG.replace("temp, 2, 4, Tank temp, 76-80, 10000, -0.5", "temp, 2, 4, Tank temp, 76-80");
    let config = Config::parse(&text).unwrap();
    let now = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let err = Sensor::from_decl(&config.sensors[2], config.sample_time, now).unwrap_err();
    assert!(err.to_string().contains("pad_resistor"));
}

#[test]
fn test_password_not_serialized() {
    let config = Config::parse(FULL_CONFIG).unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("app-password"));
    assert!(!json.contains("\"password\""));
    assert!(json.contains("\"username\":\"admin\""));
}
