use reefmon::core::monitor::{Controller, Reporters};
use reefmon::core::report::{CopyPublisher, FileMeasurementLog, LogOnlyNotifier, SmtpNotifier};
use reefmon::Config;
use std::fs;
use tempfile::TempDir;

use super::support::*;

#[test]
fn test_file_collaborators_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::parse(&config_text(
        temp_dir.path(),
        "ph, 0, 6, PH, 7.5-8.6, 59.0, 0.0\nhilow, 1, 6, ATO, 0-1023, High, Low, OK\n",
    ))
    .unwrap();

    let device = Device::new("reef");
    set_value(&device, "adc read 0", 472);
    set_value(&device, "adc read 1", 900);

    let reporters = Reporters {
        status_file: config.stats_file.clone(),
        publisher: Box::new(CopyPublisher::new(config.current_status_path())),
        notifier: Box::new(LogOnlyNotifier),
        measurements: Box::new(FileMeasurementLog::new(config.measurement_log_path())),
    };
    let mut controller =
        Controller::new(&config, sim_channel(&device, &config), reporters, at(9, 0, 0)).unwrap();
    controller.connect().unwrap();

    let first = controller.run_cycle(at(9, 0, 10)).unwrap();
    assert!(first.published);
    assert!(first.status.contains("ATO:OK\n"));
    assert_eq!(fs::read_to_string(config.current_status_path()).unwrap(), first.status);

    // second cycle is inside the publish interval
    let second = controller.run_cycle(at(10, 0, 0)).unwrap();
    assert!(!second.published);
    assert_eq!(fs::read_to_string(status_path(temp_dir.path())).unwrap(), second.status);
    assert_eq!(fs::read_to_string(config.current_status_path()).unwrap(), first.status);

    let log = fs::read_to_string(config.measurement_log_path()).unwrap();
    assert_eq!(log, "2024-03-04 10:00:00,8.0\n");
}

#[test]
fn test_alert_mail_body() {
    let notifier = SmtpNotifier::new(
        reefmon::core::config::EmailSettings {
            smtp_host: "smtp.example.com".to_string(),
            smtp_password: String::new(),
            recipients: vec!["keeper@example.com".to_string()],
            subject: "Reef alert".to_string(),
            from: "reef@example.com".to_string(),
        },
        "/home/reef/Dropbox/current.txt",
    );

    let status = "Monitor start time: Monday March 04 09:00:00 AM\nPH:8.0";
    let body = notifier.compose_body(&["PH Alert!".to_string()], status);
    assert!(body.starts_with("PH Alert!\n\nMonitor start time"));
    assert!(body.ends_with("PH:8.0\n/home/reef/Dropbox/current.txt\n"));
}
