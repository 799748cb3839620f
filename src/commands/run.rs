//! Run command handler.
//!
//! Connects to the GPIO controller and runs the monitor loop until Ctrl+C.

use anyhow::{Context, Result};
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::channel::{ChannelSettings, DeviceChannel, TelnetConnector};
use crate::core::monitor::{Controller, Reporters};
use crate::core::report::{
    CopyPublisher, FileMeasurementLog, LogOnlyNotifier, Notifier, SmtpNotifier,
};
use crate::core::Config;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let path = super::config_path(matches)?;
    let config = Config::load(&path)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Termination requested, finishing current cycle...".yellow());
        shutdown_handler.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let notifier: Box<dyn Notifier> = match &config.email {
        Some(settings) => Box::new(SmtpNotifier::new(
            settings.clone(),
            config.current_status_path().to_string_lossy(),
        )),
        None => {
            log::warn!("No smtp host configured; alerts will only be logged");
            Box::new(LogOnlyNotifier)
        }
    };

    let reporters = Reporters {
        status_file: config.stats_file.clone(),
        publisher: Box::new(CopyPublisher::new(config.current_status_path())),
        notifier,
        measurements: Box::new(FileMeasurementLog::new(config.measurement_log_path())),
    };

    let channel = DeviceChannel::new(
        TelnetConnector::new(config.address.clone()),
        ChannelSettings::from_config(&config),
    );

    let mut controller = Controller::new(&config, channel, reporters, Local::now().naive_local())
        .context("Invalid sensor configuration")?;

    println!(
        "{} {} sensors on {} every {}s",
        "Monitoring".cyan().bold(),
        controller.sensors().len(),
        config.address,
        config.sample_time
    );
    println!("{}", "Press Ctrl+C to stop".dimmed());

    controller
        .run(shutdown)
        .context("Monitor terminated")
}
