use anyhow::{Context, Result};
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use serde::Serialize;

use crate::core::alerts::AlertEvaluator;
use crate::core::config::SensorDecl;
use crate::core::sensor::Sensor;
use crate::core::Config;

#[derive(Serialize)]
struct CheckOutput<'a> {
    config: &'a Config,
    valid: bool,
}

/// Parse the configuration and build every sensor without connecting
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let path = super::config_path(matches)?;
    let config = Config::load(&path)?;

    validate_sensors(&config)?;

    if matches.get_flag("json") {
        let output = CheckOutput {
            config: &config,
            valid: true,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {}", "Config:".bold(), path.display());
    println!("  controller   {}", config.address);
    println!("  sample time  {}s", config.sample_time);
    println!("  publish      every {}s", config.server_update_freq);
    println!(
        "  email        {}",
        match &config.email {
            Some(email) => email.recipients.join(", "),
            None => "disabled".dimmed().to_string(),
        }
    );
    println!();

    for decl in &config.sensors {
        print_sensor(decl);
    }

    println!();
    println!(
        "{}",
        format!("✓ {} sensors configured", config.sensors.len()).green()
    );
    Ok(())
}

fn validate_sensors(config: &Config) -> Result<()> {
    let now = Local::now().naive_local();
    for decl in &config.sensors {
        Sensor::from_decl(decl, config.sample_time, now)
            .with_context(|| format!("Sensor {:?}", decl.label))?;
        AlertEvaluator::from_decl(decl, now).with_context(|| format!("Sensor {:?}", decl.label))?;
    }
    Ok(())
}

fn print_sensor(decl: &SensorDecl) {
    let resource = decl.kind.resource();
    println!(
        "  {:<20} {:<6} {} {:<3} nag {:>3}h  rule {}",
        decl.label.cyan(),
        decl.kind.tag(),
        resource.command(),
        decl.index,
        decl.nag_hours,
        decl.rule.yellow()
    );
}
