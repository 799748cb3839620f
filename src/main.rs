use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use colored::*;

use reefmon::commands;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Path to config.txt (default: ./config.txt, then the user config directory)")
}

fn main() -> Result<()> {
    reefmon::init_logging();

    let matches = Command::new("reefmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reef aquarium monitor for networked GPIO controllers")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("run")
                .about("Connect to the controller and monitor until Ctrl+C")
                .arg(config_arg())
        )
        .subcommand(
            Command::new("check")
                .about("Validate the configuration without connecting")
                .arg(config_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the parsed configuration as JSON")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("version")
                .about("Shows version information")
        )
        .get_matches();

    if matches.get_flag("version") {
        return commands::version();
    }

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run(sub_matches),
        Some(("check", sub_matches)) => commands::check(sub_matches),
        Some(("version", _)) => commands::version(),
        _ => {
            println!("{}", "No command given. Use 'reefmon --help' for usage.".yellow());
            Ok(())
        }
    }
}
