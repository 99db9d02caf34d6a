//! # Automail
//!
//! Runs one mail-delivery simulation and prints the final report.
//!
//! The configuration comes from `--config FILE`, or from an
//! `automail.{ron,toml,json}` in the working directory, or the built-in
//! defaults. `--seed` overrides the configured seed; with neither, a seed is
//! taken from the system clock and printed so the run can be repeated.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use automail_data::config::load_config_dir;
use automail_data::{SimulationConfig, load_config};
use automail_stats::{DeliveryStats, Report};
use clap::Parser;
use tracing::{error, info};

/// Automail - simulate robots delivering mail in a building
#[derive(Parser)]
#[command(name = "automail")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, env = "AUTOMAIL_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Random seed for mail generation (overrides the configured seed)
    #[arg(short, long, value_name = "N")]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AUTOMAIL_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_config_dir(Path::new("."))
            .context("Failed to load configuration from the working directory")?,
    };

    let seed = cli.seed.or(config.seed);
    print!("{}", describe(&config, seed));
    let seed = seed.unwrap_or_else(clock_seed);
    info!(seed, "seed selected");

    let mut sim = config
        .builder(seed)
        .build()
        .context("Failed to set up the simulation")?;
    let stats = DeliveryStats::attach(&mut sim);

    if let Err(err) = sim.run() {
        error!(tick = sim.now(), %err, "simulation stopped");
        println!("Simulation unable to complete.");
        return Ok(ExitCode::FAILURE);
    }

    let report = Report::new(&stats.borrow(), sim.now(), config.statistics);
    println!("{report}");
    Ok(ExitCode::SUCCESS)
}

/// The configuration banner printed before a run.
fn describe(config: &SimulationConfig, seed: Option<u64>) -> String {
    let seed = seed.map_or_else(|| "null".to_string(), |s| s.to_string());
    format!(
        "Floors: {}\n\
         Mail_to_Create: {}\n\
         Mail_Max_Weight: {}\n\
         Last_Delivery_Time: {}\n\
         Caution enabled: {}\n\
         Fragile enabled: {}\n\
         Statistics enabled: {}\n\
         Robots: {}\n\
         Seed: {seed}\n",
        config.floors,
        config.mail_to_create,
        config.mail_max_weight,
        config.last_delivery_time,
        config.caution,
        config.fragile,
        config.statistics,
        config.robots,
    )
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from(["automail", "--seed", "30006", "-c", "sim.toml"]).unwrap();
        assert_eq!(cli.seed, Some(30006));
        assert_eq!(cli.config, Some(PathBuf::from("sim.toml")));
    }

    #[test]
    fn banner_lists_every_setting() {
        let text = describe(&SimulationConfig::default(), None);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Floors: 10");
        assert_eq!(lines[4], "Caution enabled: true");
        assert_eq!(lines[7], "Robots: 3");
        assert_eq!(lines[8], "Seed: null");

        let text = describe(&SimulationConfig::default(), Some(11));
        assert!(text.ends_with("Seed: 11\n"));
    }
}
