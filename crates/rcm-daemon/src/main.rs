//! RC meter daemon entry point.
//!
//! Wires the simulated board, scan loop, and console readout into a
//! long-running process with signal handling and diagnostics.

mod diagnostics;
mod signals;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use rcm_common::config::{MeterConfig, SourceConfig};
use rcm_hal::SimBoard;
use rcm_runtime::{Meter, TerminalStatus};

use crate::diagnostics::DiagnosticsState;
use crate::signals::Signals;

/// Meter daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "rcm-daemon",
    about = "Virtual RC meter daemon - continuous capacitance/resistance readout",
    version,
    long_about = None
)]
struct Args {
    /// Path to a meter configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drive the simulated input with a square wave at this frequency in Hz
    /// (overrides the config file).
    #[arg(long, short = 'f', value_name = "HZ")]
    frequency: Option<f64>,

    /// Hold the simulated input low (exercises the no-signal path).
    #[arg(long, conflicts_with = "frequency")]
    no_signal: bool,

    /// Maximum scans to run (0 = infinite).
    #[arg(long, default_value = "0")]
    max_scans: u64,

    /// Sleep the configured scan delay in wall-clock time between scans
    /// instead of free-running.
    #[arg(long)]
    realtime: bool,

    /// Print a JSON metrics snapshot on exit.
    #[arg(long)]
    stats_json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting RC meter daemon");

    let mut config = load_config(&args)?;

    // Command-line source overrides
    if let Some(frequency_hz) = args.frequency {
        config.sim.source = SourceConfig::Square {
            frequency_hz,
            duty: 0.5,
        };
    }
    if args.no_signal {
        config.sim.source = SourceConfig::Constant { level: false };
    }

    info!(
        clock_hz = config.clock_hz,
        sample_periods = config.sample_periods,
        source = ?config.sim.source,
        "Configuration loaded"
    );

    let signals = Signals::install().context("Failed to set up signal handlers")?;
    let diagnostics = DiagnosticsState::new();

    run_daemon(config, &args, signals, &diagnostics)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "rcm_daemon={level},rcm_runtime={level},rcm_core={level},rcm_hal={level},rcm_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `RCM_CONFIG_PATH` environment variable
/// 3. `/etc/rcmeter/config.toml` (system path)
/// 4. `config/default.toml` (local development)
/// 5. Built-in defaults
fn load_config(args: &Args) -> Result<MeterConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return MeterConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("RCM_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from RCM_CONFIG_PATH");
            return MeterConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from RCM_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "RCM_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let system_path = PathBuf::from("/etc/rcmeter/config.toml");
    if system_path.exists() {
        info!(?system_path, "Loading config from system path");
        return MeterConfig::from_file(&system_path)
            .with_context(|| format!("Failed to load config from {system_path:?}"));
    }

    let local_path = PathBuf::from("config/default.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return MeterConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {local_path:?}"));
    }

    info!("No config file found, using built-in defaults");
    Ok(MeterConfig::default())
}

/// Main daemon loop: scan until shutdown or the scan limit.
fn run_daemon(
    config: MeterConfig,
    args: &Args,
    signals: Signals,
    diagnostics: &DiagnosticsState,
) -> Result<()> {
    let scan_delay = config.scan_delay;
    let board = SimBoard::from_config(&config);
    let sink = TerminalStatus::new(std::io::stdout());
    let mut meter = Meter::new(board, sink, config);

    meter.initialize().context("Failed to initialize meter")?;
    info!("Meter initialized, entering scan loop");

    while !signals.shutdown_requested() {
        if signals.take_reset_request() {
            info!("Reset signal received, clearing statistics");
            meter.reset_metrics();
            diagnostics.reset();
        }

        let outcome = meter.scan().context("Scan failed")?;
        diagnostics.record(&outcome);

        if meter.scans() % 50 == 0 {
            let snap = diagnostics.snapshot();
            info!(
                health = %snap.health,
                scans = snap.scan_count,
                no_signal = snap.no_signal_count,
                last_frequency_hz = snap.last_frequency_hz,
                "Scan progress"
            );
        }

        if args.max_scans > 0 && meter.scans() >= args.max_scans {
            info!(scans = meter.scans(), "Scan limit reached");
            break;
        }

        // The board's delays burn virtual time only; this paces the loop
        // against the wall clock when asked to.
        if args.realtime {
            std::thread::sleep(scan_delay);
        }
    }

    let metrics = meter.metrics().snapshot();
    let diag = diagnostics.snapshot();
    info!(
        health = %diag.health,
        scans = diag.scan_count,
        ok = metrics.ok_count,
        no_signal = metrics.no_signal_count,
        mean_hz = metrics.mean_hz,
        signals = signals.signal_count(),
        "Daemon exiting"
    );

    if args.stats_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&metrics).context("Failed to serialize metrics")?
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_frequency_override() {
        let args = Args::parse_from(["rcm-daemon", "--frequency", "2500", "--max-scans", "3"]);
        assert_eq!(args.frequency, Some(2500.0));
        assert_eq!(args.max_scans, 3);
        assert!(!args.no_signal);
    }

    #[test]
    fn test_no_signal_conflicts_with_frequency() {
        let result =
            Args::try_parse_from(["rcm-daemon", "--frequency", "100", "--no-signal"]);
        assert!(result.is_err());
    }
}
