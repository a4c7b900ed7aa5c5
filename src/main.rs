//! Voltage regulator entry point: CLI wiring, config loading, and the tick loop.

use std::process;

use tracing::{error, info};

use bess_vreg::cli::{self, CliCommand, CliOptions};
use bess_vreg::config::{ControlConfig, load_configuration};
use bess_vreg::io::export::export_csv;
use bess_vreg::logging::init_tracing;
use bess_vreg::sim::clock::{Clock, Pacing};
use bess_vreg::sim::engine::Engine;
use bess_vreg::sim::summary::RunSummary;
use bess_vreg::sim::types::TickRecord;
use bess_vreg::sink::LogSink;
use bess_vreg::telemetry::{FeedParams, ReplayFeed, SimulatedFeed, TelemetrySource};

/// Resolves the configuration from `--config` or `--preset`.
fn load_config(cli: &CliOptions) -> ControlConfig {
    let loaded = match (&cli.config, &cli.preset) {
        (Some(path), _) => load_configuration(path),
        (None, Some(name)) => ControlConfig::from_preset(name),
        (None, None) => Ok(ControlConfig::baseline()),
    };
    match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "configuration error, not starting the control loop");
            process::exit(1);
        }
    }
}

/// Runs the loop and returns the records, or an empty vector if unbounded.
fn run_loop<S: TelemetrySource>(cfg: ControlConfig, source: S, clock: &mut Clock) -> Vec<TickRecord> {
    let mut engine = Engine::new(cfg, source, LogSink);
    if clock.is_bounded() {
        let records = engine.run(clock);
        for r in &records {
            println!("{r}");
        }
        records
    } else {
        engine.run_with(clock, |r| println!("{r}"));
        Vec::new()
    }
}

fn main() {
    let cli = match cli::parse_args() {
        Ok(CliCommand::Run(opts)) => opts,
        Ok(CliCommand::Help) => {
            cli::print_usage();
            process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };

    init_tracing(cli.log_json);

    let cfg = load_config(&cli);
    for (name, value) in cfg.fields() {
        info!(key = name, value, "parameter");
    }

    let pacing = Pacing::from_millis(cli.period_ms);
    let mut clock = match cli.ticks {
        Some(n) => Clock::new(n),
        None => Clock::unbounded(),
    }
    .with_pacing(pacing);

    info!(ticks = ?cli.ticks, period_ms = cli.period_ms, "starting control loop");
    let records = if let Some(ref path) = cli.telemetry_in {
        let feed = match ReplayFeed::from_path(path) {
            Ok(feed) => feed,
            Err(e) => {
                error!(error = %e, "cannot start replay");
                process::exit(1);
            }
        };
        run_loop(cfg, feed, &mut clock)
    } else {
        let params = FeedParams {
            dropout_probability: cli.dropout,
            ..FeedParams::default()
        };
        run_loop(cfg, SimulatedFeed::new(params, &cfg, cli.seed), &mut clock)
    };

    if records.is_empty() {
        return;
    }

    // Summary energies use the wall-clock period, or one-second ticks when unpaced.
    let dt_hours = pacing.period_hours().unwrap_or(1.0 / 3600.0);
    println!("\n{}", RunSummary::from_records(&records, dt_hours));

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&records, path) {
            error!(error = %e, path = %path.display(), "failed to write CSV");
            process::exit(1);
        }
        info!(path = %path.display(), "tick records written");
    }
}
