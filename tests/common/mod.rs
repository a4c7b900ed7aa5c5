//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use bess_vreg::config::ControlConfig;
use bess_vreg::sim::engine::Engine;
use bess_vreg::sink::Command;
use bess_vreg::telemetry::{
    FeedParams, SimulatedFeed, TelemetrySample, TelemetrySource, TelemetryUnavailable,
};

/// Baseline controller configuration.
pub fn default_config() -> ControlConfig {
    ControlConfig::baseline()
}

/// Default simulated feed (seed 42, no dropouts).
pub fn default_feed(config: &ControlConfig) -> SimulatedFeed {
    SimulatedFeed::new(FeedParams::default(), config, 42)
}

/// Engine over the default feed, recording every command.
pub fn default_engine() -> Engine<SimulatedFeed, Vec<Command>> {
    let config = default_config();
    let feed = default_feed(&config);
    Engine::new(config, feed, Vec::new())
}

/// Fixed list of samples played one per tick; `None` is a dropout.
pub struct ScriptedFeed(pub Vec<Option<TelemetrySample>>);

impl TelemetrySource for ScriptedFeed {
    fn sample(&mut self, tick: usize) -> Result<TelemetrySample, TelemetryUnavailable> {
        self.0
            .get(tick)
            .copied()
            .flatten()
            .ok_or_else(|| TelemetryUnavailable::new("scripted gap"))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Sample at mid SOC.
pub fn at(v_meas: f64, p_meas: f64) -> Option<TelemetrySample> {
    Some(TelemetrySample {
        v_meas,
        soc: 0.5,
        p_meas,
    })
}

/// Writes `content` to a uniquely named file in the temp directory.
pub fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("bess-vreg-{}-{name}", std::process::id()));
    std::fs::write(&path, content).expect("temp file should be writable");
    path
}
