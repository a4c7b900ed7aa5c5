//! Telemetry acquisition: the per-tick sample contract and its sources.

/// CSV playback of recorded telemetry.
pub mod replay;
/// Synthetic feeder voltage and SOC generator.
pub mod simulated;

pub use replay::{ReplayError, ReplayFeed};
pub use simulated::{FeedParams, SimulatedFeed};

use thiserror::Error;

use crate::config::ControlConfig;
use crate::control::soc_limit::{SocLimits, soc_limits};

/// Raw readings for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Feeder voltage at the point of connection (V).
    pub v_meas: f64,
    /// Battery state of charge (fraction in `[0, 1]`).
    pub soc: f64,
    /// PCS active power (kW; positive = charging, negative = discharging).
    pub p_meas: f64,
}

/// A sample enriched with its SOC-derived power ceilings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub v_meas: f64,
    pub soc: f64,
    pub p_meas: f64,
    pub limits: SocLimits,
}

impl Measurement {
    /// Attaches the SOC ceilings for `cfg` to a raw sample.
    pub fn new(sample: &TelemetrySample, cfg: &ControlConfig) -> Self {
        Self {
            v_meas: sample.v_meas,
            soc: sample.soc,
            p_meas: sample.p_meas,
            limits: soc_limits(sample.soc, cfg),
        }
    }
}

/// The data source could not provide a usable sample this tick.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("telemetry unavailable: {reason}")]
pub struct TelemetryUnavailable {
    pub reason: String,
}

impl TelemetryUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Anything that can deliver one telemetry sample per tick.
///
/// Implemented by the simulator and the replay reader; a hardware adapter
/// (meter, BMS, PCS) plugs in here without touching the control logic.
pub trait TelemetrySource {
    /// Reads the sample for tick `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryUnavailable`] when no trustworthy reading exists.
    fn sample(&mut self, tick: usize) -> Result<TelemetrySample, TelemetryUnavailable>;

    /// Returns a human-readable name for the source.
    fn source_name(&self) -> &'static str;
}
