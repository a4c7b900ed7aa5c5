use std::f64::consts::PI;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::trace;

use super::{TelemetrySample, TelemetrySource, TelemetryUnavailable};
use crate::config::ControlConfig;

/// Waveform and SOC-walk parameters of [`SimulatedFeed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedParams {
    /// Centre of the voltage sinusoid (V).
    pub base_voltage: f64,
    /// Peak deviation from the centre (V).
    pub amplitude: f64,
    /// Sinusoid period in ticks.
    pub period_ticks: f64,
    /// SOC at start of the run.
    pub initial_soc: f64,
    /// Above this voltage the simulated unit is charging.
    pub charge_voltage: f64,
    /// Below this voltage the simulated unit is discharging.
    pub discharge_voltage: f64,
    /// SOC change per tick while charging or discharging.
    pub soc_step: f64,
    /// SOC drain per tick otherwise.
    pub idle_drain: f64,
    /// Half-width of the uniform SOC perturbation.
    pub soc_noise: f64,
    /// Measured power per volt of deviation from `base_voltage` (kW/V).
    pub power_gain: f64,
    /// Probability that a tick reports no telemetry.
    pub dropout_probability: f64,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            base_voltage: 220.0,
            amplitude: 30.0,
            period_ticks: 30.0,
            initial_soc: 0.7,
            charge_voltage: 235.0,
            discharge_voltage: 205.0,
            soc_step: 0.02,
            idle_drain: 0.005,
            soc_noise: 0.05,
            power_gain: 2.0,
            dropout_probability: 0.0,
        }
    }
}

/// Synthetic telemetry stand-in for a meter, BMS, and PCS.
///
/// Voltage follows a sinusoid around `base_voltage`. SOC rises while the
/// voltage is high, falls while it is low, drains slowly otherwise, picks up
/// uniform noise, and is kept inside the configured SOC window. Measured
/// power is proportional to the voltage deviation.
#[derive(Debug, Clone)]
pub struct SimulatedFeed {
    params: FeedParams,
    soc_min: f64,
    soc_max: f64,
    step: u64,
    soc: f64,
    rng: StdRng,
}

impl SimulatedFeed {
    /// Creates a seeded feed whose SOC stays within `cfg`'s SOC window.
    ///
    /// # Panics
    ///
    /// Panics if `period_ticks` is not positive.
    pub fn new(params: FeedParams, cfg: &ControlConfig, seed: u64) -> Self {
        assert!(params.period_ticks > 0.0, "period_ticks must be > 0");
        Self {
            params: FeedParams {
                dropout_probability: params.dropout_probability.clamp(0.0, 1.0),
                soc_noise: params.soc_noise.max(0.0),
                ..params
            },
            soc_min: cfg.soc_min,
            soc_max: cfg.soc_max,
            step: 0,
            soc: params.initial_soc,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn advance(&mut self) -> TelemetrySample {
        self.step += 1;
        let p = &self.params;

        let phase = 2.0 * PI * self.step as f64 / p.period_ticks;
        let v_meas = p.base_voltage + p.amplitude * phase.sin();

        let drift = if v_meas > p.charge_voltage {
            p.soc_step
        } else if v_meas < p.discharge_voltage {
            -p.soc_step
        } else {
            -p.idle_drain
        };
        let noise = if p.soc_noise > 0.0 {
            self.rng.random_range(-p.soc_noise..p.soc_noise)
        } else {
            0.0
        };
        self.soc = (self.soc + drift + noise).clamp(self.soc_min, self.soc_max);

        TelemetrySample {
            v_meas,
            soc: self.soc,
            p_meas: (v_meas - p.base_voltage) * p.power_gain,
        }
    }
}

impl TelemetrySource for SimulatedFeed {
    fn sample(&mut self, tick: usize) -> Result<TelemetrySample, TelemetryUnavailable> {
        let sample = self.advance();
        let p = self.params.dropout_probability;
        if p > 0.0 && self.rng.random_bool(p) {
            return Err(TelemetryUnavailable::new(format!(
                "simulated dropout at tick {tick}"
            )));
        }
        trace!(tick, v_meas = sample.v_meas, soc = sample.soc, p_meas = sample.p_meas, "simulated sample");
        Ok(sample)
    }

    fn source_name(&self) -> &'static str {
        "simulated"
    }
}
