//! One control tick: limits, classification, and loop dispatch.

use crate::config::ControlConfig;
use crate::telemetry::{Measurement, TelemetrySample};

use super::mode::{Mode, classify};
use super::pi::{PiStep, step_over_voltage, step_under_voltage};
use super::soc_limit::SocLimits;

/// Persistent controller state, one per storage unit.
///
/// Starts in [`Mode::Normal`] with both accumulators at zero. The
/// accumulator of whichever loop is not active is zero after every tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControllerState {
    /// Most recent classification.
    pub mode: Mode,
    /// Over-voltage loop accumulator.
    pub integral_upper: f64,
    /// Under-voltage loop accumulator.
    pub integral_lower: f64,
}

impl ControllerState {
    /// Creates the initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes both accumulators.
    pub fn reset(&mut self) {
        self.integral_upper = 0.0;
        self.integral_lower = 0.0;
    }
}

/// Outcome of one tick, ready for the command sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Mode the controller ran in.
    pub mode: Mode,
    /// Power command (kW; positive = charge, negative = discharge).
    pub command_kw: f64,
    /// SOC ceilings that were applied.
    pub limits: SocLimits,
    /// PI evaluation, absent in [`Mode::Normal`].
    pub pi: Option<PiStep>,
}

/// Runs one control tick against `state`.
///
/// Normal mode commands 0 kW and clears both accumulators so a later entry
/// into an active mode starts without stale windup. In an active mode only
/// the dormant loop's accumulator is cleared.
pub fn tick(cfg: &ControlConfig, state: &mut ControllerState, sample: &TelemetrySample) -> Decision {
    let m = Measurement::new(sample, cfg);
    let mode = classify(m.v_meas, cfg);
    state.mode = mode;

    let pi = match mode {
        Mode::Normal => {
            state.reset();
            None
        }
        Mode::OverVoltage => {
            let step = step_over_voltage(&m, cfg, state.integral_upper);
            state.integral_upper = step.integral;
            state.integral_lower = 0.0;
            Some(step)
        }
        Mode::UnderVoltage => {
            let step = step_under_voltage(&m, cfg, state.integral_lower);
            state.integral_lower = step.integral;
            state.integral_upper = 0.0;
            Some(step)
        }
    };

    Decision {
        mode,
        command_kw: pi.map_or(0.0, |step| step.command_kw),
        limits: m.limits,
        pi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(v_meas: f64, soc: f64, p_meas: f64) -> TelemetrySample {
        TelemetrySample { v_meas, soc, p_meas }
    }

    #[test]
    fn initial_state_is_normal_and_clear() {
        let state = ControllerState::new();
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(state.integral_upper, 0.0);
        assert_eq!(state.integral_lower, 0.0);
    }

    #[test]
    fn normal_tick_commands_zero_and_clears() {
        let cfg = ControlConfig::baseline();
        let mut state = ControllerState {
            mode: Mode::OverVoltage,
            integral_upper: 42.0,
            integral_lower: 0.0,
        };
        let d = tick(&cfg, &mut state, &sample(230.0, 0.5, 12.0));
        assert_eq!(d.mode, Mode::Normal);
        assert_eq!(d.command_kw, 0.0);
        assert!(d.pi.is_none());
        assert_eq!(state, ControllerState::new());
    }

    #[test]
    fn repeated_normal_ticks_keep_accumulators_zero() {
        let cfg = ControlConfig::baseline();
        let mut state = ControllerState::new();
        for _ in 0..2 {
            tick(&cfg, &mut state, &sample(220.0, 0.6, 0.0));
            assert_eq!(state.integral_upper, 0.0);
            assert_eq!(state.integral_lower, 0.0);
        }
    }

    #[test]
    fn active_loop_integral_persists_across_ticks() {
        let cfg = ControlConfig::baseline();
        let mut state = ControllerState::new();
        tick(&cfg, &mut state, &sample(250.0, 0.5, 0.0));
        tick(&cfg, &mut state, &sample(250.0, 0.5, 7.7));
        assert!((state.integral_upper - 1.4).abs() < 1e-9);
        assert_eq!(state.integral_lower, 0.0);
    }

    #[test]
    fn switching_direction_clears_the_dormant_loop() {
        let cfg = ControlConfig::baseline();
        let mut state = ControllerState::new();
        tick(&cfg, &mut state, &sample(190.0, 0.5, 0.0));
        assert!(state.integral_lower > 0.0);

        let d = tick(&cfg, &mut state, &sample(250.0, 0.5, 0.0));
        assert_eq!(d.mode, Mode::OverVoltage);
        assert_eq!(state.integral_lower, 0.0);
        assert!(state.integral_upper > 0.0);
    }

    #[test]
    fn limits_are_attached_to_the_decision() {
        let cfg = ControlConfig::baseline();
        let mut state = ControllerState::new();
        let d = tick(&cfg, &mut state, &sample(250.0, 0.96, 0.0));
        assert_eq!(d.limits.charge_kw, 0.0);
        assert_eq!(d.command_kw, 0.0);
    }
}
