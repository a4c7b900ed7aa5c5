//! Per-tick record produced by the engine.

use std::fmt;

use crate::control::{ControllerState, Decision, Mode};
use crate::sink::Command;
use crate::telemetry::TelemetrySample;

/// Complete record of one control tick.
///
/// Telemetry fields are `None` on ticks where the source was unavailable and
/// the previous command was held.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    /// Tick index.
    pub tick: usize,
    /// Feeder voltage (V).
    pub v_meas: Option<f64>,
    /// State of charge (fraction).
    pub soc: Option<f64>,
    /// Measured PCS power (kW).
    pub p_meas: Option<f64>,
    /// SOC-derived charge ceiling (kW).
    pub charge_limit_kw: Option<f64>,
    /// SOC-derived discharge ceiling (kW, positive magnitude).
    pub discharge_limit_kw: Option<f64>,
    /// Mode the command was issued in.
    pub mode: Mode,
    /// Issued command (kW; positive = charge, negative = discharge).
    pub command_kw: f64,
    /// Over-voltage accumulator after the tick.
    pub integral_upper: f64,
    /// Under-voltage accumulator after the tick.
    pub integral_lower: f64,
    /// `false` when the command was held for lack of telemetry.
    pub telemetry_ok: bool,
}

impl TickRecord {
    /// Record for a tick computed from fresh telemetry.
    pub fn computed(
        tick: usize,
        sample: &TelemetrySample,
        decision: &Decision,
        state: &ControllerState,
    ) -> Self {
        Self {
            tick,
            v_meas: Some(sample.v_meas),
            soc: Some(sample.soc),
            p_meas: Some(sample.p_meas),
            charge_limit_kw: Some(decision.limits.charge_kw),
            discharge_limit_kw: Some(decision.limits.discharge_kw),
            mode: decision.mode,
            command_kw: decision.command_kw,
            integral_upper: state.integral_upper,
            integral_lower: state.integral_lower,
            telemetry_ok: true,
        }
    }

    /// Record for a tick that re-issued `held` without new telemetry.
    pub fn held(tick: usize, held: Command, state: &ControllerState) -> Self {
        Self {
            tick,
            v_meas: None,
            soc: None,
            p_meas: None,
            charge_limit_kw: None,
            discharge_limit_kw: None,
            mode: held.mode,
            command_kw: held.power_kw,
            integral_upper: state.integral_upper,
            integral_lower: state.integral_lower,
            telemetry_ok: false,
        }
    }
}

impl fmt::Display for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(((v, soc), p)) = self.v_meas.zip(self.soc).zip(self.p_meas) else {
            return write!(
                f,
                "t={:>4} | telemetry unavailable | mode={} ({}) cmd={:>8.2} kW (held)",
                self.tick,
                self.mode,
                self.mode.code(),
                self.command_kw,
            );
        };
        write!(
            f,
            "t={:>4} | V={:>6.2} V  SoC={:>5.1}%  P={:>7.2} kW | \
             lim(chg={:.2}, dis={:.2}) | mode={} ({}) cmd={:>8.2} kW | \
             I(up={:.3}, lo={:.3})",
            self.tick,
            v,
            soc * 100.0,
            p,
            self.charge_limit_kw.unwrap_or(0.0),
            self.discharge_limit_kw.unwrap_or(0.0),
            self.mode,
            self.mode.code(),
            self.command_kw,
            self.integral_upper,
            self.integral_lower,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SocLimits;

    #[test]
    fn computed_record_copies_inputs() {
        let sample = TelemetrySample {
            v_meas: 250.0,
            soc: 0.5,
            p_meas: 0.0,
        };
        let decision = Decision {
            mode: Mode::OverVoltage,
            command_kw: 7.7,
            limits: SocLimits {
                charge_kw: 125.0,
                discharge_kw: 125.0,
            },
            pi: None,
        };
        let state = ControllerState {
            mode: Mode::OverVoltage,
            integral_upper: 0.7,
            integral_lower: 0.0,
        };
        let r = TickRecord::computed(3, &sample, &decision, &state);
        assert_eq!(r.tick, 3);
        assert_eq!(r.v_meas, Some(250.0));
        assert_eq!(r.charge_limit_kw, Some(125.0));
        assert_eq!(r.integral_upper, 0.7);
        assert!(r.telemetry_ok);
        assert!(format!("{r}").contains("over_voltage"));
    }

    #[test]
    fn held_record_display_does_not_panic() {
        let held = Command {
            mode: Mode::UnderVoltage,
            power_kw: -6.6,
        };
        let r = TickRecord::held(9, held, &ControllerState::new());
        assert!(!r.telemetry_ok);
        assert_eq!(r.v_meas, None);
        assert!(format!("{r}").contains("held"));
    }
}
