//! Directional PI loops for over- and under-voltage regulation.
//!
//! Both loops share the same shape: the voltage error beyond the dead-band is
//! integrated, the PI output is capped at `p_step_max` and treated as an
//! increment on the measured power, and the resulting absolute command is
//! clamped against the PCS rating and the SOC ceiling. The accumulator is
//! not clamped; it only returns to zero when the loop goes dormant.

use crate::config::ControlConfig;
use crate::telemetry::Measurement;

/// Result of one PI evaluation.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PiStep {
    /// Voltage error beyond the dead-band (V, >= 0).
    pub error: f64,
    /// Integral accumulator after this step.
    pub integral: f64,
    /// Requested increment after the step-rate cap (kW magnitude).
    pub p_calc: f64,
    /// Clamped absolute power command (kW, feeder convention).
    pub command_kw: f64,
}

/// Over-voltage loop: asks the unit to charge more.
///
/// The command is never negative; it is bounded by the SOC charge ceiling
/// and the PCS charge rating.
pub fn step_over_voltage(m: &Measurement, cfg: &ControlConfig, integral: f64) -> PiStep {
    let error = (m.v_meas - (cfg.v_ref_upper + cfg.deadband_upper)).max(0.0);
    let integral = integral + error * cfg.ki_upper;
    let p_calc = (error * cfg.kp_upper + integral).min(cfg.p_step_max);

    let command_kw = (p_calc + m.p_meas)
        .min(m.limits.charge_kw)
        .min(cfg.p_charge_max)
        .max(0.0);

    PiStep {
        error,
        integral,
        p_calc,
        command_kw,
    }
}

/// Under-voltage loop: asks the unit to discharge more.
///
/// Discharge is negative, so the increment is subtracted from the measured
/// power. The command is never positive and never below the tighter of the
/// PCS discharge rating and the SOC discharge ceiling.
pub fn step_under_voltage(m: &Measurement, cfg: &ControlConfig, integral: f64) -> PiStep {
    let error = ((cfg.v_ref_lower - cfg.deadband_lower) - m.v_meas).max(0.0);
    let integral = integral + error * cfg.ki_lower;
    let p_calc = (error * cfg.kp_lower + integral).min(cfg.p_step_max);

    let target = m.p_meas - p_calc;
    let capacity = cfg.p_discharge_max.min(m.limits.discharge_kw);
    let lower_bound = -capacity;

    let command_kw = if target > 0.0 {
        0.0
    } else if target < lower_bound {
        lower_bound
    } else {
        target
    };

    PiStep {
        error,
        integral,
        p_calc,
        command_kw,
    }
}
