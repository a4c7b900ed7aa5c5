//! SOC-derived charge and discharge power ceilings.

use std::f64::consts::PI;

use crate::config::ControlConfig;

/// Width of the SOC band over which a limit eases from full power to zero.
pub const SOC_TRANSITION_WIDTH: f64 = 0.05;

/// Power ceilings allowed by the current state of charge (kW, both >= 0).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SocLimits {
    /// Largest charge power the battery may accept.
    pub charge_kw: f64,
    /// Largest discharge power the battery may deliver (positive magnitude).
    pub discharge_kw: f64,
}

/// Maps SOC to charge and discharge ceilings.
///
/// Inside the transition band next to `soc_max` (charge) or `soc_min`
/// (discharge) the ceiling follows a half-cosine between full rating and
/// zero, so the limit has no step at the SOC boundary.
///
/// # Examples
///
/// ```
/// use bess_vreg::config::ControlConfig;
/// use bess_vreg::control::soc_limits;
///
/// let cfg = ControlConfig::baseline();
/// let limits = soc_limits(0.5, &cfg);
/// assert_eq!(limits.charge_kw, cfg.p_charge_max);
/// assert_eq!(limits.discharge_kw, cfg.p_discharge_max);
/// ```
pub fn soc_limits(soc: f64, cfg: &ControlConfig) -> SocLimits {
    SocLimits {
        charge_kw: (cfg.p_charge_max * charge_factor(soc, cfg.soc_max)).max(0.0),
        discharge_kw: (cfg.p_discharge_max * discharge_factor(soc, cfg.soc_min)).max(0.0),
    }
}

fn charge_factor(soc: f64, soc_max: f64) -> f64 {
    let band_start = soc_max - SOC_TRANSITION_WIDTH;
    if soc >= soc_max {
        0.0
    } else if soc <= band_start {
        1.0
    } else {
        let x = (soc - band_start) / SOC_TRANSITION_WIDTH;
        0.5 * (1.0 + (PI * x).cos())
    }
}

fn discharge_factor(soc: f64, soc_min: f64) -> f64 {
    if soc <= soc_min {
        0.0
    } else if soc >= soc_min + SOC_TRANSITION_WIDTH {
        1.0
    } else {
        let x = (soc - soc_min) / SOC_TRANSITION_WIDTH;
        0.5 * (1.0 - (PI * x).cos())
    }
}
