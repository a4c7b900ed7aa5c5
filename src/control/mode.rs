use std::fmt;

use crate::config::ControlConfig;

/// Operating mode of the regulator for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Voltage inside the allowed band; no corrective power.
    #[default]
    Normal,
    /// Voltage above the upper band; the unit charges to pull it down.
    OverVoltage,
    /// Voltage below the lower band; the unit discharges to lift it.
    UnderVoltage,
}

impl Mode {
    /// Stable numeric code used in logs and exports.
    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::OverVoltage => 1,
            Self::UnderVoltage => 2,
        }
    }

    /// Returns `true` for the two modes that drive a PI loop.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::OverVoltage => "over_voltage",
            Self::UnderVoltage => "under_voltage",
        };
        f.write_str(name)
    }
}

/// Classifies a voltage reading into an operating mode.
///
/// The dead-band boundaries belong to [`Mode::Normal`]. Under-voltage only
/// engages above `v_enter_lower`, so a collapsed or disconnected feeder never
/// triggers a discharge.
pub fn classify(v_meas: f64, cfg: &ControlConfig) -> Mode {
    if v_meas > cfg.v_ref_upper + cfg.deadband_upper {
        Mode::OverVoltage
    } else if v_meas < cfg.v_ref_lower - cfg.deadband_lower && v_meas > cfg.v_enter_lower {
        Mode::UnderVoltage
    } else {
        Mode::Normal
    }
}
