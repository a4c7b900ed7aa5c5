//! Post-hoc run statistics computed from tick records.

use std::fmt;

use crate::control::Mode;

use super::types::TickRecord;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from `&[TickRecord]` so the figures always agree with
/// the exported records.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of ticks.
    pub ticks: usize,
    /// Ticks spent in normal mode.
    pub normal_ticks: usize,
    /// Ticks spent regulating over-voltage.
    pub over_voltage_ticks: usize,
    /// Ticks spent regulating under-voltage.
    pub under_voltage_ticks: usize,
    /// Ticks where the previous command was held for lack of telemetry.
    pub held_ticks: usize,
    /// Largest charge command (kW).
    pub peak_charge_kw: f64,
    /// Largest discharge command (kW, positive magnitude).
    pub peak_discharge_kw: f64,
    /// Lowest measured voltage (V).
    pub v_min: Option<f64>,
    /// Highest measured voltage (V).
    pub v_max: Option<f64>,
    /// Energy commanded into the battery (kWh).
    pub charge_energy_kwh: f64,
    /// Energy commanded out of the battery (kWh, positive).
    pub discharge_energy_kwh: f64,
}

impl RunSummary {
    /// Computes all statistics from the record vector.
    ///
    /// # Arguments
    ///
    /// * `records` - Complete run records
    /// * `dt_hours` - Tick period in hours, used for the energy totals
    pub fn from_records(records: &[TickRecord], dt_hours: f64) -> Self {
        let mut s = Self {
            ticks: records.len(),
            normal_ticks: 0,
            over_voltage_ticks: 0,
            under_voltage_ticks: 0,
            held_ticks: 0,
            peak_charge_kw: 0.0,
            peak_discharge_kw: 0.0,
            v_min: None,
            v_max: None,
            charge_energy_kwh: 0.0,
            discharge_energy_kwh: 0.0,
        };

        for r in records {
            match r.mode {
                Mode::Normal => s.normal_ticks += 1,
                Mode::OverVoltage => s.over_voltage_ticks += 1,
                Mode::UnderVoltage => s.under_voltage_ticks += 1,
            }
            if !r.telemetry_ok {
                s.held_ticks += 1;
            }

            if r.command_kw > 0.0 {
                s.peak_charge_kw = s.peak_charge_kw.max(r.command_kw);
                s.charge_energy_kwh += r.command_kw * dt_hours;
            } else if r.command_kw < 0.0 {
                s.peak_discharge_kw = s.peak_discharge_kw.max(-r.command_kw);
                s.discharge_energy_kwh += -r.command_kw * dt_hours;
            }

            if let Some(v) = r.v_meas {
                s.v_min = Some(s.v_min.map_or(v, |m| m.min(v)));
                s.v_max = Some(s.v_max.map_or(v, |m| m.max(v)));
            }
        }

        s
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(f, "Ticks:                 {}", self.ticks)?;
        writeln!(
            f,
            "Modes:                 normal={} over={} under={}",
            self.normal_ticks, self.over_voltage_ticks, self.under_voltage_ticks
        )?;
        writeln!(f, "Held (no telemetry):   {}", self.held_ticks)?;
        match (self.v_min, self.v_max) {
            (Some(lo), Some(hi)) => writeln!(f, "Voltage range:         {lo:.2} .. {hi:.2} V")?,
            _ => writeln!(f, "Voltage range:         n/a")?,
        }
        writeln!(f, "Peak charge command:   {:.2} kW", self.peak_charge_kw)?;
        writeln!(f, "Peak discharge cmd:    {:.2} kW", self.peak_discharge_kw)?;
        write!(
            f,
            "Commanded energy:      +{:.3} kWh / -{:.3} kWh",
            self.charge_energy_kwh, self.discharge_energy_kwh
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(mode: Mode, command_kw: f64, v_meas: Option<f64>) -> TickRecord {
        TickRecord {
            tick: 0,
            v_meas,
            soc: v_meas.map(|_| 0.5),
            p_meas: v_meas.map(|_| 0.0),
            charge_limit_kw: None,
            discharge_limit_kw: None,
            mode,
            command_kw,
            integral_upper: 0.0,
            integral_lower: 0.0,
            telemetry_ok: v_meas.is_some(),
        }
    }

    #[test]
    fn mode_counting() {
        let records = vec![
            make_record(Mode::Normal, 0.0, Some(220.0)),
            make_record(Mode::OverVoltage, 5.0, Some(250.0)),
            make_record(Mode::OverVoltage, 8.0, None),
            make_record(Mode::UnderVoltage, -4.0, Some(190.0)),
        ];
        let s = RunSummary::from_records(&records, 1.0);
        assert_eq!(s.ticks, 4);
        assert_eq!(s.normal_ticks, 1);
        assert_eq!(s.over_voltage_ticks, 2);
        assert_eq!(s.under_voltage_ticks, 1);
        assert_eq!(s.held_ticks, 1);
    }

    #[test]
    fn peaks_and_energy() {
        // charge: 5 + 8 = 13 kW·tick, discharge: 4 kW·tick, dt = 0.5 h
        let records = vec![
            make_record(Mode::OverVoltage, 5.0, Some(250.0)),
            make_record(Mode::OverVoltage, 8.0, Some(251.0)),
            make_record(Mode::UnderVoltage, -4.0, Some(190.0)),
        ];
        let s = RunSummary::from_records(&records, 0.5);
        assert_eq!(s.peak_charge_kw, 8.0);
        assert_eq!(s.peak_discharge_kw, 4.0);
        assert!((s.charge_energy_kwh - 6.5).abs() < 1e-12);
        assert!((s.discharge_energy_kwh - 2.0).abs() < 1e-12);
        assert_eq!(s.v_min, Some(190.0));
        assert_eq!(s.v_max, Some(251.0));
    }

    #[test]
    fn empty_records() {
        let s = RunSummary::from_records(&[], 1.0);
        assert_eq!(s.ticks, 0);
        assert_eq!(s.v_min, None);
        assert!(format!("{s}").contains("n/a"));
    }
}
