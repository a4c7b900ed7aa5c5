//! CSV export for control tick records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::TickRecord;

/// Column header for CSV tick export.
const HEADER: &str = "tick,v_meas,soc,p_meas,charge_limit_kw,discharge_limit_kw,\
                      mode,command_kw,integral_upper,integral_lower,telemetry_ok";

/// Exports tick records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Readings that were
/// unavailable are left empty. Produces deterministic output for identical
/// inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[TickRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.precision$}"))
}

/// Writes tick records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[TickRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.tick.to_string(),
            opt(r.v_meas, 3),
            opt(r.soc, 4),
            opt(r.p_meas, 4),
            opt(r.charge_limit_kw, 4),
            opt(r.discharge_limit_kw, 4),
            r.mode.code().to_string(),
            format!("{:.4}", r.command_kw),
            format!("{:.6}", r.integral_upper),
            format!("{:.6}", r.integral_lower),
            r.telemetry_ok.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
