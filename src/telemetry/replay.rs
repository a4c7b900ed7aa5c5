use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::{TelemetrySample, TelemetrySource, TelemetryUnavailable};

/// Failure to load a telemetry recording.
#[derive(Debug, Error)]
#[error("cannot read telemetry recording \"{}\": {source}", .path.display())]
pub struct ReplayError {
    pub path: PathBuf,
    #[source]
    pub source: csv::Error,
}

/// One recorded row; an empty cell marks a missed reading.
#[derive(Debug, Clone, Deserialize)]
struct ReplayRow {
    v_meas: Option<f64>,
    soc: Option<f64>,
    p_meas: Option<f64>,
}

/// Plays back a `v_meas,soc,p_meas` CSV recording, one row per tick.
///
/// Rows with a missing or out-of-range value, and ticks past the end of the
/// recording, are reported as unavailable rather than patched.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    rows: Vec<ReplayRow>,
}

impl ReplayFeed {
    /// Loads a recording from disk.
    ///
    /// # Errors
    ///
    /// Returns a [`ReplayError`] if the file cannot be opened or a row does
    /// not match the header.
    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        let wrap = |source| ReplayError {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(|e| wrap(csv::Error::from(e)))?;
        let feed = Self::from_reader(file).map_err(wrap)?;
        info!(path = %path.display(), rows = feed.len(), "telemetry recording loaded");
        Ok(feed)
    }

    /// Loads a recording from any reader.
    ///
    /// # Errors
    ///
    /// Returns a `csv::Error` if a row cannot be decoded.
    pub fn from_reader(reader: impl Read) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = rdr.deserialize().collect::<Result<Vec<ReplayRow>, _>>()?;
        Ok(Self { rows })
    }

    /// Number of recorded ticks.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the recording has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TelemetrySource for ReplayFeed {
    fn sample(&mut self, tick: usize) -> Result<TelemetrySample, TelemetryUnavailable> {
        let row = self
            .rows
            .get(tick)
            .ok_or_else(|| TelemetryUnavailable::new(format!("recording ends before tick {tick}")))?;

        let (Some(v_meas), Some(soc), Some(p_meas)) = (row.v_meas, row.soc, row.p_meas) else {
            return Err(TelemetryUnavailable::new(format!(
                "tick {tick}: missing reading"
            )));
        };
        if !v_meas.is_finite() || !p_meas.is_finite() || !(0.0..=1.0).contains(&soc) {
            return Err(TelemetryUnavailable::new(format!(
                "tick {tick}: reading out of range"
            )));
        }
        Ok(TelemetrySample { v_meas, soc, p_meas })
    }

    fn source_name(&self) -> &'static str {
        "replay"
    }
}
