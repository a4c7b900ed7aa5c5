//! Controller parameter record and its file loaders.
//!
//! The record is flat: fourteen named reals. On disk it can live in a
//! delimited `key,value` file, a JSON document, or a TOML document; the
//! structured formats may group keys into sections (the field layout uses
//! `voltage_settings`, `pi_controller` and `power_limits`), which are
//! flattened before the keys are resolved.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Tunable parameters of the voltage regulator.
///
/// Constructed once at startup and never mutated afterwards. Use
/// [`load_configuration`] for files or [`ControlConfig::baseline`] for the
/// built-in reference values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    /// Upper voltage reference (V).
    pub v_ref_upper: f64,
    /// Lower voltage reference (V).
    pub v_ref_lower: f64,
    /// Dead-band above the upper reference (V).
    pub deadband_upper: f64,
    /// Dead-band below the lower reference (V).
    pub deadband_lower: f64,
    /// Under-voltage control only engages above this voltage (V).
    pub v_enter_lower: f64,
    /// Proportional gain of the over-voltage loop (kW/V).
    pub kp_upper: f64,
    /// Integral gain of the over-voltage loop (kW/V per tick).
    pub ki_upper: f64,
    /// Proportional gain of the under-voltage loop (kW/V).
    pub kp_lower: f64,
    /// Integral gain of the under-voltage loop (kW/V per tick).
    pub ki_lower: f64,
    /// Largest power increment requested in one tick (kW).
    pub p_step_max: f64,
    /// PCS charge rating (kW).
    pub p_charge_max: f64,
    /// PCS discharge rating (kW, positive magnitude).
    pub p_discharge_max: f64,
    /// Upper SOC safety limit (fraction).
    pub soc_max: f64,
    /// Lower SOC safety limit (fraction).
    pub soc_min: f64,
}

/// On-disk key names, in record order.
pub const FIELD_NAMES: [&str; 14] = [
    "V_ref_upper",
    "V_ref_lower",
    "Deadband_upper",
    "Deadband_lower",
    "V_enter_lower",
    "Kp_upper",
    "Ki_upper",
    "Kp_lower",
    "Ki_lower",
    "P_step_max",
    "P_charge_max",
    "P_discharge_max",
    "SOC_max",
    "SOC_min",
];

/// Errors raised while loading or validating a [`ControlConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("parse error{}: {raw}", line_suffix(.line))]
    Parse { line: Option<usize>, raw: String },
    #[error("{field}: {message}")]
    RangeViolation {
        field: &'static str,
        message: String,
    },
    #[error("unsupported config format \"{0}\" (expected .csv, .json or .toml)")]
    UnsupportedFormat(String),
    #[error("unknown preset \"{0}\", available: {}", ControlConfig::PRESETS.join(", "))]
    UnknownPreset(String),
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl ConfigError {
    fn range(field: &'static str, message: impl Into<String>) -> Self {
        Self::RangeViolation {
            field,
            message: message.into(),
        }
    }
}

/// File format back-end for the configuration loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// One `key,value` pair per line, `#` starts a comment line.
    Csv,
    /// JSON object, optionally grouped into section objects.
    Json,
    /// TOML document, optionally grouped into tables.
    Toml,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Toml => "toml",
        };
        f.write_str(name)
    }
}

/// A key as read from the source, its value not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub key: String,
    /// `None` when the value is not a number.
    pub value: Option<f64>,
    /// Physical line in the source, when the format tracks it.
    pub line: Option<usize>,
    /// Source text of the entry, reported on error.
    pub raw: String,
}

impl ConfigFormat {
    /// Picks the back-end from the file extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Extracts every `key, value` entry from `content`.
    ///
    /// Values are kept raw; only known keys must later be numeric.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn parse(self, content: &str) -> Result<Vec<RawField>, ConfigError> {
        match self {
            Self::Csv => parse_csv(content),
            Self::Json => parse_json(content),
            Self::Toml => parse_toml(content),
        }
    }
}

fn parse_csv(content: &str) -> Result<Vec<RawField>, ConfigError> {
    let mut fields = Vec::new();
    for (idx, text) in content.lines().enumerate() {
        let line = Some(idx + 1);
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(trimmed.as_bytes())
            .records()
            .next()
            .transpose()
            .map_err(|e| ConfigError::Parse {
                line,
                raw: e.to_string(),
            })?;
        let malformed = || ConfigError::Parse {
            line,
            raw: trimmed.to_string(),
        };
        let record = record.ok_or_else(malformed)?;

        let (Some(key), Some(value)) = (record.get(0), record.get(1)) else {
            return Err(malformed());
        };
        if key.is_empty() {
            return Err(malformed());
        }
        fields.push(RawField {
            key: key.to_string(),
            value: value.parse::<f64>().ok(),
            line,
            raw: trimmed.to_string(),
        });
    }
    Ok(fields)
}

fn parse_json(content: &str) -> Result<Vec<RawField>, ConfigError> {
    let root: serde_json::Value = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        line: Some(e.line()),
        raw: e.to_string(),
    })?;
    let serde_json::Value::Object(root) = root else {
        return Err(ConfigError::Parse {
            line: None,
            raw: "top level must be a JSON object".to_string(),
        });
    };

    let mut fields = Vec::new();
    for (key, value) in &root {
        match value {
            serde_json::Value::Object(section) => {
                fields.extend(section.iter().map(|(inner, value)| json_field(inner, value)));
            }
            other => fields.push(json_field(key, other)),
        }
    }
    Ok(fields)
}

fn json_field(key: &str, value: &serde_json::Value) -> RawField {
    RawField {
        key: key.to_string(),
        value: value.as_f64(),
        line: None,
        raw: format!("{key} = {value}"),
    }
}

fn parse_toml(content: &str) -> Result<Vec<RawField>, ConfigError> {
    let root: toml::Table = toml::from_str(content).map_err(|e: toml::de::Error| {
        let line = e
            .span()
            .map(|span| content[..span.start].matches('\n').count() + 1);
        ConfigError::Parse {
            line,
            raw: e.message().to_string(),
        }
    })?;

    let mut fields = Vec::new();
    for (key, value) in &root {
        match value {
            toml::Value::Table(section) => {
                fields.extend(section.iter().map(|(inner, value)| toml_field(inner, value)));
            }
            other => fields.push(toml_field(key, other)),
        }
    }
    Ok(fields)
}

fn toml_field(key: &str, value: &toml::Value) -> RawField {
    let number = match value {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        _ => None,
    };
    RawField {
        key: key.to_string(),
        value: number,
        line: None,
        raw: format!("{key} = {value}"),
    }
}

impl ControlConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline"];

    /// Reference parameters of the field deployment.
    pub fn baseline() -> Self {
        Self {
            v_ref_upper: 241.0,
            v_ref_lower: 198.0,
            deadband_upper: 2.0,
            deadband_lower: 2.0,
            v_enter_lower: 160.0,
            kp_upper: 1.0,
            ki_upper: 0.1,
            kp_lower: 1.0,
            ki_lower: 0.1,
            p_step_max: 10.0,
            p_charge_max: 125.0,
            p_discharge_max: 125.0,
            soc_max: 0.95,
            soc_min: 0.15,
        }
    }

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] if the name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            _ => Err(ConfigError::UnknownPreset(name.to_string())),
        }
    }

    /// Parses and validates a configuration held in memory.
    ///
    /// # Errors
    ///
    /// Returns the first parse, resolution, or range error encountered.
    pub fn from_str_with_format(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let fields = format.parse(content)?;
        let cfg = Self::from_fields(&fields)?;
        let mut violations = cfg.validate();
        if violations.is_empty() {
            return Ok(cfg);
        }
        for v in &violations {
            error!(%v, "configuration rejected");
        }
        Err(violations.swap_remove(0))
    }

    /// Resolves the required keys from raw entries.
    ///
    /// Unknown keys are logged and ignored whatever their value; a repeated
    /// key keeps its last value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for a known key with a non-numeric
    /// value, or [`ConfigError::MissingField`] for the first absent one.
    pub fn from_fields(fields: &[RawField]) -> Result<Self, ConfigError> {
        let mut known: BTreeMap<&'static str, f64> = BTreeMap::new();
        for field in fields {
            let Some(name) = FIELD_NAMES.iter().find(|name| **name == field.key) else {
                warn!(key = %field.key, "unknown configuration key ignored");
                continue;
            };
            let value = field.value.ok_or_else(|| ConfigError::Parse {
                line: field.line,
                raw: field.raw.clone(),
            })?;
            if known.insert(*name, value).is_some() {
                warn!(key = %field.key, "duplicate configuration key, keeping last value");
            }
        }

        let get = |name: &'static str| {
            known
                .get(name)
                .copied()
                .ok_or(ConfigError::MissingField(name))
        };

        Ok(Self {
            v_ref_upper: get("V_ref_upper")?,
            v_ref_lower: get("V_ref_lower")?,
            deadband_upper: get("Deadband_upper")?,
            deadband_lower: get("Deadband_lower")?,
            v_enter_lower: get("V_enter_lower")?,
            kp_upper: get("Kp_upper")?,
            ki_upper: get("Ki_upper")?,
            kp_lower: get("Kp_lower")?,
            ki_lower: get("Ki_lower")?,
            p_step_max: get("P_step_max")?,
            p_charge_max: get("P_charge_max")?,
            p_discharge_max: get("P_discharge_max")?,
            soc_max: get("SOC_max")?,
            soc_min: get("SOC_min")?,
        })
    }

    /// Returns `(key, value)` pairs in record order.
    pub fn fields(&self) -> [(&'static str, f64); 14] {
        let values = [
            self.v_ref_upper,
            self.v_ref_lower,
            self.deadband_upper,
            self.deadband_lower,
            self.v_enter_lower,
            self.kp_upper,
            self.ki_upper,
            self.kp_lower,
            self.ki_lower,
            self.p_step_max,
            self.p_charge_max,
            self.p_discharge_max,
            self.soc_max,
            self.soc_min,
        ];
        std::array::from_fn(|i| (FIELD_NAMES[i], values[i]))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (name, value) in self.fields() {
            if !value.is_finite() {
                errors.push(ConfigError::range(name, "must be a finite number"));
            }
        }

        if self.v_ref_lower >= self.v_ref_upper {
            errors.push(ConfigError::range("V_ref_lower", "must be < V_ref_upper"));
        }
        if !(0.0..=1.0).contains(&self.soc_min) {
            errors.push(ConfigError::range("SOC_min", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&self.soc_max) {
            errors.push(ConfigError::range("SOC_max", "must be in [0.0, 1.0]"));
        }
        if self.soc_min >= self.soc_max {
            errors.push(ConfigError::range("SOC_min", "must be < SOC_max"));
        }

        let magnitudes = [
            ("Deadband_upper", self.deadband_upper),
            ("Deadband_lower", self.deadband_lower),
            ("Kp_upper", self.kp_upper),
            ("Ki_upper", self.ki_upper),
            ("Kp_lower", self.kp_lower),
            ("Ki_lower", self.ki_lower),
            ("P_step_max", self.p_step_max),
            ("P_charge_max", self.p_charge_max),
            ("P_discharge_max", self.p_discharge_max),
        ];
        for (name, value) in magnitudes {
            if value < 0.0 {
                errors.push(ConfigError::range(name, "must be >= 0"));
            }
        }

        errors
    }
}

/// Loads, resolves, and validates a configuration file.
///
/// The back-end is chosen from the file extension.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, is malformed, lacks a
/// required key, or violates a range constraint.
pub fn load_configuration(path: &Path) -> Result<ControlConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = ControlConfig::from_str_with_format(&content, format)?;
    info!(path = %path.display(), %format, "configuration loaded");
    for (name, value) in cfg.fields() {
        debug!(key = name, value, "configuration value");
    }
    Ok(cfg)
}
