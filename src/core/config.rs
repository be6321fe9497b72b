//! Monitor configuration.
//!
//! Options arrive as loosely typed records (`serde_json::Value`). [`validate`]
//! checks them field by field, stopping at the first invalid one, and produces
//! a normalized [`ConfigPatch`]. [`Config::merge`] folds a patch into an
//! existing configuration and returns a new value; the stored configuration is
//! never edited in place.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::error::{MonitorError, Result};

/// Default sampling interval (ms)
pub const DEFAULT_INTERVAL_MS: u64 = 3000;

/// Free memory/disk limits: an integer, or a fraction written as `0.x`
static LIMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+(?:\.0+)?|0?\.\d+)$").expect("valid limit pattern"));

/// Numeric strings accepted wherever a number is expected
static NUMERIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid numeric pattern")
});

/// A free-resource limit, tagged once at validation time.
///
/// Values below 1 are fractions of the relevant total, everything else is an
/// absolute byte count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Fraction(f64),
    Absolute(f64),
}

impl Limit {
    pub fn from_number(value: f64) -> Self {
        if value < 1.0 {
            Limit::Fraction(value)
        } else {
            Limit::Absolute(value)
        }
    }

    /// Resolve to an absolute byte count against `total`
    pub fn resolve(&self, total: f64) -> f64 {
        match self {
            Limit::Fraction(fraction) => fraction * total,
            Limit::Absolute(bytes) => *bytes,
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Limit::Fraction(value) | Limit::Absolute(value) => *value,
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Fraction(0.0)
    }
}

/// Threshold configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    pub loadavg: [f64; 3],
    pub freemem: Limit,
    pub freedisk: Limit,
    /// Seconds; 0 disables the uptime check
    pub uptime: u64,
    /// Unrecognized threshold keys, kept as supplied
    pub extra: Map<String, Value>,
}

impl ThresholdSet {
    /// Defaults with load average limits set to `cores`
    pub fn for_cores(cores: usize) -> Self {
        let critical = cores.max(1) as f64;
        Self {
            loadavg: [critical; 3],
            freemem: Limit::default(),
            freedisk: Limit::default(),
            uptime: 0,
            extra: Map::new(),
        }
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::for_cores(cores)
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// 0 runs a single cycle
    pub interval_ms: u64,
    pub silent: bool,
    /// Run the first cycle right away instead of after one interval
    pub immediate: bool,
    pub looped: bool,
    pub thresholds: ThresholdSet,
    /// Unrecognized top-level keys, kept as supplied
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            silent: false,
            immediate: false,
            looped: false,
            thresholds: ThresholdSet::default(),
            extra: Map::new(),
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Fold a validated patch into this configuration, producing a new one.
    ///
    /// Top-level keys are replaced one by one; `threshold` is merged one
    /// level deep so omitted thresholds keep their current values.
    pub fn merge(&self, patch: &ConfigPatch) -> Config {
        let mut merged = self.clone();

        if let Some(interval_ms) = patch.interval_ms {
            merged.interval_ms = interval_ms;
        }
        if let Some(silent) = patch.silent {
            merged.silent = silent;
        }
        if let Some(immediate) = patch.immediate {
            merged.immediate = immediate;
        }
        if let Some(looped) = patch.looped {
            merged.looped = looped;
        }
        if let Some(thresholds) = &patch.thresholds {
            let current = &mut merged.thresholds;
            if let Some(loadavg) = thresholds.loadavg {
                current.loadavg = loadavg;
            }
            if let Some(freemem) = thresholds.freemem {
                current.freemem = freemem;
            }
            if let Some(freedisk) = thresholds.freedisk {
                current.freedisk = freedisk;
            }
            if let Some(uptime) = thresholds.uptime {
                current.uptime = uptime;
            }
            for (key, value) in &thresholds.extra {
                current.extra.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &patch.extra {
            merged.extra.insert(key.clone(), value.clone());
        }

        merged
    }

    /// Validate `options` and merge them into this configuration
    pub fn apply(&self, options: &Value) -> Result<(Config, ConfigPatch)> {
        let patch = validate(options)?;
        Ok((self.merge(&patch), patch))
    }

    /// Render in the external option-record shape
    pub fn to_value(&self) -> Value {
        let mut threshold = self.thresholds.extra.clone();
        threshold.insert("loadavg".into(), json!(self.thresholds.loadavg));
        threshold.insert("freemem".into(), json!(self.thresholds.freemem.as_number()));
        threshold.insert("freedisk".into(), json!(self.thresholds.freedisk.as_number()));
        threshold.insert("uptime".into(), json!(self.thresholds.uptime));

        let mut record = self.extra.clone();
        record.insert("interval".into(), json!(self.interval_ms));
        record.insert("silent".into(), json!(self.silent));
        record.insert("immediate".into(), json!(self.immediate));
        record.insert("loop".into(), json!(self.looped));
        record.insert("threshold".into(), Value::Object(threshold));
        Value::Object(record)
    }
}

/// Normalized, validated subset of options supplied by a caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub interval_ms: Option<u64>,
    pub silent: Option<bool>,
    pub immediate: Option<bool>,
    pub looped: Option<bool>,
    pub thresholds: Option<ThresholdPatch>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdPatch {
    pub loadavg: Option<[f64; 3]>,
    pub freemem: Option<Limit>,
    pub freedisk: Option<Limit>,
    pub uptime: Option<u64>,
    pub extra: Map<String, Value>,
}

impl ConfigPatch {
    /// Render only the fields this patch sets
    pub fn to_value(&self) -> Value {
        let mut record = self.extra.clone();
        if let Some(interval_ms) = self.interval_ms {
            record.insert("interval".into(), json!(interval_ms));
        }
        if let Some(silent) = self.silent {
            record.insert("silent".into(), json!(silent));
        }
        if let Some(immediate) = self.immediate {
            record.insert("immediate".into(), json!(immediate));
        }
        if let Some(looped) = self.looped {
            record.insert("loop".into(), json!(looped));
        }
        if let Some(thresholds) = &self.thresholds {
            let mut threshold = thresholds.extra.clone();
            if let Some(loadavg) = thresholds.loadavg {
                threshold.insert("loadavg".into(), json!(loadavg));
            }
            if let Some(freemem) = thresholds.freemem {
                threshold.insert("freemem".into(), json!(freemem.as_number()));
            }
            if let Some(freedisk) = thresholds.freedisk {
                threshold.insert("freedisk".into(), json!(freedisk.as_number()));
            }
            if let Some(uptime) = thresholds.uptime {
                threshold.insert("uptime".into(), json!(uptime));
            }
            record.insert("threshold".into(), Value::Object(threshold));
        }
        Value::Object(record)
    }
}

/// Validate a partial option record.
///
/// Stops at the first invalid field. Unknown keys are carried through
/// untouched.
pub fn validate(options: &Value) -> Result<ConfigPatch> {
    let record = options
        .as_object()
        .ok_or_else(|| MonitorError::InvalidType(type_name(options).to_string()))?;

    let mut patch = ConfigPatch::default();
    for (key, value) in record {
        match key.as_str() {
            "interval" | "delay" => patch.interval_ms = Some(non_negative_integer(key, value)?),
            "silent" => patch.silent = Some(boolean(key, value)?),
            "immediate" => patch.immediate = Some(boolean(key, value)?),
            "loop" => patch.looped = Some(boolean(key, value)?),
            "threshold" => patch.thresholds = Some(validate_thresholds(value)?),
            _ => {
                patch.extra.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(patch)
}

fn validate_thresholds(value: &Value) -> Result<ThresholdPatch> {
    let record = value.as_object().ok_or_else(|| {
        MonitorError::invalid_field(
            "threshold",
            format!("expected a record, got {}", type_name(value)),
        )
    })?;

    let mut patch = ThresholdPatch::default();
    for (key, value) in record {
        match key.as_str() {
            "loadavg" => patch.loadavg = Some(loadavg(value)?),
            "freemem" => patch.freemem = Some(limit("threshold.freemem", value)?),
            "freedisk" => patch.freedisk = Some(limit("threshold.freedisk", value)?),
            "uptime" => patch.uptime = Some(non_negative_integer("threshold.uptime", value)?),
            _ => {
                patch.extra.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(patch)
}

fn loadavg(value: &Value) -> Result<[f64; 3]> {
    const FIELD: &str = "threshold.loadavg";

    match value {
        Value::Array(items) => {
            if items.len() != 3 {
                return Err(MonitorError::invalid_field(
                    FIELD,
                    format!("expected 3 entries, got {}", items.len()),
                ));
            }
            let mut levels = [0.0; 3];
            for (slot, item) in levels.iter_mut().zip(items) {
                *slot = non_negative(FIELD, item)?;
            }
            Ok(levels)
        }
        scalar => {
            let level = non_negative(FIELD, scalar)?;
            Ok([level; 3])
        }
    }
}

fn limit(field: &str, value: &Value) -> Result<Limit> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(MonitorError::invalid_field(
                field,
                format!("expected a number, got {}", type_name(other)),
            ))
        }
    };

    if !LIMIT_PATTERN.is_match(&text) {
        return Err(MonitorError::invalid_field(
            field,
            format!("'{}' is neither an integer nor a 0.x fraction", text),
        ));
    }

    let number = text
        .parse::<f64>()
        .map_err(|e| MonitorError::invalid_field(field, e.to_string()))?;
    Ok(Limit::from_number(number))
}

fn non_negative_integer(field: &str, value: &Value) -> Result<u64> {
    let number = non_negative(field, value)?;
    Ok(number.trunc() as u64)
}

fn non_negative(field: &str, value: &Value) -> Result<f64> {
    let number = number(field, value)?;
    if !number.is_finite() || number < 0.0 {
        return Err(MonitorError::invalid_field(
            field,
            format!("expected a non-negative number, got {}", number),
        ));
    }
    Ok(number)
}

fn number(field: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            MonitorError::invalid_field(field, format!("{} is not representable", n))
        }),
        Value::String(s) if NUMERIC_PATTERN.is_match(s.trim()) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| MonitorError::invalid_field(field, e.to_string())),
        Value::String(s) => Err(MonitorError::invalid_field(
            field,
            format!("'{}' is not a number", s),
        )),
        other => Err(MonitorError::invalid_field(
            field,
            format!("expected a number, got {}", type_name(other)),
        )),
    }
}

fn boolean(field: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        MonitorError::invalid_field(field, format!("expected a boolean, got {}", type_name(value)))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "record",
    }
}
