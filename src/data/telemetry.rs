//! Telemetry records: the upstream wire shape and the validated sample

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Score at or above which a sample is classed as high risk
pub const HIGH_RISK_SCORE: f64 = 0.7;
/// Score at or above which a sample is classed as elevated risk
pub const ELEVATED_RISK_SCORE: f64 = 0.4;

/// Categorical collision-risk classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Elevated,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    /// Normalize a free-form level string. Never fails.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "low" | "green" | "safe" | "nominal" => Self::Low,
            "elevated" | "amber" | "warning" | "medium" => Self::Elevated,
            "high" | "red" | "critical" => Self::High,
            _ => Self::Unknown,
        }
    }

    /// Classify a 0..1 risk score
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            Self::Unknown
        } else if score >= HIGH_RISK_SCORE {
            Self::High
        } else if score >= ELEVATED_RISK_SCORE {
            Self::Elevated
        } else {
            Self::Low
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Elevated => "Elevated",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }

    pub fn all() -> &'static [RiskLevel] {
        &[
            RiskLevel::Low,
            RiskLevel::Elevated,
            RiskLevel::High,
            RiskLevel::Unknown,
        ]
    }
}

/// Upstream timestamps arrive either as RFC 3339 text or epoch milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(f64),
    Text(String),
}

/// One telemetry record exactly as the upstream source reports it.
///
/// Every field is optional and wrongly-typed values read as `None`;
/// validation happens in [`TelemetrySample::from_raw`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSample {
    pub norad_id: Option<u32>,
    pub name: Option<String>,
    pub lat_deg: Option<f64>,
    pub lon_deg: Option<f64>,
    pub alt_km: Option<f64>,
    pub velocity_km_s: Option<f64>,
    pub timestamp: Option<RawTimestamp>,
    pub risk_score: Option<f64>,
    pub risk_level: Option<String>,
    pub risk_reason: Option<String>,
}

impl RawSample {
    /// Read a record from a JSON object.
    ///
    /// Each field accepts several spellings; the first one holding a usable
    /// value wins. Coordinates fall back to a nested `position` object and a
    /// `velocity` vector is reduced to its magnitude.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let position = fields.get("position").and_then(Value::as_object);
        let coordinate = |keys: &[&str]| {
            first(fields, keys, number).or_else(|| position.and_then(|p| first(p, keys, number)))
        };

        Self {
            norad_id: first(fields, &["norad_id", "id", "identity", "noradId"], identity),
            name: first(fields, &["name"], text),
            lat_deg: coordinate(&["lat_deg", "latitude", "lat"]),
            lon_deg: coordinate(&["lon_deg", "longitude", "lon", "lng"]),
            alt_km: coordinate(&["alt_km", "altitude", "alt"]),
            velocity_km_s: first(fields, &["velocity_km_s", "velocity"], speed),
            timestamp: first(
                fields,
                &["timestamp", "observed_at", "last_updated"],
                timestamp,
            ),
            risk_score: first(fields, &["risk_score"], number),
            risk_level: first(fields, &["risk_level"], text),
            risk_reason: first(fields, &["risk_reason"], text),
        }
    }

    fn has_coordinates(&self) -> bool {
        self.lat_deg.is_some() || self.lon_deg.is_some() || self.alt_km.is_some()
    }
}

impl<'de> Deserialize<'de> for RawSample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(&fields))
    }
}

fn first<T>(
    fields: &Map<String, Value>,
    keys: &[&str],
    read: fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(read)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn identity(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|id| u32::try_from(id).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<RawTimestamp> {
    match value {
        Value::Number(n) => n.as_f64().map(RawTimestamp::Millis),
        Value::String(s) => Some(RawTimestamp::Text(s.clone())),
        _ => None,
    }
}

fn speed(value: &Value) -> Option<f64> {
    match value {
        Value::Object(axes) => {
            let mut sum = 0.0;
            for axis in ["x", "y", "z"] {
                sum += axes.get(axis).and_then(number)?.powi(2);
            }
            Some(sum.sqrt())
        }
        other => number(other),
    }
}

/// A validated telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub norad_id: u32,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub velocity_km_s: Option<f64>,
    pub risk_level: RiskLevel,
    pub risk_score: Option<f64>,
    pub risk_reason: Option<String>,
    /// Observation time (unix milliseconds)
    pub observed_at_ms: i64,
}

impl TelemetrySample {
    /// Validate an upstream record.
    ///
    /// Returns `None` only when the record carries no identity; every other
    /// malformed field is replaced by a safe default.
    pub fn from_raw(raw: RawSample, received_at_ms: i64) -> Option<Self> {
        let norad_id = raw.norad_id?;
        let risk_score = raw.risk_score.filter(|s| s.is_finite());
        let risk_level = resolve_risk_level(raw.risk_level.as_deref(), risk_score);

        Some(Self {
            norad_id,
            name: raw
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("NORAD {}", norad_id)),
            latitude_deg: finite_or_zero(raw.lat_deg),
            longitude_deg: finite_or_zero(raw.lon_deg),
            altitude_km: finite_or_zero(raw.alt_km),
            velocity_km_s: raw.velocity_km_s.filter(|v| v.is_finite()),
            risk_level,
            risk_score,
            risk_reason: raw.risk_reason.filter(|r| !r.trim().is_empty()),
            observed_at_ms: timestamp_ms_or(raw.timestamp.as_ref(), received_at_ms),
        })
    }

    /// Risk label and score for the detail readout
    pub fn risk_summary(&self) -> String {
        match self.risk_score {
            Some(score) => format!("{} ({:.2})", self.risk_level.label(), score),
            None => self.risk_level.label().to_string(),
        }
    }
}

/// Missing or non-finite numeric fields become zero
pub fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Resolve a timestamp to unix milliseconds, substituting `now_ms` when
/// it is missing or unparsable
pub fn timestamp_ms_or(raw: Option<&RawTimestamp>, now_ms: i64) -> i64 {
    let parsed = match raw {
        Some(RawTimestamp::Millis(ms)) if ms.is_finite() => Some(ms.round() as i64),
        Some(RawTimestamp::Millis(_)) => None,
        Some(RawTimestamp::Text(text)) => parse_timestamp_text(text),
        None => None,
    };
    parsed.unwrap_or(now_ms)
}

fn parse_timestamp_text(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    text.parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite())
        .map(|ms| ms.round() as i64)
}

/// An explicit level wins; a score is only consulted when no level was sent
pub fn resolve_risk_level(level: Option<&str>, score: Option<f64>) -> RiskLevel {
    match level.map(str::trim).filter(|l| !l.is_empty()) {
        Some(text) => RiskLevel::parse(text),
        None => score.map(RiskLevel::from_score).unwrap_or_default(),
    }
}

/// Full telemetry catalog, one sample per identity, in upstream order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    samples: Vec<TelemetrySample>,
    index: HashMap<u32, usize>,
    received_at_ms: i64,
}

impl Catalog {
    /// Build a catalog, dropping repeated identities (first occurrence wins)
    pub fn from_samples(samples: Vec<TelemetrySample>, received_at_ms: i64) -> Self {
        let mut unique = Vec::with_capacity(samples.len());
        let mut index = HashMap::with_capacity(samples.len());
        let mut duplicates = 0usize;

        for sample in samples {
            if index.contains_key(&sample.norad_id) {
                duplicates += 1;
                continue;
            }
            index.insert(sample.norad_id, unique.len());
            unique.push(sample);
        }

        if duplicates > 0 {
            log::warn!("Dropped {} duplicate telemetry records", duplicates);
        }

        Self {
            samples: unique,
            index,
            received_at_ms,
        }
    }

    /// Validate raw upstream records into a catalog
    pub fn from_raw(records: Vec<RawSample>, received_at_ms: i64) -> Self {
        let total = records.len();
        let unplaced = records
            .iter()
            .filter(|raw| raw.norad_id.is_some() && !raw.has_coordinates())
            .count();
        if unplaced > 0 {
            log::warn!(
                "{} telemetry records carry no coordinates and will sit at 0,0",
                unplaced
            );
        }

        let samples: Vec<TelemetrySample> = records
            .into_iter()
            .filter_map(|raw| TelemetrySample::from_raw(raw, received_at_ms))
            .collect();

        let missing_id = total - samples.len();
        if missing_id > 0 {
            log::warn!("Skipped {} telemetry records without an identity", missing_id);
        }

        Self::from_samples(samples, received_at_ms)
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.samples.iter()
    }

    pub fn get(&self, norad_id: u32) -> Option<&TelemetrySample> {
        self.index.get(&norad_id).map(|&i| &self.samples[i])
    }

    pub fn contains(&self, norad_id: u32) -> bool {
        self.index.contains_key(&norad_id)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// When the catalog was received (unix milliseconds)
    pub fn received_at_ms(&self) -> i64 {
        self.received_at_ms
    }
}
