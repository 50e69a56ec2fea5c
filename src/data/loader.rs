//! Catalog loading from JSON telemetry files

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use serde::Serialize;

use super::{Catalog, OrbitRegime, RawSample, RiskLevel};

/// Load a telemetry catalog from a JSON (or `.gz` compressed JSON) file
pub fn load_catalog(path: impl AsRef<Path>, received_at_ms: i64) -> Result<Catalog> {
    let path = path.as_ref();
    let catalog = Catalog::from_raw(load_records(path)?, received_at_ms);

    log::info!("Loaded {} telemetry samples from {:?}", catalog.len(), path);
    Ok(catalog)
}

/// Read the raw upstream records from a JSON (or `.gz` compressed JSON) file
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawSample>> {
    let path = path.as_ref();
    log::debug!("Loading telemetry records from {:?}", path);

    let file =
        File::open(path).with_context(|| format!("Failed to open telemetry file: {:?}", path))?;
    let reader = BufReader::new(file);

    let value: serde_json::Value = if is_gzip(path) {
        serde_json::from_reader(GzDecoder::new(reader))
            .with_context(|| "Failed to parse compressed telemetry JSON")?
    } else {
        serde_json::from_reader(reader).with_context(|| "Failed to parse telemetry JSON")?
    };

    parse_records(value)
}

/// Parse a catalog from any JSON reader
pub fn read_catalog(reader: impl Read, received_at_ms: i64) -> Result<Catalog> {
    let value: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| "Failed to parse telemetry JSON")?;
    Ok(Catalog::from_raw(parse_records(value)?, received_at_ms))
}

/// Accept a bare array or an object wrapping one under a known key.
///
/// Individual records that fail to deserialize are skipped, not fatal.
pub fn parse_records(value: serde_json::Value) -> Result<Vec<RawSample>> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => {
            let key = ["satellites", "objects", "positions", "data"]
                .into_iter()
                .find(|k| map.get(*k).map(|v| v.is_array()).unwrap_or(false))
                .ok_or_else(|| anyhow!("Telemetry JSON object has no record array"))?;
            match map.remove(key) {
                Some(serde_json::Value::Array(items)) => items,
                _ => return Err(anyhow!("Telemetry JSON object has no record array")),
            }
        }
        _ => return Err(anyhow!("Telemetry JSON must be an array or an object")),
    };

    let total = items.len();
    let mut records = Vec::with_capacity(total);
    for item in items {
        match serde_json::from_value::<RawSample>(item) {
            Ok(raw) => records.push(raw),
            Err(e) => log::debug!("Skipping malformed telemetry record: {}", e),
        }
    }

    if records.len() < total {
        log::warn!(
            "Skipped {} of {} malformed telemetry records",
            total - records.len(),
            total
        );
    }

    Ok(records)
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Statistics about a loaded catalog
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_objects: usize,
    pub low_risk: usize,
    pub elevated_risk: usize,
    pub high_risk: usize,
    pub unknown_risk: usize,
    pub leo: usize,
    pub meo: usize,
    pub geo: usize,
    pub heo: usize,
}

impl CatalogStats {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut stats = Self {
            total_objects: catalog.len(),
            ..Self::default()
        };

        for sample in catalog.iter() {
            match sample.risk_level {
                RiskLevel::Low => stats.low_risk += 1,
                RiskLevel::Elevated => stats.elevated_risk += 1,
                RiskLevel::High => stats.high_risk += 1,
                RiskLevel::Unknown => stats.unknown_risk += 1,
            }

            match OrbitRegime::classify(sample.altitude_km) {
                OrbitRegime::Leo => stats.leo += 1,
                OrbitRegime::Meo => stats.meo += 1,
                OrbitRegime::Geo => stats.geo += 1,
                OrbitRegime::Heo => stats.heo += 1,
            }
        }

        stats
    }
}
