//! Render-ready snapshots built from telemetry catalogs

use std::collections::HashMap;

use glam::Vec3;

use super::colors::risk_palette;
use super::projection::GeodeticProjector;
use crate::data::Catalog;

/// Render-ready form of one telemetry sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderDatum {
    pub norad_id: u32,
    /// Unit direction from the planet centre
    pub direction: Vec3,
    /// Distance from the planet centre (planet radii, >= 1)
    pub radius: f32,
    /// Linear RGB
    pub color: [f32; 3],
    /// Observation time (unix milliseconds)
    pub observed_at_ms: i64,
}

impl RenderDatum {
    pub fn position(&self) -> Vec3 {
        self.direction * self.radius
    }
}

/// Render datums keyed by NORAD id
pub type SnapshotMap = HashMap<u32, RenderDatum>;

/// Turns catalogs into snapshot maps
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder {
    projector: GeodeticProjector,
}

impl SnapshotBuilder {
    pub fn new(projector: GeodeticProjector) -> Self {
        Self { projector }
    }

    pub fn projector(&self) -> &GeodeticProjector {
        &self.projector
    }

    /// Project and colorize every sample in one pass
    pub fn build(&self, catalog: &Catalog) -> SnapshotMap {
        let palette = risk_palette();
        let mut snapshot = SnapshotMap::with_capacity(catalog.len());

        for sample in catalog.iter() {
            let projection = self.projector.project(
                sample.latitude_deg,
                sample.longitude_deg,
                sample.altitude_km,
            );
            snapshot.insert(
                sample.norad_id,
                RenderDatum {
                    norad_id: sample.norad_id,
                    direction: projection.direction,
                    radius: projection.radius,
                    color: palette.color(sample.risk_level),
                    observed_at_ms: sample.observed_at_ms,
                },
            );
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawSample, RiskLevel};
    use crate::renderer::colorize;

    #[test]
    fn test_build_covers_every_sample() {
        let catalog = Catalog::from_raw(
            vec![
                RawSample {
                    norad_id: Some(1),
                    lat_deg: Some(45.0),
                    alt_km: Some(6371.0),
                    risk_level: Some("high".into()),
                    timestamp: Some(crate::data::RawTimestamp::Millis(1000.0)),
                    ..Default::default()
                },
                RawSample {
                    norad_id: Some(2),
                    ..Default::default()
                },
            ],
            777,
        );

        let snapshot = SnapshotBuilder::default().build(&catalog);
        assert_eq!(snapshot.len(), 2);

        let first = snapshot[&1];
        assert!((first.radius - 2.0).abs() < 1e-6);
        assert!((first.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(first.color, colorize(RiskLevel::High));
        assert_eq!(first.observed_at_ms, 1000);

        let second = snapshot[&2];
        assert_eq!(second.color, colorize(RiskLevel::Unknown));
        assert_eq!(second.observed_at_ms, 777);
    }

    #[test]
    fn test_empty_catalog_builds_empty_snapshot() {
        let snapshot = SnapshotBuilder::default().build(&Catalog::default());
        assert!(snapshot.is_empty());
    }
}
