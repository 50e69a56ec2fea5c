//! SGP4 propagation using satkit, reported as geodetic telemetry

use std::f64::consts::PI;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Datelike, Timelike, Utc};
use glam::DVec3;
use satkit::sgp4::sgp4;

use super::{load_tle_file, parse_tle_text, ElementSet};
use crate::data::{assess_risk, RawSample, RawTimestamp};
use crate::telemetry::{TelemetryError, TelemetrySource};

/// WGS84 semi-major axis (km)
const WGS84_A_KM: f64 = 6378.137;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// First eccentricity squared
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Geodetic state of one propagated object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticState {
    pub latitude_deg: f64,
    /// Wrapped to [-180, 180]
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub velocity_km_s: f64,
    /// Hours between the element epoch and the propagation time
    pub elements_age_hours: f64,
}

/// Julian date of a unix millisecond timestamp
pub fn julian_date(unix_ms: i64) -> f64 {
    unix_ms as f64 / MS_PER_DAY + UNIX_EPOCH_JD
}

/// Greenwich mean sidereal time (radians, [0, 2π))
pub fn gmst_rad(julian_date: f64) -> f64 {
    let t = (julian_date - J2000_JD) / 36_525.0;
    let seconds = 67_310.548_41 + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;
    (seconds.rem_euclid(86_400.0) * PI / 43_200.0).rem_euclid(2.0 * PI)
}

/// Rotate a TEME position (km) into the earth-fixed frame and convert it to
/// geodetic latitude (deg), longitude (deg) and altitude (km) on WGS84
pub fn teme_to_geodetic(position_km: DVec3, julian_date: f64) -> (f64, f64, f64) {
    let (sin_g, cos_g) = gmst_rad(julian_date).sin_cos();
    let x = position_km.x * cos_g + position_km.y * sin_g;
    let y = -position_km.x * sin_g + position_km.y * cos_g;
    let z = position_km.z;

    let p = (x * x + y * y).sqrt();
    let longitude = y.atan2(x);

    let mut latitude = z.atan2(p * (1.0 - WGS84_E2));
    let mut altitude = 0.0;
    for _ in 0..5 {
        let sin_lat = latitude.sin();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        altitude = if latitude.cos().abs() > 1e-9 {
            p / latitude.cos() - n
        } else {
            z.abs() - n * (1.0 - WGS84_E2)
        };
        latitude = z.atan2(p * (1.0 - WGS84_E2 * n / (n + altitude)));
    }

    let mut longitude_deg = longitude.to_degrees().rem_euclid(360.0);
    if longitude_deg > 180.0 {
        longitude_deg -= 360.0;
    }

    (latitude.to_degrees(), longitude_deg, altitude)
}

fn instant_from_unix_ms(unix_ms: i64) -> Option<satkit::Instant> {
    let time = DateTime::<Utc>::from_timestamp_millis(unix_ms)?;
    let seconds = time.second() as f64 + time.timestamp_subsec_millis() as f64 / 1000.0;
    satkit::Instant::from_datetime(
        time.year(),
        time.month() as i32,
        time.day() as i32,
        time.hour() as i32,
        time.minute() as i32,
        seconds,
    )
    .ok()
}

struct TrackedElements {
    elements: ElementSet,
    tle: satkit::TLE,
}

/// Holds parsed element sets and propagates them on demand
pub struct Propagator {
    tracked: Vec<TrackedElements>,
}

impl Propagator {
    /// Parse element sets with satkit; sets it rejects are skipped
    pub fn new(elements: Vec<ElementSet>) -> Self {
        let total = elements.len();
        let tracked: Vec<TrackedElements> = elements
            .into_iter()
            .filter_map(|elements| {
                match satkit::TLE::load_2line(&elements.line1, &elements.line2) {
                    Ok(tle) => Some(TrackedElements { elements, tle }),
                    Err(e) => {
                        log::trace!("Failed to parse TLE {}: {}", elements.norad_id, e);
                        None
                    }
                }
            })
            .collect();

        log::info!("Loaded {} of {} TLEs for propagation", tracked.len(), total);
        Self { tracked }
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    fn propagate_tle(
        tle: &satkit::TLE,
        at: &satkit::Instant,
        unix_ms: i64,
    ) -> Option<GeodeticState> {
        let mut tle = tle.clone();
        let result = sgp4(&mut tle, &[*at]).ok()?;

        // TEME, meters and m/s
        let pos = result.pos.column(0);
        let vel = result.vel.column(0);
        let position_km = DVec3::new(pos[0], pos[1], pos[2]) / 1000.0;
        let velocity_km_s = DVec3::new(vel[0], vel[1], vel[2]).length() / 1000.0;
        if !position_km.is_finite() || !velocity_km_s.is_finite() {
            return None;
        }

        let (latitude_deg, longitude_deg, altitude_km) =
            teme_to_geodetic(position_km, julian_date(unix_ms));
        let elements_age_hours = ((*at - tle.epoch).as_seconds() / 3600.0).abs();

        Some(GeodeticState {
            latitude_deg,
            longitude_deg,
            altitude_km,
            velocity_km_s,
            elements_age_hours,
        })
    }

    /// Propagate one object by catalog number
    pub fn propagate(&self, norad_id: u32, unix_ms: i64) -> Option<GeodeticState> {
        let tracked = self
            .tracked
            .iter()
            .find(|t| t.elements.norad_id == norad_id)?;
        let at = instant_from_unix_ms(unix_ms)?;
        Self::propagate_tle(&tracked.tle, &at, unix_ms)
    }

    /// Propagate every object and emit risk-assessed telemetry records
    pub fn propagate_all(&self, unix_ms: i64) -> Vec<RawSample> {
        let Some(at) = instant_from_unix_ms(unix_ms) else {
            log::warn!("Cannot propagate to out-of-range time {}", unix_ms);
            return Vec::new();
        };

        let mut samples = Vec::with_capacity(self.tracked.len());
        for tracked in &self.tracked {
            let Some(state) = Self::propagate_tle(&tracked.tle, &at, unix_ms) else {
                log::trace!("SGP4 failed for {}", tracked.elements.norad_id);
                continue;
            };

            let risk = assess_risk(
                &tracked.elements.name,
                state.altitude_km,
                state.velocity_km_s,
                state.elements_age_hours,
            );

            samples.push(RawSample {
                norad_id: Some(tracked.elements.norad_id),
                name: Some(tracked.elements.name.clone()),
                lat_deg: Some(state.latitude_deg),
                lon_deg: Some(state.longitude_deg),
                alt_km: Some(state.altitude_km),
                velocity_km_s: Some(state.velocity_km_s),
                timestamp: Some(RawTimestamp::Millis(unix_ms as f64)),
                risk_score: Some(risk.score),
                risk_level: Some(risk.level.label().to_string()),
                risk_reason: Some(risk.reason),
            });
        }

        samples
    }
}

/// Telemetry source that propagates a fixed set of element sets to the
/// requested time on every fetch
pub struct TleTelemetrySource {
    name: String,
    propagator: Propagator,
}

impl TleTelemetrySource {
    pub fn new(name: impl Into<String>, elements: Vec<ElementSet>) -> Self {
        Self {
            name: name.into(),
            propagator: Propagator::new(elements),
        }
    }

    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, parse_tle_text(text))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self::new(path.display().to_string(), load_tle_file(path)?))
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }
}

impl TelemetrySource for TleTelemetrySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self, now_ms: i64) -> Result<Vec<RawSample>, TelemetryError> {
        if self.propagator.is_empty() {
            return Err(TelemetryError::NoData {
                source_name: self.name.clone(),
            });
        }
        Ok(self.propagator.propagate_all(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RiskLevel, TelemetrySample};

    const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    /// 2008-09-20 12:25:40 UTC, the element epoch
    const ISS_EPOCH_MS: i64 = 1_221_913_540_000;

    #[test]
    fn test_julian_date_of_j2000() {
        // 2000-01-01T12:00:00Z
        assert!((julian_date(946_728_000_000) - J2000_JD).abs() < 1e-9);
    }

    #[test]
    fn test_gmst_at_j2000() {
        let gmst = gmst_rad(J2000_JD).to_degrees();
        assert!((gmst - 280.4606).abs() < 1e-3, "gmst {}", gmst);
    }

    #[test]
    fn test_geodetic_equator_and_pole() {
        let jd = J2000_JD;
        let (lat, _, alt) = teme_to_geodetic(DVec3::new(WGS84_A_KM + 500.0, 0.0, 0.0), jd);
        assert!(lat.abs() < 1e-9);
        assert!((alt - 500.0).abs() < 1e-6);

        let polar_radius = WGS84_A_KM * (1.0 - WGS84_F);
        let (lat, _, alt) = teme_to_geodetic(DVec3::new(0.0, 0.0, polar_radius + 100.0), jd);
        assert!((lat - 90.0).abs() < 1e-6);
        assert!((alt - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_longitude_is_wrapped() {
        for angle in [0.0f64, 1.0, 2.5, 4.0, 6.0] {
            let pos = DVec3::new(7000.0 * angle.cos(), 7000.0 * angle.sin(), 0.0);
            let (_, lon, _) = teme_to_geodetic(pos, J2000_JD + angle);
            assert!((-180.0..=180.0).contains(&lon));
        }
    }

    #[test]
    fn test_iss_propagates_to_low_orbit() {
        let source = TleTelemetrySource::from_text("iss", ISS_TLE);
        assert_eq!(source.propagator().len(), 1);

        let state = source.propagator().propagate(25544, ISS_EPOCH_MS).unwrap();
        assert!(
            state.altitude_km > 300.0 && state.altitude_km < 450.0,
            "altitude {}",
            state.altitude_km
        );
        assert!(state.latitude_deg.abs() <= 52.0);
        assert!(state.velocity_km_s > 7.4 && state.velocity_km_s < 7.9);
        assert!(state.elements_age_hours < 0.01);
    }

    #[test]
    fn test_fetch_emits_risk_assessed_samples() {
        let mut source = TleTelemetrySource::from_text("iss", ISS_TLE);
        let records = source.fetch(ISS_EPOCH_MS + 60_000).unwrap();
        assert_eq!(records.len(), 1);

        let sample = TelemetrySample::from_raw(records[0].clone(), 0).unwrap();
        assert_eq!(sample.norad_id, 25544);
        assert_eq!(sample.name, "ISS (ZARYA)");
        assert_eq!(sample.observed_at_ms, ISS_EPOCH_MS + 60_000);
        assert_ne!(sample.risk_level, RiskLevel::Unknown);
        assert!(sample.risk_score.is_some());
        assert!(sample.risk_reason.is_some());
    }

    #[test]
    fn test_empty_source_reports_no_data() {
        let mut source = TleTelemetrySource::from_text("empty", "");
        assert!(matches!(
            source.fetch(ISS_EPOCH_MS),
            Err(TelemetryError::NoData { .. })
        ));
    }
}
