//! Time-based blending between consecutive telemetry snapshots

use glam::Vec3;

use super::snapshot::RenderDatum;

/// Smallest interpolation duration (ms)
pub const INTERPOLATION_EPSILON_MS: f64 = 1.0;

/// Blend fraction for a datum pair.
///
/// The duration is the gap between the two observation times. A missing
/// previous timestamp or a non-positive gap falls back to the nominal
/// refresh interval.
pub fn alpha(
    elapsed_ms: f64,
    current_ts_ms: i64,
    previous_ts_ms: Option<i64>,
    fallback_interval_ms: f64,
) -> f32 {
    alpha_with_epsilon(
        elapsed_ms,
        current_ts_ms,
        previous_ts_ms,
        fallback_interval_ms,
        INTERPOLATION_EPSILON_MS,
    )
}

pub fn alpha_with_epsilon(
    elapsed_ms: f64,
    current_ts_ms: i64,
    previous_ts_ms: Option<i64>,
    fallback_interval_ms: f64,
    epsilon_ms: f64,
) -> f32 {
    let elapsed_ms = if elapsed_ms.is_finite() { elapsed_ms } else { 0.0 };

    let gap_ms = previous_ts_ms.map(|prev| current_ts_ms.saturating_sub(prev) as f64);
    let duration_ms = match gap_ms {
        Some(gap) if gap > 0.0 => gap,
        _ => fallback_interval_ms,
    };
    // f64::max discards NaN
    let duration_ms = duration_ms.max(epsilon_ms).max(f64::MIN_POSITIVE);

    (elapsed_ms / duration_ms).clamp(0.0, 1.0) as f32
}

/// Blended render-space position.
///
/// Directions are lerped and re-normalized, which approximates a great-circle
/// path for the small angular steps between refreshes. Without a previous
/// datum the current position is returned unchanged.
pub fn blend(previous: Option<&RenderDatum>, current: &RenderDatum, alpha: f32) -> Vec3 {
    let Some(previous) = previous else {
        return current.position();
    };

    let t = if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        1.0
    };

    let direction = previous
        .direction
        .lerp(current.direction, t)
        .try_normalize()
        .unwrap_or(current.direction);
    let radius = previous.radius + (current.radius - previous.radius) * t;

    direction * radius
}

/// Interpolation parameters shared by every datum in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    pub fallback_interval_ms: f64,
    pub epsilon_ms: f64,
}

impl Interpolator {
    pub fn new(fallback_interval_ms: f64, epsilon_ms: f64) -> Self {
        Self {
            fallback_interval_ms,
            epsilon_ms,
        }
    }

    pub fn alpha(&self, elapsed_ms: f64, current_ts_ms: i64, previous_ts_ms: Option<i64>) -> f32 {
        alpha_with_epsilon(
            elapsed_ms,
            current_ts_ms,
            previous_ts_ms,
            self.fallback_interval_ms,
            self.epsilon_ms,
        )
    }

    /// Position of one datum `elapsed_ms` after its snapshot was installed
    pub fn position(
        &self,
        previous: Option<&RenderDatum>,
        current: &RenderDatum,
        elapsed_ms: f64,
    ) -> Vec3 {
        let alpha = self.alpha(
            elapsed_ms,
            current.observed_at_ms,
            previous.map(|p| p.observed_at_ms),
        );
        blend(previous, current, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::GeodeticProjector;

    const FALLBACK: f64 = 5000.0;

    fn datum(lat: f64, lon: f64, alt: f64, ts: i64) -> RenderDatum {
        let p = GeodeticProjector::default().project(lat, lon, alt);
        RenderDatum {
            norad_id: 1,
            direction: p.direction,
            radius: p.radius,
            color: [1.0, 1.0, 1.0],
            observed_at_ms: ts,
        }
    }

    #[test]
    fn test_alpha_endpoints() {
        assert_eq!(alpha(0.0, 10_000, Some(5_000), FALLBACK), 0.0);
        assert_eq!(alpha(5_000.0, 10_000, Some(5_000), FALLBACK), 1.0);
        assert!((alpha(2_500.0, 10_000, Some(5_000), FALLBACK) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_is_monotonic_and_bounded() {
        let mut last = -1.0f32;
        for step in -10..200 {
            let elapsed = step as f64 * 50.0;
            let a = alpha(elapsed, 8_000, Some(5_000), FALLBACK);
            assert!((0.0..=1.0).contains(&a));
            assert!(a >= last);
            last = a;
        }
    }

    #[test]
    fn test_alpha_falls_back_for_degenerate_duration() {
        // Same timestamp, reversed timestamps and missing previous all use the fallback
        assert!((alpha(2_500.0, 5_000, Some(5_000), FALLBACK) - 0.5).abs() < 1e-6);
        assert!((alpha(2_500.0, 5_000, Some(9_000), FALLBACK) - 0.5).abs() < 1e-6);
        assert!((alpha(2_500.0, 5_000, None, FALLBACK) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_survives_bad_inputs() {
        assert_eq!(alpha(f64::NAN, 5_000, Some(0), FALLBACK), 0.0);
        assert_eq!(alpha(100.0, 5_000, None, 0.0), 1.0);
        assert_eq!(alpha(100.0, 5_000, None, f64::NAN), 1.0);
        assert_eq!(alpha(f64::INFINITY, i64::MIN, Some(i64::MAX), FALLBACK), 0.0);
    }

    #[test]
    fn test_blend_endpoints() {
        let prev = datum(0.0, 0.0, 500.0, 0);
        let cur = datum(10.0, 5.0, 800.0, 5_000);

        let start = blend(Some(&prev), &cur, 0.0);
        assert!((start - prev.position()).length() < 1e-5);

        let end = blend(Some(&prev), &cur, 1.0);
        assert!((end - cur.position()).length() < 1e-5);
    }

    #[test]
    fn test_blend_without_previous_is_exact() {
        let cur = datum(-33.0, 151.0, 550.0, 5_000);
        for a in [0.0, 0.3, 1.0, f32::NAN] {
            assert_eq!(blend(None, &cur, a), cur.position());
        }
    }

    #[test]
    fn test_blend_midpoint_lies_between() {
        let prev = datum(0.0, 0.0, 0.0, 0);
        let cur = datum(10.0, 0.0, 0.0, 5_000);
        let mid = blend(Some(&prev), &cur, 0.5);

        let lat = mid.normalize().y.asin().to_degrees();
        assert!((lat - 5.0).abs() < 0.05, "midpoint latitude {}", lat);
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_blend_interpolates_radius() {
        let prev = datum(0.0, 0.0, 0.0, 0);
        let cur = datum(0.0, 0.0, 6371.0, 5_000);
        let mid = blend(Some(&prev), &cur, 0.5);
        assert!((mid.length() - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_blend_antipodal_falls_back_to_current() {
        let prev = datum(0.0, 0.0, 0.0, 0);
        let cur = datum(0.0, 180.0, 0.0, 5_000);
        let mid = blend(Some(&prev), &cur, 0.5);
        assert!(mid.is_finite());
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_interpolator_uses_datum_timestamps() {
        let interpolator = Interpolator::new(FALLBACK, INTERPOLATION_EPSILON_MS);
        let prev = datum(0.0, 0.0, 0.0, 0);
        let cur = datum(10.0, 0.0, 0.0, 10_000);

        // 10 s gap between observations, 5 s elapsed
        let pos = interpolator.position(Some(&prev), &cur, 5_000.0);
        let lat = pos.normalize().y.asin().to_degrees();
        assert!((lat - 5.0).abs() < 0.05);
    }
}
