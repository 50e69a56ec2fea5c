//! Runtime settings for the globe engine and the headless replay

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::renderer::{DEFAULT_ALTITUDE_SCALE_KM, INTERPOLATION_EPSILON_MS};

/// Nominal telemetry refresh period
pub const DEFAULT_REFRESH_INTERVAL_MS: f64 = 5_000.0;

/// Engine settings (all fields optional in the JSON file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Telemetry polling interval, also the interpolation fallback duration
    pub refresh_interval_ms: f64,
    /// Kilometres of altitude per earth radius of visual separation
    pub altitude_scale_km: f64,
    /// Smallest duration the interpolation divides by
    pub interpolation_epsilon_ms: f64,
    /// Filter selected at startup (must name an entry in the registry)
    pub default_filter: String,
    /// Frame rate used by the headless replay
    pub max_fps: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            altitude_scale_km: DEFAULT_ALTITUDE_SCALE_KM,
            interpolation_epsilon_ms: INTERPOLATION_EPSILON_MS,
            default_filter: "all".to_string(),
            max_fps: 60.0,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading settings from {:?}", path);

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let settings: Settings =
            serde_json::from_str(&text).with_context(|| "Failed to parse settings JSON")?;

        Ok(settings.sanitized())
    }

    /// Replace out-of-range values with their defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.refresh_interval_ms.is_finite() || self.refresh_interval_ms <= 0.0 {
            log::warn!(
                "Invalid refresh interval {}, using {}",
                self.refresh_interval_ms,
                defaults.refresh_interval_ms
            );
            self.refresh_interval_ms = defaults.refresh_interval_ms;
        }
        if !self.altitude_scale_km.is_finite() || self.altitude_scale_km <= 0.0 {
            log::warn!(
                "Invalid altitude scale {}, using {}",
                self.altitude_scale_km,
                defaults.altitude_scale_km
            );
            self.altitude_scale_km = defaults.altitude_scale_km;
        }
        if !self.interpolation_epsilon_ms.is_finite() || self.interpolation_epsilon_ms <= 0.0 {
            self.interpolation_epsilon_ms = defaults.interpolation_epsilon_ms;
        }
        if !self.max_fps.is_finite() {
            self.max_fps = defaults.max_fps;
        }
        self.max_fps = self.max_fps.clamp(1.0, 500.0);
        self
    }

    /// Frame period for the configured frame rate
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.max_fps as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "refresh_interval_ms": 2000.0 }"#)
            .unwrap();
        assert_eq!(settings.refresh_interval_ms, 2000.0);
        assert_eq!(settings.altitude_scale_km, DEFAULT_ALTITUDE_SCALE_KM);
        assert_eq!(settings.default_filter, "all");
    }

    #[test]
    fn test_sanitize_rejects_nonpositive_values() {
        let settings = Settings {
            refresh_interval_ms: 0.0,
            altitude_scale_km: f64::NAN,
            interpolation_epsilon_ms: -1.0,
            max_fps: 10_000.0,
            ..Settings::default()
        }
        .sanitized();

        assert_eq!(settings.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert_eq!(settings.altitude_scale_km, DEFAULT_ALTITUDE_SCALE_KM);
        assert_eq!(settings.interpolation_epsilon_ms, INTERPOLATION_EPSILON_MS);
        assert_eq!(settings.max_fps, 500.0);
    }
}
