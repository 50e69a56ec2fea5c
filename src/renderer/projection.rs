//! Geodetic to render-space projection
//!
//! Render space is Y-up with the planet at the origin and unit radius.

use glam::{DVec3, Vec3};

/// Kilometres of altitude that add one planet radius of separation
pub const DEFAULT_ALTITUDE_SCALE_KM: f64 = 6371.0;

/// Direction used when the projected vector has no length
pub const FALLBACK_DIRECTION: Vec3 = Vec3::Z;

const DEGENERATE_LENGTH: f64 = 1.0e-12;

/// A projected sample: unit direction plus the scaled radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub direction: Vec3,
    /// Distance from the planet centre in planet radii (>= 1)
    pub radius: f32,
}

impl Projection {
    /// Reconstructed render-space position
    pub fn position(&self) -> Vec3 {
        self.direction * self.radius
    }
}

/// Replace NaN or infinite coordinates with zero
#[inline]
pub fn sanitize_coordinate(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticProjector {
    altitude_scale_km: f64,
}

impl Default for GeodeticProjector {
    fn default() -> Self {
        Self::new(DEFAULT_ALTITUDE_SCALE_KM)
    }
}

impl GeodeticProjector {
    pub fn new(altitude_scale_km: f64) -> Self {
        let altitude_scale_km = if altitude_scale_km.is_finite() && altitude_scale_km > 0.0 {
            altitude_scale_km
        } else {
            DEFAULT_ALTITUDE_SCALE_KM
        };
        Self { altitude_scale_km }
    }

    pub fn altitude_scale_km(&self) -> f64 {
        self.altitude_scale_km
    }

    /// Radius in planet radii for an altitude; negative altitudes clamp to the surface
    pub fn scaled_radius(&self, altitude_km: f64) -> f64 {
        1.0 + sanitize_coordinate(altitude_km).max(0.0) / self.altitude_scale_km
    }

    /// Project latitude/longitude (degrees) and altitude (km).
    ///
    /// The azimuth carries a +90° offset so longitude 0 faces +Z, matching
    /// the equirectangular globe texture.
    pub fn project(&self, latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Projection {
        let latitude_deg = sanitize_coordinate(latitude_deg);
        let longitude_deg = sanitize_coordinate(longitude_deg);
        let radius = self.scaled_radius(altitude_km);

        let theta = (90.0 - latitude_deg).to_radians();
        let phi = (longitude_deg + 90.0).to_radians();

        let v = DVec3::new(
            -radius * phi.cos() * theta.sin(),
            radius * theta.cos(),
            radius * phi.sin() * theta.sin(),
        );

        let length = v.length();
        let direction = if length.is_finite() && length > DEGENERATE_LENGTH {
            (v / length).as_vec3()
        } else {
            FALLBACK_DIRECTION
        };

        Projection {
            direction,
            radius: radius as f32,
        }
    }
}
