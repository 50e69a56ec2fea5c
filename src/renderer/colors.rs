//! Risk level to marker color mapping

use std::sync::OnceLock;

use crate::data::RiskLevel;

// Display-space (sRGB) source colors
const LOW_SRGB: [u8; 3] = [0x22, 0xc5, 0x5e];
const ELEVATED_SRGB: [u8; 3] = [0xf5, 0x9e, 0x0b];
const HIGH_SRGB: [u8; 3] = [0xef, 0x44, 0x44];
const UNKNOWN_SRGB: [u8; 3] = [0x9c, 0xa3, 0xaf];

/// Linear-RGB marker colors, one per risk level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskPalette {
    pub low: [f32; 3],
    pub elevated: [f32; 3],
    pub high: [f32; 3],
    pub unknown: [f32; 3],
}

impl RiskPalette {
    fn build() -> Self {
        Self {
            low: srgb_u8_to_linear(LOW_SRGB),
            elevated: srgb_u8_to_linear(ELEVATED_SRGB),
            high: srgb_u8_to_linear(HIGH_SRGB),
            unknown: srgb_u8_to_linear(UNKNOWN_SRGB),
        }
    }

    pub fn color(&self, level: RiskLevel) -> [f32; 3] {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Elevated => self.elevated,
            RiskLevel::High => self.high,
            RiskLevel::Unknown => self.unknown,
        }
    }
}

static PALETTE: OnceLock<RiskPalette> = OnceLock::new();

/// The shared palette, converted to linear space on first use
pub fn risk_palette() -> &'static RiskPalette {
    PALETTE.get_or_init(RiskPalette::build)
}

/// Linear RGB color for a risk level
pub fn colorize(level: RiskLevel) -> [f32; 3] {
    risk_palette().color(level)
}

/// Linear RGB color for a free-form level string; unrecognized text is gray
pub fn colorize_label(text: &str) -> [f32; 3] {
    colorize(RiskLevel::parse(text))
}

/// sRGB hex string for legends and reports
pub fn risk_hex(level: RiskLevel) -> String {
    let rgb = match level {
        RiskLevel::Low => LOW_SRGB,
        RiskLevel::Elevated => ELEVATED_SRGB,
        RiskLevel::High => HIGH_SRGB,
        RiskLevel::Unknown => UNKNOWN_SRGB,
    };
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[inline]
fn srgb_u8_to_linear(rgb: [u8; 3]) -> [f32; 3] {
    [
        srgb_to_linear(rgb[0]),
        srgb_to_linear(rgb[1]),
        srgb_to_linear(rgb[2]),
    ]
}

#[inline]
fn srgb_to_linear(c: u8) -> f32 {
    let x = (c as f32) / 255.0;
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_map_to_distinct_colors() {
        let colors: Vec<[f32; 3]> = RiskLevel::all().iter().map(|l| colorize(*l)).collect();
        for i in 0..colors.len() {
            for j in (i + 1)..colors.len() {
                assert_ne!(colors[i], colors[j]);
            }
        }
    }

    #[test]
    fn test_hue_families() {
        let low = colorize(RiskLevel::Low);
        assert!(low[1] > low[0] && low[1] > low[2], "low should be green");

        let high = colorize(RiskLevel::High);
        assert!(high[0] > high[1] && high[0] > high[2], "high should be red");

        let elevated = colorize(RiskLevel::Elevated);
        assert!(elevated[0] > elevated[1] && elevated[1] > elevated[2], "elevated should be amber");

        let unknown = colorize(RiskLevel::Unknown);
        let spread = unknown.iter().cloned().fold(f32::MIN, f32::max)
            - unknown.iter().cloned().fold(f32::MAX, f32::min);
        assert!(spread < 0.15, "unknown should be gray");
    }

    #[test]
    fn test_values_are_linear_not_display_space() {
        // sRGB 0x9c is ~0.61 in display space and ~0.33 linear
        let unknown = colorize(RiskLevel::Unknown);
        assert!((unknown[0] - 0.3325).abs() < 0.01);
    }

    #[test]
    fn test_unrecognized_label_is_gray() {
        assert_eq!(colorize_label("SEVERE!!"), risk_palette().unknown);
        assert_eq!(colorize_label("Red"), risk_palette().high);
    }

    #[test]
    fn test_hex_legend() {
        assert_eq!(risk_hex(RiskLevel::High), "#ef4444");
    }
}
