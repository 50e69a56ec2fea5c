//! Heuristic collision-risk scoring for propagated objects

use super::RiskLevel;

/// Name markers of large constellations that crowd their shells
const MEGA_CONSTELLATION_MARKERS: [&str; 8] = [
    "STARLINK",
    "ONEWEB",
    "IRIDIUM",
    "GLOBALSTAR",
    "NAVSTAR",
    "GALILEO",
    "GLONASS",
    "BEIDOU",
];

/// Altitude (km) above which the altitude term bottoms out
const GEO_ALTITUDE_KM: f64 = 36_000.0;
/// Element sets older than this are fully penalized
const STALE_ELEMENTS_HOURS: f64 = 72.0;

/// Score, level and a human-readable explanation
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub reason: String,
}

/// Check whether a name belongs to a mega-constellation
pub fn is_mega_constellation(name: &str) -> bool {
    let upper = name.to_uppercase();
    MEGA_CONSTELLATION_MARKERS
        .iter()
        .any(|marker| upper.contains(marker))
}

/// Score an object from its altitude, speed and element-set age.
///
/// Weights: altitude 0.4, crowding 0.3, velocity deviation 0.15, age 0.15.
pub fn assess_risk(
    name: &str,
    altitude_km: f64,
    velocity_km_s: f64,
    elements_age_hours: f64,
) -> RiskAssessment {
    let altitude_score = (1.0 - altitude_km / GEO_ALTITUDE_KM).clamp(0.05, 0.98);

    let mega = is_mega_constellation(name);
    let crowding_score = if altitude_km < 1200.0 {
        if mega {
            0.85
        } else {
            0.55
        }
    } else if altitude_km < 20_000.0 {
        if mega {
            0.5
        } else {
            0.3
        }
    } else {
        0.2
    };

    let age_hours = elements_age_hours.max(0.0);
    let age_score = (age_hours / STALE_ELEMENTS_HOURS).clamp(0.0, 1.0);

    let nominal_velocity = if altitude_km > 2000.0 { 3.1 } else { 7.5 };
    let velocity_score = ((velocity_km_s - nominal_velocity).abs() / 1.2).clamp(0.0, 1.0);

    let score = (altitude_score * 0.4
        + crowding_score * 0.3
        + velocity_score * 0.15
        + age_score * 0.15)
        .clamp(0.0, 1.0);
    let level = RiskLevel::from_score(score);

    let mut drivers = Vec::new();
    if altitude_km < 500.0 {
        drivers.push("crowded very-low LEO altitude band");
    } else if altitude_km < 1200.0 {
        drivers.push("dense low Earth orbit population");
    } else if altitude_km < 20_000.0 {
        drivers.push("medium Earth orbital traffic");
    } else {
        drivers.push("sparser high-altitude regime");
    }
    if mega {
        drivers.push("mega-constellation membership");
    }
    if velocity_score > 0.4 {
        drivers.push("velocity deviation from nominal");
    }
    if age_hours > 48.0 {
        drivers.push("aging element set (>48h)");
    }
    let drivers = drivers.join(", ");

    let reason = match level {
        RiskLevel::High => format!("High collision exposure: {} (score {:.2})", drivers, score),
        RiskLevel::Elevated => format!("Heightened vigilance: {} (score {:.2})", drivers, score),
        _ => format!("Nominal conditions: {} (score {:.2})", drivers, score),
    };

    RiskAssessment {
        score,
        level,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crowded_leo_constellation_scores_higher() {
        let starlink = assess_risk("STARLINK-1007", 550.0, 7.6, 1.0);
        let lone = assess_risk("HUBBLE", 550.0, 7.6, 1.0);
        assert!(starlink.score > lone.score);
        assert!(starlink.reason.contains("mega-constellation"));
    }

    #[test]
    fn test_geo_object_is_low_risk() {
        let geo = assess_risk("INTELSAT 901", 35_786.0, 3.07, 1.0);
        assert_eq!(geo.level, RiskLevel::Low);
        assert!(geo.reason.starts_with("Nominal conditions"));
    }

    #[test]
    fn test_score_stays_in_unit_range() {
        let worst = assess_risk("STARLINK", 100.0, 20.0, 10_000.0);
        assert!(worst.score <= 1.0);
        assert_eq!(worst.level, RiskLevel::High);

        let negative_age = assess_risk("X", 800.0, 7.4, -50.0);
        assert!(negative_age.score >= 0.0);
    }
}
