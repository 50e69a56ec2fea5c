//! Named filter predicates that select the active set

use serde::Serialize;

use super::{Catalog, RiskLevel, TelemetrySample};

/// Altitude band of an orbit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrbitRegime {
    /// Below 2000 km
    Leo,
    /// 2000 km to 35000 km
    Meo,
    /// 35000 km to 40000 km
    Geo,
    /// Above 40000 km
    Heo,
}

impl OrbitRegime {
    pub fn classify(altitude_km: f64) -> Self {
        if altitude_km < 2000.0 {
            Self::Leo
        } else if altitude_km < 35_000.0 {
            Self::Meo
        } else if altitude_km < 40_000.0 {
            Self::Geo
        } else {
            Self::Heo
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Leo => "leo",
            Self::Meo => "meo",
            Self::Geo => "geo",
            Self::Heo => "heo",
        }
    }

    pub fn all() -> &'static [OrbitRegime] {
        &[
            OrbitRegime::Leo,
            OrbitRegime::Meo,
            OrbitRegime::Geo,
            OrbitRegime::Heo,
        ]
    }
}

/// Well-known constellation groups, matched by object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstellationGroup {
    Starlink,
    Gps,
    Galileo,
    Iss,
    Weather,
}

impl ConstellationGroup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Starlink => "starlink",
            Self::Gps => "gps",
            Self::Galileo => "galileo",
            Self::Iss => "iss",
            Self::Weather => "weather",
        }
    }

    pub fn all() -> &'static [ConstellationGroup] {
        &[
            ConstellationGroup::Starlink,
            ConstellationGroup::Gps,
            ConstellationGroup::Galileo,
            ConstellationGroup::Iss,
            ConstellationGroup::Weather,
        ]
    }

    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match self {
            Self::Starlink => name.contains("starlink"),
            Self::Gps => name.contains("gps") || name.contains("navstar"),
            Self::Galileo => name.contains("galileo"),
            Self::Iss => name
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == "iss" || token == "zarya"),
            Self::Weather => {
                name.contains("noaa") || name.contains("goes") || name.contains("metop")
            }
        }
    }
}

/// A predicate over telemetry samples
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectFilter {
    All,
    Risk(RiskLevel),
    /// Case-insensitive substring of the object name (or its NORAD id)
    NameContains(String),
    Group(ConstellationGroup),
    Regime(OrbitRegime),
}

impl ObjectFilter {
    /// Check if a sample matches this filter
    pub fn matches(&self, sample: &TelemetrySample) -> bool {
        match self {
            Self::All => true,
            Self::Risk(level) => sample.risk_level == *level,
            Self::NameContains(query) => {
                let query = query.trim().to_lowercase();
                query.is_empty()
                    || sample.name.to_lowercase().contains(&query)
                    || sample.norad_id.to_string() == query
            }
            Self::Group(group) => group.matches_name(&sample.name),
            Self::Regime(regime) => OrbitRegime::classify(sample.altitude_km) == *regime,
        }
    }
}

/// A registered filter and its display name
#[derive(Debug, Clone)]
pub struct NamedFilter {
    pub name: String,
    pub filter: ObjectFilter,
}

/// Number of catalog entries a filter currently admits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCount {
    pub name: String,
    pub count: usize,
}

/// Registry of named filters with exactly one selected entry
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    filters: Vec<NamedFilter>,
    selected: usize,
}

/// Name under which ad-hoc name searches are registered
pub const SEARCH_FILTER_NAME: &str = "search";

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self {
            filters: vec![NamedFilter {
                name: "all".to_string(),
                filter: ObjectFilter::All,
            }],
            selected: 0,
        };

        for level in RiskLevel::all() {
            registry.register(level.label().to_lowercase(), ObjectFilter::Risk(*level));
        }
        for group in ConstellationGroup::all() {
            registry.register(group.name(), ObjectFilter::Group(*group));
        }
        for regime in OrbitRegime::all() {
            registry.register(regime.name(), ObjectFilter::Regime(*regime));
        }

        registry
    }
}

impl FilterRegistry {
    /// Add a filter, replacing any existing filter with the same name
    pub fn register(&mut self, name: impl Into<String>, filter: ObjectFilter) {
        let name = name.into();
        if let Some(existing) = self.filters.iter_mut().find(|f| f.name == name) {
            existing.filter = filter;
        } else {
            self.filters.push(NamedFilter { name, filter });
        }
    }

    /// Select a filter by name. Unknown names leave the selection unchanged.
    pub fn select(&mut self, name: &str) -> bool {
        match self.filters.iter().position(|f| f.name == name) {
            Some(idx) => {
                self.selected = idx;
                true
            }
            None => {
                log::warn!("Unknown filter '{}'", name);
                false
            }
        }
    }

    /// Register and select a name-substring search
    pub fn search(&mut self, query: &str) {
        self.register(
            SEARCH_FILTER_NAME,
            ObjectFilter::NameContains(query.to_string()),
        );
        self.select(SEARCH_FILTER_NAME);
    }

    pub fn selected(&self) -> &NamedFilter {
        &self.filters[self.selected]
    }

    pub fn filters(&self) -> &[NamedFilter] {
        &self.filters
    }

    /// Identities admitted by the selected filter, in catalog order
    pub fn active_ids(&self, catalog: &Catalog) -> Vec<u32> {
        let filter = &self.selected().filter;
        catalog
            .iter()
            .filter(|sample| filter.matches(sample))
            .map(|sample| sample.norad_id)
            .collect()
    }

    /// Per-filter counts over a catalog
    pub fn counts(&self, catalog: &Catalog) -> Vec<FilterCount> {
        self.filters
            .iter()
            .map(|named| FilterCount {
                name: named.name.clone(),
                count: catalog.iter().filter(|s| named.filter.matches(s)).count(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u32, name: &str, alt: f64, risk: RiskLevel) -> TelemetrySample {
        TelemetrySample {
            norad_id: id,
            name: name.to_string(),
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_km: alt,
            velocity_km_s: None,
            risk_level: risk,
            risk_score: None,
            risk_reason: None,
            observed_at_ms: 0,
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_samples(
            vec![
                sample(1, "STARLINK-1", 550.0, RiskLevel::High),
                sample(2, "NAVSTAR 43", 20_200.0, RiskLevel::Low),
                sample(3, "ISS (ZARYA)", 420.0, RiskLevel::Elevated),
                sample(4, "NOAA 19", 850.0, RiskLevel::High),
                sample(5, "INTELSAT 901", 35_786.0, RiskLevel::Unknown),
            ],
            0,
        )
    }

    #[test]
    fn test_default_selection_is_all() {
        let registry = FilterRegistry::default();
        assert_eq!(registry.selected().name, "all");
        assert_eq!(registry.active_ids(&catalog()), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_high_risk_filter_keeps_catalog_order() {
        let mut registry = FilterRegistry::default();
        assert!(registry.select("high"));
        assert_eq!(registry.active_ids(&catalog()), vec![1, 4]);
    }

    #[test]
    fn test_unknown_filter_name_is_ignored() {
        let mut registry = FilterRegistry::default();
        registry.select("gps");
        assert!(!registry.select("nonexistent"));
        assert_eq!(registry.selected().name, "gps");
    }

    #[test]
    fn test_group_and_regime_filters() {
        let mut registry = FilterRegistry::default();
        registry.select("weather");
        assert_eq!(registry.active_ids(&catalog()), vec![4]);
        registry.select("geo");
        assert_eq!(registry.active_ids(&catalog()), vec![5]);
        registry.select("leo");
        assert_eq!(registry.active_ids(&catalog()), vec![1, 3, 4]);
    }

    #[test]
    fn test_iss_group_matches_whole_tokens() {
        let iss = ConstellationGroup::Iss;
        assert!(iss.matches_name("ISS (ZARYA)"));
        assert!(iss.matches_name("ISS DEB"));
        assert!(iss.matches_name("zarya"));
        assert!(!iss.matches_name("MISSION-1"));
        assert!(!iss.matches_name("SWISSCUBE"));
    }

    #[test]
    fn test_name_search_matches_substring_and_id() {
        let mut registry = FilterRegistry::default();
        registry.search("star");
        assert_eq!(registry.active_ids(&catalog()), vec![1, 2]);
        registry.search("3");
        assert_eq!(registry.active_ids(&catalog()), vec![2, 3]);
    }

    #[test]
    fn test_counts_cover_every_filter() {
        let registry = FilterRegistry::default();
        let counts = registry.counts(&catalog());
        assert_eq!(counts.len(), registry.filters().len());

        let count_of = |name: &str| counts.iter().find(|c| c.name == name).unwrap().count;
        assert_eq!(count_of("all"), 5);
        assert_eq!(count_of("high"), 2);
        assert_eq!(count_of("unknown"), 1);
        assert_eq!(count_of("gps"), 1);
    }
}
