use std::time::Duration;

use bazaar_core::AppConfig;

const DEFAULT_RADIUS_KM: f64 = 10.0;
const DEFAULT_MAX_RADIUS_KM: f64 = 50.0;
const DEFAULT_MIN_RESULTS: usize = 5;
const DEFAULT_ADJACENT_MULTIPLIER: f64 = 2.0;
const DEFAULT_ADJACENT_MAX_RADIUS_KM: f64 = 80.0;
const DEFAULT_TIER_TIMEOUT_MS: u64 = 1500;
const DEFAULT_TIER_CANDIDATE_LIMIT: i64 = 200;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_CITY_SNAP_RADIUS_KM: f64 = 30.0;
const DEFAULT_AREA_SNAP_RADIUS_KM: f64 = 5.0;

/// Confidence below which the taxonomy match is widened with a name search.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Tunables for one search service instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub default_radius_km: f64,
    pub max_radius_km: f64,
    /// Tiers 1–3 below this count trigger the adjacent-city tier.
    pub min_results: usize,
    pub adjacent_radius_multiplier: f64,
    pub adjacent_max_radius_km: f64,
    pub tier_timeout: Duration,
    pub tier_candidate_limit: i64,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub city_snap_radius_km: f64,
    pub area_snap_radius_km: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: DEFAULT_RADIUS_KM,
            max_radius_km: DEFAULT_MAX_RADIUS_KM,
            min_results: DEFAULT_MIN_RESULTS,
            adjacent_radius_multiplier: DEFAULT_ADJACENT_MULTIPLIER,
            adjacent_max_radius_km: DEFAULT_ADJACENT_MAX_RADIUS_KM,
            tier_timeout: Duration::from_millis(DEFAULT_TIER_TIMEOUT_MS),
            tier_candidate_limit: DEFAULT_TIER_CANDIDATE_LIMIT,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            city_snap_radius_km: DEFAULT_CITY_SNAP_RADIUS_KM,
            area_snap_radius_km: DEFAULT_AREA_SNAP_RADIUS_KM,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            default_radius_km: config.search_default_radius_km,
            max_radius_km: config.search_max_radius_km,
            min_results: config.search_min_results,
            adjacent_radius_multiplier: config.search_adjacent_radius_multiplier,
            adjacent_max_radius_km: config.search_adjacent_max_radius_km,
            tier_timeout: Duration::from_millis(config.search_tier_timeout_ms),
            tier_candidate_limit: config.search_tier_candidate_limit,
            default_page_size: DEFAULT_PAGE_SIZE.min(config.search_max_page_size),
            max_page_size: config.search_max_page_size,
            city_snap_radius_km: config.search_city_snap_radius_km,
            area_snap_radius_km: config.search_area_snap_radius_km,
        }
    }

    /// Starting radius of the adjacent-city tier for a given base radius.
    #[must_use]
    pub fn adjacent_start_radius(&self, base_radius_km: f64) -> f64 {
        (base_radius_km * self.adjacent_radius_multiplier)
            .min(self.adjacent_max_radius_km.max(base_radius_km))
    }
}
