use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub taxonomy_path: PathBuf,
    pub geo_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Radius used for the nearby tier when the request does not supply one.
    pub search_default_radius_km: f64,
    /// Upper bound accepted for a request-supplied radius.
    pub search_max_radius_km: f64,
    /// Adjacent-city tier only runs when the first three tiers return fewer results.
    pub search_min_results: usize,
    pub search_adjacent_radius_multiplier: f64,
    pub search_adjacent_max_radius_km: f64,
    pub search_tier_timeout_ms: u64,
    /// Cap on rows fetched per tier query.
    pub search_tier_candidate_limit: i64,
    pub search_max_page_size: u32,
    /// How far a raw coordinate may be from a city centroid and still be attached to it.
    pub search_city_snap_radius_km: f64,
    /// Same bound for area centroids; the snapped area seeds the exact-area tier.
    pub search_area_snap_radius_km: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("taxonomy_path", &self.taxonomy_path)
            .field("geo_path", &self.geo_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("search_default_radius_km", &self.search_default_radius_km)
            .field("search_max_radius_km", &self.search_max_radius_km)
            .field("search_min_results", &self.search_min_results)
            .field(
                "search_adjacent_radius_multiplier",
                &self.search_adjacent_radius_multiplier,
            )
            .field(
                "search_adjacent_max_radius_km",
                &self.search_adjacent_max_radius_km,
            )
            .field("search_tier_timeout_ms", &self.search_tier_timeout_ms)
            .field(
                "search_tier_candidate_limit",
                &self.search_tier_candidate_limit,
            )
            .field("search_max_page_size", &self.search_max_page_size)
            .field(
                "search_city_snap_radius_km",
                &self.search_city_snap_radius_km,
            )
            .field(
                "search_area_snap_radius_km",
                &self.search_area_snap_radius_km,
            )
            .finish()
    }
}
