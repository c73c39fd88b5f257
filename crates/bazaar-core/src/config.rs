use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Distances and multipliers must be finite and strictly positive.
    let parse_positive_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(var, format!("must be a positive number, got {value}")));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("BAZAAR_ENV", "development"))?;

    let bind_addr = parse_addr("BAZAAR_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("BAZAAR_LOG_LEVEL", "info");
    let taxonomy_path = PathBuf::from(or_default(
        "BAZAAR_TAXONOMY_PATH",
        "./config/taxonomy.yaml",
    ));
    let geo_path = PathBuf::from(or_default("BAZAAR_GEO_PATH", "./config/geo.yaml"));

    let db_max_connections = parse_u32("BAZAAR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BAZAAR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BAZAAR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let search_default_radius_km = parse_positive_f64("BAZAAR_SEARCH_DEFAULT_RADIUS_KM", "10")?;
    let search_max_radius_km = parse_positive_f64("BAZAAR_SEARCH_MAX_RADIUS_KM", "50")?;
    if search_default_radius_km > search_max_radius_km {
        return Err(invalid(
            "BAZAAR_SEARCH_DEFAULT_RADIUS_KM",
            format!(
                "default radius {search_default_radius_km} exceeds max radius {search_max_radius_km}"
            ),
        ));
    }
    let search_min_results = parse_usize("BAZAAR_SEARCH_MIN_RESULTS", "5")?;
    let search_adjacent_radius_multiplier =
        parse_positive_f64("BAZAAR_SEARCH_ADJACENT_RADIUS_MULTIPLIER", "2.0")?;
    let search_adjacent_max_radius_km =
        parse_positive_f64("BAZAAR_SEARCH_ADJACENT_MAX_RADIUS_KM", "80")?;
    let search_tier_timeout_ms = parse_u64("BAZAAR_SEARCH_TIER_TIMEOUT_MS", "1500")?;
    let search_tier_candidate_limit = i64::from(parse_u32(
        "BAZAAR_SEARCH_TIER_CANDIDATE_LIMIT",
        "200",
    )?);
    let search_max_page_size = parse_u32("BAZAAR_SEARCH_MAX_PAGE_SIZE", "100")?;
    if search_max_page_size == 0 {
        return Err(invalid(
            "BAZAAR_SEARCH_MAX_PAGE_SIZE",
            "must be at least 1".to_string(),
        ));
    }
    let search_city_snap_radius_km =
        parse_positive_f64("BAZAAR_SEARCH_CITY_SNAP_RADIUS_KM", "30")?;
    let search_area_snap_radius_km =
        parse_positive_f64("BAZAAR_SEARCH_AREA_SNAP_RADIUS_KM", "5")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        taxonomy_path,
        geo_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        search_default_radius_km,
        search_max_radius_km,
        search_min_results,
        search_adjacent_radius_multiplier,
        search_adjacent_max_radius_km,
        search_tier_timeout_ms,
        search_tier_candidate_limit,
        search_max_page_size,
        search_city_snap_radius_km,
        search_area_snap_radius_km,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BAZAAR_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
