//! Geographic primitives: validated points, great-circle distance, and the
//! City/Area records owned by the geo store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid non-alphanumeric regex"));

/// A latitude/longitude pair in decimal degrees.
///
/// Fields are private so every instance has passed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside the valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LatitudeOutOfRange`] or
    /// [`CoreError::LongitudeOutOfRange`] for non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometres, rounded to 2 decimals.
    #[must_use]
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(*self, *other)
    }
}

/// Haversine distance between two points in kilometres, rounded to 2 decimals.
///
/// `d = 2R·asin(√(sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)))`
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Floating error can push h a hair past 1.0 for antipodal points.
    let d = 2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin();
    round2(d)
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lowercase, collapse every run of non-alphanumeric characters into one
/// space, and trim. `"Vijay-Nagar "` and `"vijay nagar"` normalize equally.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let lower = raw.to_lowercase();
    NON_ALNUM.replace_all(&lower, " ").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub state: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Area {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    pub city_id: i64,
    pub city_name: String,
    pub location: GeoPoint,
}

/// Seed-file shape for one city and its areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub areas: Vec<AreaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct GeoFile {
    pub cities: Vec<CityConfig>,
}

/// Load and validate the city/area seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_geo_file(path: &Path) -> Result<GeoFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_geo_yaml(&content)
}

/// Parse and validate geo seed YAML from a string.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_geo_yaml(content: &str) -> Result<GeoFile, ConfigError> {
    let file: GeoFile = serde_yaml::from_str(content)?;
    validate_geo(&file)?;
    Ok(file)
}

fn validate_geo(file: &GeoFile) -> Result<(), ConfigError> {
    let mut seen_cities = HashSet::new();

    for city in &file.cities {
        if city.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "city name must be non-empty".to_string(),
            ));
        }
        GeoPoint::new(city.latitude, city.longitude).map_err(|e| {
            ConfigError::Validation(format!("city '{}' has invalid location: {e}", city.name))
        })?;

        let key = (normalize_name(&city.name), normalize_name(&city.state));
        if !seen_cities.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate city: '{}' ({})",
                city.name, city.state
            )));
        }

        let mut seen_areas = HashSet::new();
        for area in &city.areas {
            let normalized = normalize_name(&area.name);
            if normalized.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "city '{}' has an area with an empty name",
                    city.name
                )));
            }
            GeoPoint::new(area.latitude, area.longitude).map_err(|e| {
                ConfigError::Validation(format!(
                    "area '{}' in '{}' has invalid location: {e}",
                    area.name, city.name
                ))
            })?;
            if !seen_areas.insert(normalized) {
                return Err(ConfigError::Validation(format!(
                    "duplicate area '{}' in city '{}'",
                    area.name, city.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
