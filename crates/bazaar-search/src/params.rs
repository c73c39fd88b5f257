//! Request shapes and their validation into immutable [`SearchParams`].

use bazaar_core::{BudgetRange, GeoPoint};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{RankFilters, SearchConfig, SearchError};

const MAX_RATING: f64 = 5.0;

/// Location input as supplied by the caller; any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocationSpec {
    pub city: Option<String>,
    pub area: Option<String>,
    pub area_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
}

impl LocationSpec {
    /// Validated coordinates, when both were supplied.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] if only one half is present or a
    /// value is out of range.
    pub fn coordinates(&self) -> Result<Option<GeoPoint>, SearchError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng)
                .map(Some)
                .map_err(|e| SearchError::Validation(e.to_string())),
            (None, None) => Ok(None),
            _ => Err(SearchError::Validation(
                "latitude and longitude must be supplied together".to_string(),
            )),
        }
    }

    fn has_any_anchor(&self) -> bool {
        self.latitude.is_some() || self.area_id.is_some() || self.city.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BudgetSpec {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Tier default: distance for the nearby tier, rating elsewhere.
    #[default]
    Relevance,
    Rating,
    #[serde(alias = "price_low")]
    PriceLow,
    #[serde(alias = "price_high")]
    PriceHigh,
    Distance,
}

/// Raw search request as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub service_id: Option<String>,
    #[serde(default)]
    pub location: LocationSpec,
    #[serde(default)]
    pub budget: BudgetSpec,
    pub verified: Option<bool>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub sort: SortMode,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Validated, immutable search input.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: Option<String>,
    pub service_id: Option<String>,
    pub location: LocationSpec,
    pub radius_km: f64,
    pub filters: RankFilters,
    pub sort: SortMode,
    pub page: u32,
    pub limit: u32,
}

impl SearchParams {
    /// Validate a raw request. Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] for malformed fields and
    /// [`SearchError::LocationRequired`] when no location anchor is present.
    pub fn from_request(
        request: SearchRequest,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        let location = LocationSpec {
            city: clean(request.location.city),
            area: clean(request.location.area),
            ..request.location
        };
        location.coordinates()?;
        if !location.has_any_anchor() {
            return Err(SearchError::LocationRequired);
        }

        let radius_km = match location.radius_km {
            None => config.default_radius_km,
            Some(r) if r.is_finite() && r > 0.0 && r <= config.max_radius_km => r,
            Some(r) => {
                return Err(SearchError::Validation(format!(
                    "radius_km must be in (0, {}], got {r}",
                    config.max_radius_km
                )))
            }
        };

        let budget = BudgetRange::new(request.budget.min, request.budget.max)
            .map_err(|e| SearchError::Validation(e.to_string()))?;

        if let Some(rating) = request.rating {
            if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
                return Err(SearchError::Validation(format!(
                    "rating must be between 0 and {MAX_RATING}, got {rating}"
                )));
            }
        }

        let page = request.page.unwrap_or(1);
        if page == 0 {
            return Err(SearchError::Validation("page must be >= 1".to_string()));
        }
        let limit = request.limit.unwrap_or(config.default_page_size);
        if limit == 0 || limit > config.max_page_size {
            return Err(SearchError::Validation(format!(
                "limit must be between 1 and {}, got {limit}",
                config.max_page_size
            )));
        }

        Ok(Self {
            query: clean(request.query),
            service_id: clean(request.service_id),
            location,
            radius_km,
            filters: RankFilters {
                budget,
                min_rating: request.rating,
                verified_only: request.verified.unwrap_or(false),
            },
            sort: request.sort,
            page,
            limit,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
