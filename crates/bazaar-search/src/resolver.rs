//! Turns a caller's location input into a concrete search anchor.

use bazaar_core::{Area, City, GeoPoint, GeoStore};
use serde::Serialize;

use crate::{Degradation, LocationSpec, SearchError};

/// Which branch of resolution produced the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    DirectCoordinates,
    AreaId,
    CityAreaName,
    CityOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: GeoPoint,
    pub area: Option<Area>,
    pub city: Option<City>,
    pub source: LocationSource,
    pub degradations: Vec<Degradation>,
}

impl ResolvedLocation {
    /// City name from the resolved city, else from the resolved area.
    #[must_use]
    pub fn city_name(&self) -> Option<&str> {
        self.city
            .as_ref()
            .map(|c| c.name.as_str())
            .or_else(|| self.area.as_ref().map(|a| a.city_name.as_str()))
    }

    #[must_use]
    pub fn area_name(&self) -> Option<&str> {
        self.area.as_ref().map(|a| a.name.as_str())
    }
}

pub struct LocationResolver<'a, G> {
    geo: &'a G,
    city_snap_km: f64,
    area_snap_km: f64,
}

impl<'a, G: GeoStore> LocationResolver<'a, G> {
    /// `city_snap_km` and `area_snap_km` bound how far a raw coordinate may
    /// be from the city and the area it gets attached to.
    pub fn new(geo: &'a G, city_snap_km: f64, area_snap_km: f64) -> Self {
        Self {
            geo,
            city_snap_km,
            area_snap_km,
        }
    }

    /// Resolve `spec`, trying coordinates, area id, city plus area, then city.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Validation`] for malformed coordinates.
    /// - [`SearchError::AreaNotFound`] for an unknown area id.
    /// - [`SearchError::CityNotFound`] for an unknown city name.
    /// - [`SearchError::LocationRequired`] when nothing usable was supplied.
    /// - [`SearchError::Store`] if a geo read fails.
    pub async fn resolve(&self, spec: &LocationSpec) -> Result<ResolvedLocation, SearchError> {
        if let Some(point) = spec.coordinates()? {
            return self.snap(point).await;
        }

        if let Some(area_id) = spec.area_id {
            let area = self
                .geo
                .find_area_by_id(area_id)
                .await?
                .ok_or(SearchError::AreaNotFound { area_id })?;
            let city = self.geo.find_city_by_id(area.city_id).await?;
            return Ok(ResolvedLocation {
                coordinates: area.location,
                area: Some(area),
                city,
                source: LocationSource::AreaId,
                degradations: Vec::new(),
            });
        }

        let Some(city_name) = spec.city.as_deref() else {
            return Err(SearchError::LocationRequired);
        };
        let city = self
            .geo
            .find_city_by_name(city_name)
            .await?
            .ok_or_else(|| SearchError::CityNotFound {
                city: city_name.to_string(),
            })?;

        let Some(area_name) = spec.area.as_deref() else {
            return Ok(city_only(city, Vec::new()));
        };

        match self.geo.find_area_by_city_and_name(city.id, area_name).await? {
            Some(area) => Ok(ResolvedLocation {
                coordinates: area.location,
                area: Some(area),
                city: Some(city),
                source: LocationSource::CityAreaName,
                degradations: Vec::new(),
            }),
            None => {
                tracing::debug!(area = area_name, city = %city.name, "area not found; using city centroid");
                let note = Degradation::AreaNotFound {
                    area: area_name.to_string(),
                    city: city.name.clone(),
                };
                Ok(city_only(city, vec![note]))
            }
        }
    }

    /// Attach the nearest area and city to raw coordinates. Misses are fine.
    async fn snap(&self, point: GeoPoint) -> Result<ResolvedLocation, SearchError> {
        let area = self
            .geo
            .find_nearest_area(point, self.area_snap_km)
            .await?;
        let city = match &area {
            Some(area) => self.geo.find_city_by_id(area.city_id).await?,
            None => {
                self.geo
                    .find_nearest_city(point, self.city_snap_km)
                    .await?
            }
        };
        Ok(ResolvedLocation {
            coordinates: point,
            area,
            city,
            source: LocationSource::DirectCoordinates,
            degradations: Vec::new(),
        })
    }
}

fn city_only(city: City, degradations: Vec<Degradation>) -> ResolvedLocation {
    ResolvedLocation {
        coordinates: city.location,
        area: None,
        city: Some(city),
        source: LocationSource::CityOnly,
        degradations,
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
