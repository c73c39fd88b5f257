//! In-process implementation of the store traits.
//!
//! Backs the test suites and local fixtures. Individual operations can be
//! delayed or made to fail so timeout and degradation paths are exercisable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{
    normalize_name, Area, City, GeoFile, GeoPoint, GeoStore, StoreError, TaxonomyCatalog,
    TaxonomyEntry, TaxonomyLevel, TaxonomyStore, VendorFilter, VendorRecord, VendorStore,
};

/// Store operations that can be delayed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindByArea,
    FindNear,
    FindByCity,
    FindCityByName,
    FindCityById,
    FindNearestCity,
    FindAreaById,
    FindAreaByCityAndName,
    FindNearestArea,
    LoadCatalog,
    FindTaxonomy,
    Ping,
}

impl StoreOp {
    fn name(self) -> &'static str {
        match self {
            StoreOp::FindByArea => "find_by_area",
            StoreOp::FindNear => "find_near",
            StoreOp::FindByCity => "find_by_city",
            StoreOp::FindCityByName => "find_city_by_name",
            StoreOp::FindCityById => "find_city_by_id",
            StoreOp::FindNearestCity => "find_nearest_city",
            StoreOp::FindAreaById => "find_area_by_id",
            StoreOp::FindAreaByCityAndName => "find_area_by_city_and_name",
            StoreOp::FindNearestArea => "find_nearest_area",
            StoreOp::LoadCatalog => "load_catalog",
            StoreOp::FindTaxonomy => "find_by_keyword_or_name",
            StoreOp::Ping => "ping",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Data {
    cities: Vec<City>,
    areas: Vec<Area>,
    vendors: Vec<VendorRecord>,
    taxonomy: TaxonomyCatalog,
    delays: HashMap<StoreOp, Duration>,
    failures: HashSet<StoreOp>,
}

/// Cheaply cloneable in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    data: Arc<Data>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load cities and areas from a parsed geo file, numbering ids from 1 in
    /// file order.
    ///
    /// # Errors
    ///
    /// Returns [`bazaar_core::CoreError`] if a coordinate is out of range.
    pub fn with_geo_file(mut self, file: &GeoFile) -> Result<Self, bazaar_core::CoreError> {
        let data = Arc::make_mut(&mut self.data);
        for city_config in &file.cities {
            let city_id = next_id(data.cities.iter().map(|c| c.id));
            let city = City {
                id: city_id,
                name: city_config.name.clone(),
                state: city_config.state.clone(),
                location: GeoPoint::new(city_config.latitude, city_config.longitude)?,
            };
            for area_config in &city_config.areas {
                data.areas.push(Area {
                    id: next_id(data.areas.iter().map(|a| a.id)),
                    name: area_config.name.clone(),
                    normalized_name: normalize_name(&area_config.name),
                    city_id,
                    city_name: city.name.clone(),
                    location: GeoPoint::new(area_config.latitude, area_config.longitude)?,
                });
            }
            data.cities.push(city);
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_city(mut self, city: City) -> Self {
        Arc::make_mut(&mut self.data).cities.push(city);
        self
    }

    #[must_use]
    pub fn with_area(mut self, area: Area) -> Self {
        Arc::make_mut(&mut self.data).areas.push(area);
        self
    }

    #[must_use]
    pub fn with_taxonomy(mut self, taxonomy: TaxonomyCatalog) -> Self {
        Arc::make_mut(&mut self.data).taxonomy = taxonomy;
        self
    }

    #[must_use]
    pub fn with_vendor(mut self, vendor: VendorRecord) -> Self {
        Arc::make_mut(&mut self.data).vendors.push(vendor);
        self
    }

    #[must_use]
    pub fn with_vendors(mut self, vendors: impl IntoIterator<Item = VendorRecord>) -> Self {
        Arc::make_mut(&mut self.data).vendors.extend(vendors);
        self
    }

    /// Sleep for `delay` before serving `op`.
    #[must_use]
    pub fn with_delay(mut self, op: StoreOp, delay: Duration) -> Self {
        Arc::make_mut(&mut self.data).delays.insert(op, delay);
        self
    }

    /// Fail every call to `op`.
    #[must_use]
    pub fn with_failure(mut self, op: StoreOp) -> Self {
        Arc::make_mut(&mut self.data).failures.insert(op);
        self
    }

    #[must_use]
    pub fn cities(&self) -> &[City] {
        &self.data.cities
    }

    #[must_use]
    pub fn areas(&self) -> &[Area] {
        &self.data.areas
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        if let Some(delay) = self.data.delays.get(&op) {
            tokio::time::sleep(*delay).await;
        }
        if self.data.failures.contains(&op) {
            return Err(StoreError::new(op.name(), "injected failure"));
        }
        Ok(())
    }

    fn select<'a>(
        &'a self,
        filter: &'a VendorFilter,
        location: impl Fn(&VendorRecord) -> bool + 'a,
    ) -> impl Iterator<Item = &'a VendorRecord> + 'a {
        self.data
            .vendors
            .iter()
            .filter(move |v| filter.matches(v) && location(v))
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

impl VendorStore for MemoryCatalog {
    async fn find_by_area(
        &self,
        city: &str,
        area: &str,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        self.enter(StoreOp::FindByArea).await?;
        let wanted = normalize_name(area);
        let mut rows: Vec<VendorRecord> = self
            .select(filter, |v| {
                v.city.eq_ignore_ascii_case(city)
                    && v.area.as_deref().is_some_and(|a| normalize_name(a) == wanted)
            })
            .cloned()
            .collect();
        filter.order_and_truncate(&mut rows, filter.origin);
        Ok(rows)
    }

    async fn find_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        self.enter(StoreOp::FindNear).await?;
        let filter = VendorFilter {
            origin: Some(center),
            ..filter.clone()
        };
        let mut rows: Vec<VendorRecord> = self
            .select(&filter, |v| center.distance_km(&v.location) <= radius_km)
            .cloned()
            .collect();
        filter.order_and_truncate(&mut rows, filter.origin);
        Ok(rows)
    }

    async fn find_by_city(
        &self,
        city: &str,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        self.enter(StoreOp::FindByCity).await?;
        let mut rows: Vec<VendorRecord> = self
            .select(filter, |v| v.city.eq_ignore_ascii_case(city))
            .cloned()
            .collect();
        filter.order_and_truncate(&mut rows, filter.origin);
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter(StoreOp::Ping).await
    }
}

impl GeoStore for MemoryCatalog {
    async fn find_city_by_name(&self, name: &str) -> Result<Option<City>, StoreError> {
        self.enter(StoreOp::FindCityByName).await?;
        let name = name.trim();
        Ok(self
            .data
            .cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn find_city_by_id(&self, id: i64) -> Result<Option<City>, StoreError> {
        self.enter(StoreOp::FindCityById).await?;
        Ok(self.data.cities.iter().find(|c| c.id == id).cloned())
    }

    async fn find_nearest_city(
        &self,
        point: GeoPoint,
        max_km: f64,
    ) -> Result<Option<City>, StoreError> {
        self.enter(StoreOp::FindNearestCity).await?;
        Ok(nearest(&self.data.cities, point, max_km, |c| c.location, |c| c.id).cloned())
    }

    async fn find_area_by_id(&self, id: i64) -> Result<Option<Area>, StoreError> {
        self.enter(StoreOp::FindAreaById).await?;
        Ok(self.data.areas.iter().find(|a| a.id == id).cloned())
    }

    async fn find_area_by_city_and_name(
        &self,
        city_id: i64,
        name: &str,
    ) -> Result<Option<Area>, StoreError> {
        self.enter(StoreOp::FindAreaByCityAndName).await?;
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return Ok(None);
        }
        let in_city = || self.data.areas.iter().filter(|a| a.city_id == city_id);
        if let Some(exact) = in_city().find(|a| a.normalized_name == wanted) {
            return Ok(Some(exact.clone()));
        }
        Ok(in_city()
            .filter(|a| a.normalized_name.contains(&wanted) || wanted.contains(&a.normalized_name))
            .min_by(|a, b| a.name.len().cmp(&b.name.len()).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_nearest_area(
        &self,
        point: GeoPoint,
        max_km: f64,
    ) -> Result<Option<Area>, StoreError> {
        self.enter(StoreOp::FindNearestArea).await?;
        Ok(nearest(&self.data.areas, point, max_km, |a| a.location, |a| a.id).cloned())
    }
}

fn nearest<T>(
    items: &[T],
    point: GeoPoint,
    max_km: f64,
    location: impl Fn(&T) -> GeoPoint,
    id: impl Fn(&T) -> i64,
) -> Option<&T> {
    items
        .iter()
        .map(|item| (point.distance_km(&location(item)), item))
        .filter(|(d, _)| *d <= max_km)
        .min_by(|a, b| a.0.total_cmp(&b.0).then(id(a.1).cmp(&id(b.1))))
        .map(|(_, item)| item)
}

impl TaxonomyStore for MemoryCatalog {
    async fn load_catalog(&self) -> Result<TaxonomyCatalog, StoreError> {
        self.enter(StoreOp::LoadCatalog).await?;
        Ok(self.data.taxonomy.clone())
    }

    async fn find_by_keyword_or_name(
        &self,
        level: TaxonomyLevel,
        text: &str,
    ) -> Result<Vec<TaxonomyEntry>, StoreError> {
        self.enter(StoreOp::FindTaxonomy).await?;
        Ok(self
            .data
            .taxonomy
            .find_by_keyword_or_name(level, text)
            .into_iter()
            .cloned()
            .collect())
    }
}
