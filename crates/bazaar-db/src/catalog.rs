//! Postgres-backed implementation of the search store traits.

use bazaar_core::{
    Area, City, GeoPoint, GeoStore, StoreError, TaxonomyCatalog, TaxonomyEntry, TaxonomyLevel,
    TaxonomyStore, VendorFilter, VendorRecord, VendorStore,
};
use sqlx::PgPool;

use crate::{geo, taxonomy, vendors, DbError};

/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_err(operation: &'static str) -> impl FnOnce(DbError) -> StoreError {
    move |e| StoreError::new(operation, e)
}

impl VendorStore for PgCatalog {
    async fn find_by_area(
        &self,
        city: &str,
        area: &str,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        vendors::find_vendors_by_area(&self.pool, city, area, filter)
            .await
            .map_err(store_err("find_by_area"))
    }

    async fn find_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        vendors::find_vendors_near(&self.pool, center, radius_km, filter)
            .await
            .map_err(store_err("find_near"))
    }

    async fn find_by_city(
        &self,
        city: &str,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        vendors::find_vendors_by_city(&self.pool, city, filter)
            .await
            .map_err(store_err("find_by_city"))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(store_err("ping"))
    }
}

impl GeoStore for PgCatalog {
    async fn find_city_by_name(&self, name: &str) -> Result<Option<City>, StoreError> {
        geo::find_city_by_name(&self.pool, name)
            .await
            .map_err(store_err("find_city_by_name"))
    }

    async fn find_city_by_id(&self, id: i64) -> Result<Option<City>, StoreError> {
        geo::find_city_by_id(&self.pool, id)
            .await
            .map_err(store_err("find_city_by_id"))
    }

    async fn find_nearest_city(
        &self,
        point: GeoPoint,
        max_km: f64,
    ) -> Result<Option<City>, StoreError> {
        geo::find_nearest_city(&self.pool, point, max_km)
            .await
            .map_err(store_err("find_nearest_city"))
    }

    async fn find_area_by_id(&self, id: i64) -> Result<Option<Area>, StoreError> {
        geo::find_area_by_id(&self.pool, id)
            .await
            .map_err(store_err("find_area_by_id"))
    }

    async fn find_area_by_city_and_name(
        &self,
        city_id: i64,
        name: &str,
    ) -> Result<Option<Area>, StoreError> {
        geo::find_area_by_city_and_name(&self.pool, city_id, name)
            .await
            .map_err(store_err("find_area_by_city_and_name"))
    }

    async fn find_nearest_area(
        &self,
        point: GeoPoint,
        max_km: f64,
    ) -> Result<Option<Area>, StoreError> {
        geo::find_nearest_area(&self.pool, point, max_km)
            .await
            .map_err(store_err("find_nearest_area"))
    }
}

impl TaxonomyStore for PgCatalog {
    async fn load_catalog(&self) -> Result<TaxonomyCatalog, StoreError> {
        let entries = taxonomy::list_active_taxonomy(&self.pool)
            .await
            .map_err(store_err("load_catalog"))?;
        Ok(TaxonomyCatalog::from_entries(entries))
    }

    async fn find_by_keyword_or_name(
        &self,
        level: TaxonomyLevel,
        text: &str,
    ) -> Result<Vec<TaxonomyEntry>, StoreError> {
        taxonomy::find_taxonomy_by_keyword_or_name(&self.pool, level, text)
            .await
            .map_err(store_err("find_by_keyword_or_name"))
    }
}
