//! Postgres persistence for the vendor search engine.
//!
//! [`PgCatalog`] is the entry point for the search service; the free
//! functions underneath it are exported for the CLI and for tests.

use thiserror::Error;

pub mod catalog;
pub mod geo;
pub mod pool;
pub mod seed;
pub mod taxonomy;
pub mod vendors;

pub use catalog::PgCatalog;
pub use geo::{
    find_area_by_city_and_name, find_area_by_id, find_city_by_id, find_city_by_name,
    find_nearest_area, find_nearest_city, AreaRow, CityRow,
};
pub use pool::{connect_pool, health_check, run_migrations, PoolConfig};
pub use seed::{seed_geo, seed_taxonomy, GeoSeedSummary};
pub use taxonomy::{find_taxonomy_by_keyword_or_name, list_active_taxonomy, TaxonomyRow};
pub use vendors::{find_vendors_by_area, find_vendors_by_city, find_vendors_near, VendorRow};

#[derive(Debug, Error)]
pub enum DbError {
    /// A row violated an invariant the schema cannot express.
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}
