//! Shared domain types, configuration, and store contracts for the vendor
//! search workspace.

pub mod app_config;
pub mod config;
pub mod error;
pub mod geo;
pub mod store;
pub mod taxonomy;
pub mod vendor;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError, StoreError};
pub use geo::{
    haversine_km, load_geo_file, normalize_name, round2, Area, AreaConfig, City, CityConfig,
    GeoFile, GeoPoint, EARTH_RADIUS_KM,
};
pub use store::{
    CandidateOrder, Catalog, GeoStore, TaxonomyStore, VendorFilter, VendorStore,
};
pub use taxonomy::{
    load_taxonomy_file, TaxonomyCatalog, TaxonomyEntry, TaxonomyFile, TaxonomyLevel,
};
pub use vendor::{BudgetRange, PriceRange, VendorRecord};
