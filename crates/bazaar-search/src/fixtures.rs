//! Shared fixtures for unit tests: the repo's geo and taxonomy files plus a
//! terse vendor constructor.

use std::path::PathBuf;

use bazaar_core::{
    load_geo_file, load_taxonomy_file, GeoPoint, PriceRange, TaxonomyCatalog, VendorRecord,
};
use rust_decimal::Decimal;
use serde_json::Map;

use crate::memory::MemoryCatalog;

fn config_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(file)
}

pub(crate) fn taxonomy() -> TaxonomyCatalog {
    let file = load_taxonomy_file(&config_path("taxonomy.yaml")).expect("taxonomy fixture");
    TaxonomyCatalog::from_entries(file.into_entries())
}

/// Geo and taxonomy loaded, no vendors.
pub(crate) fn catalog() -> MemoryCatalog {
    let geo = load_geo_file(&config_path("geo.yaml")).expect("geo fixture");
    MemoryCatalog::new()
        .with_geo_file(&geo)
        .expect("valid geo fixture")
        .with_taxonomy(taxonomy())
}

/// Active vendor priced 10000–50000, rated 4.0 with 10 reviews.
pub(crate) fn vendor(
    id: i64,
    service: &str,
    city: &str,
    area: Option<&str>,
    (lat, lng): (f64, f64),
) -> VendorRecord {
    VendorRecord {
        id,
        name: format!("Vendor {id}"),
        business_name: None,
        service_type: service.to_string(),
        city: city.to_string(),
        area: area.map(ToOwned::to_owned),
        location: GeoPoint::new(lat, lng).expect("valid fixture point"),
        pricing: price(10_000, 50_000),
        rating: 4.0,
        review_count: 10,
        verified: false,
        is_active: true,
        attributes: Map::new(),
    }
}

pub(crate) fn price(min: i64, max: i64) -> PriceRange {
    PriceRange {
        min: Decimal::from(min),
        max: Decimal::from(max),
    }
}

pub(crate) const VIJAY_NAGAR: (f64, f64) = (22.7533, 75.8937);
pub(crate) const PALASIA: (f64, f64) = (22.7244, 75.8839);
pub(crate) const RAU: (f64, f64) = (22.6355, 75.8110);
pub(crate) const DEWAS_AB_ROAD: (f64, f64) = (22.9587, 76.0450);
