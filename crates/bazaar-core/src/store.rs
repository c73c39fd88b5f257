//! Read contracts for the collaborator stores the search engine depends on.
//!
//! `bazaar-db` implements these over Postgres; `bazaar-search::memory`
//! implements them over in-process vectors for tests and fixtures.

use std::cmp::Ordering;
use std::future::Future;

use crate::{
    Area, BudgetRange, City, GeoPoint, StoreError, TaxonomyCatalog, TaxonomyEntry, TaxonomyLevel,
    VendorRecord,
};

/// Row order a read applies before its `limit`, so a capped read keeps the
/// vendors that would rank first rather than the lowest ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CandidateOrder {
    /// Highest rating first, then most reviews.
    #[default]
    Rating,
    PriceLow,
    PriceHigh,
    /// Nearest to the filter origin first.
    Distance,
}

impl CandidateOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateOrder::Rating => "rating",
            CandidateOrder::PriceLow => "price_low",
            CandidateOrder::PriceHigh => "price_high",
            CandidateOrder::Distance => "distance",
        }
    }

    /// Total order over vendors; ties fall back to ascending id. Distance
    /// compares the rounded kilometres from `origin` and is a no-op without one.
    #[must_use]
    pub fn compare(self, a: &VendorRecord, b: &VendorRecord, origin: Option<GeoPoint>) -> Ordering {
        let primary = match self {
            CandidateOrder::Rating => b
                .rating
                .total_cmp(&a.rating)
                .then_with(|| b.review_count.cmp(&a.review_count)),
            CandidateOrder::PriceLow => a.pricing.min.cmp(&b.pricing.min),
            CandidateOrder::PriceHigh => b.pricing.max.cmp(&a.pricing.max),
            CandidateOrder::Distance => origin.map_or(Ordering::Equal, |o| {
                o.distance_km(&a.location)
                    .total_cmp(&o.distance_km(&b.location))
            }),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Predicates ANDed onto every vendor read. Location constraints are passed
/// separately by each query method.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorFilter {
    /// Restrict to these service ids. `None` means any service.
    pub service_ids: Option<Vec<String>>,
    /// Vendor/business-name substring, OR-ed with `service_ids` when both are set.
    pub text: Option<String>,
    pub budget: BudgetRange,
    pub min_rating: Option<f64>,
    pub verified_only: bool,
    /// Skip vendors in this city (case-insensitive).
    pub exclude_city: Option<String>,
    /// Skip vendors with these ids.
    pub exclude_ids: Vec<i64>,
    /// Reference point for `outside_km` and distance ordering.
    pub origin: Option<GeoPoint>,
    /// Keep only vendors strictly farther than this from `origin`, compared
    /// on the rounded distance.
    pub outside_km: Option<f64>,
    pub order: CandidateOrder,
    /// Maximum rows a single read may return, taken in `order`.
    pub limit: i64,
}

impl VendorFilter {
    /// Filter that admits every active vendor, capped at `limit` rows.
    #[must_use]
    pub fn any(limit: i64) -> Self {
        Self {
            service_ids: None,
            text: None,
            budget: BudgetRange::unbounded(),
            min_rating: None,
            verified_only: false,
            exclude_city: None,
            exclude_ids: Vec::new(),
            origin: None,
            outside_km: None,
            order: CandidateOrder::default(),
            limit,
        }
    }

    /// Evaluate every non-location predicate against `vendor`.
    #[must_use]
    pub fn matches(&self, vendor: &VendorRecord) -> bool {
        if !vendor.is_active {
            return false;
        }

        let service_ok = match (&self.service_ids, &self.text) {
            (None, None) => true,
            (Some(ids), None) => ids.iter().any(|id| *id == vendor.service_type),
            (None, Some(text)) => vendor.name_contains(text),
            (Some(ids), Some(text)) => {
                ids.iter().any(|id| *id == vendor.service_type) || vendor.name_contains(text)
            }
        };

        service_ok
            && self.budget.admits(&vendor.pricing)
            && self.min_rating.is_none_or(|min| vendor.rating >= min)
            && (!self.verified_only || vendor.verified)
            && self
                .exclude_city
                .as_deref()
                .is_none_or(|city| !vendor.city.eq_ignore_ascii_case(city))
            && !self.exclude_ids.contains(&vendor.id)
            && self.is_outside(vendor)
    }

    fn is_outside(&self, vendor: &VendorRecord) -> bool {
        match (self.origin, self.outside_km) {
            (Some(origin), Some(km)) => origin.distance_km(&vendor.location) > km,
            _ => true,
        }
    }

    /// Sort `rows` by `order` and drop everything past `limit`.
    pub fn order_and_truncate(&self, rows: &mut Vec<VendorRecord>, origin: Option<GeoPoint>) {
        rows.sort_by(|a, b| self.order.compare(a, b, origin));
        rows.truncate(usize::try_from(self.limit).unwrap_or(0));
    }

    #[must_use]
    pub fn with_budget(&self, budget: BudgetRange) -> Self {
        Self {
            budget,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn ordered(&self, order: CandidateOrder) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    /// Restrict to vendors beyond `km` of `origin`.
    #[must_use]
    pub fn outside(&self, origin: GeoPoint, km: f64) -> Self {
        Self {
            origin: Some(origin),
            outside_km: Some(km),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn excluding_ids(&self, ids: impl IntoIterator<Item = i64>) -> Self {
        let mut exclude_ids: Vec<i64> = ids.into_iter().collect();
        exclude_ids.sort_unstable();
        Self {
            exclude_ids,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn excluding_city(&self, city: Option<&str>) -> Self {
        Self {
            exclude_city: city.map(ToOwned::to_owned),
            ..self.clone()
        }
    }
}

/// Read access to the vendor catalog. Only active, approved vendors are visible.
pub trait VendorStore: Send + Sync {
    /// Vendors whose city equals `city` (case-insensitive) and whose area
    /// normalizes to the same string as `area`.
    fn find_by_area(
        &self,
        city: &str,
        area: &str,
        filter: &VendorFilter,
    ) -> impl Future<Output = Result<Vec<VendorRecord>, StoreError>> + Send;

    /// Vendors within `radius_km` of `center`. `center` also serves as the
    /// origin for distance ordering.
    fn find_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filter: &VendorFilter,
    ) -> impl Future<Output = Result<Vec<VendorRecord>, StoreError>> + Send;

    /// Vendors in `city` (case-insensitive).
    fn find_by_city(
        &self,
        city: &str,
        filter: &VendorFilter,
    ) -> impl Future<Output = Result<Vec<VendorRecord>, StoreError>> + Send;

    /// Verify the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Read access to cities and areas.
pub trait GeoStore: Send + Sync {
    /// Case-insensitive exact match on the city name.
    fn find_city_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<City>, StoreError>> + Send;

    fn find_city_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<City>, StoreError>> + Send;

    /// Closest city centroid within `max_km` of `point`.
    fn find_nearest_city(
        &self,
        point: GeoPoint,
        max_km: f64,
    ) -> impl Future<Output = Result<Option<City>, StoreError>> + Send;

    fn find_area_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Area>, StoreError>> + Send;

    /// Area in `city_id` whose normalized name equals `name` normalized; failing
    /// that, the shortest area name containing it (or contained by it).
    fn find_area_by_city_and_name(
        &self,
        city_id: i64,
        name: &str,
    ) -> impl Future<Output = Result<Option<Area>, StoreError>> + Send;

    /// Closest area centroid within `max_km` of `point`.
    fn find_nearest_area(
        &self,
        point: GeoPoint,
        max_km: f64,
    ) -> impl Future<Output = Result<Option<Area>, StoreError>> + Send;
}

/// Read access to the service taxonomy.
pub trait TaxonomyStore: Send + Sync {
    /// Snapshot of every active entry.
    fn load_catalog(&self) -> impl Future<Output = Result<TaxonomyCatalog, StoreError>> + Send;

    /// Active entries of `level` whose name or keywords overlap `text`.
    fn find_by_keyword_or_name(
        &self,
        level: TaxonomyLevel,
        text: &str,
    ) -> impl Future<Output = Result<Vec<TaxonomyEntry>, StoreError>> + Send;
}

/// Everything the search service reads from.
pub trait Catalog: VendorStore + GeoStore + TaxonomyStore + Clone + 'static {}

impl<T> Catalog for T where T: VendorStore + GeoStore + TaxonomyStore + Clone + 'static {}
