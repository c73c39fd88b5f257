//! Read queries for the `vendors` table.
//!
//! Every query binds the shared [`VendorFilter`] as `$1`..`$13`; location
//! parameters start at `$14`. Distances are compared and ordered on the
//! value rounded to 2 decimals, the same figure the ranker computes.

use bazaar_core::{normalize_name, GeoPoint, PriceRange, VendorFilter, VendorRecord};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use crate::DbError;

/// Slightly under the true 111.19 km per degree so the prefilter box never
/// clips the search circle.
const KM_PER_DEGREE: f64 = 111.0;

/// Great-circle distance from the filter origin (`$11`, `$12`) to the
/// vendor, in kilometres rounded to 2 decimals. NULL without an origin.
macro_rules! distance_km {
    () => {
        "round(CAST(6371.0 * 2 * asin(LEAST(1.0, sqrt(\
            power(sin(radians(v.latitude - $11::FLOAT8) / 2), 2) \
            + cos(radians($11::FLOAT8)) * cos(radians(v.latitude)) \
              * power(sin(radians(v.longitude - $12::FLOAT8) / 2), 2)))) AS NUMERIC), 2)"
    };
}

/// Columns and the active/approved + filter predicates shared by every read.
macro_rules! vendor_select {
    ($location:literal) => {
        concat!(
            "SELECT v.id, v.name, v.business_name, v.service_type, v.city, v.area, \
                    v.latitude, v.longitude, v.price_min, v.price_max, v.rating, \
                    v.review_count, v.verified, v.is_active, v.attributes \
             FROM vendors v \
              WHERE v.is_active = TRUE \
                AND v.approval_status = 'approved' \
                AND (($1::TEXT[] IS NULL AND $2::TEXT IS NULL) \
                     OR v.service_type = ANY($1::TEXT[]) \
                     OR ($2::TEXT IS NOT NULL \
                         AND (strpos(lower(v.name), $2) > 0 \
                              OR strpos(lower(COALESCE(v.business_name, '')), $2) > 0))) \
                AND ($3::NUMERIC IS NULL OR v.price_min <= $3) \
                AND ($4::NUMERIC IS NULL OR v.price_max >= $4) \
                AND ($5::FLOAT8 IS NULL OR v.rating >= $5) \
                AND (NOT $6::BOOLEAN OR v.verified) \
                AND ($7::TEXT IS NULL OR lower(v.city) <> lower($7)) \
                AND NOT (v.id = ANY($8::BIGINT[])) \
                AND ($13::FLOAT8 IS NULL OR $11::FLOAT8 IS NULL \
                     OR ",
            distance_km!(),
            " > CAST($13::FLOAT8 AS NUMERIC)) \
                AND ",
            $location
        )
    };
}

/// Order by the filter's candidate order (`$10`), then cap at `$9` rows.
macro_rules! order_and_limit {
    () => {
        concat!(
            " ORDER BY CASE WHEN $10::TEXT = 'distance' THEN ",
            distance_km!(),
            " END ASC, \
               CASE WHEN $10::TEXT = 'price_low' THEN v.price_min END ASC, \
               CASE WHEN $10::TEXT = 'price_high' THEN v.price_max END DESC, \
               CASE WHEN $10::TEXT = 'rating' THEN v.rating END DESC, \
               CASE WHEN $10::TEXT = 'rating' THEN v.review_count END DESC, \
               v.id \
             LIMIT $9"
        )
    };
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorRow {
    pub id: i64,
    pub name: String,
    pub business_name: Option<String>,
    pub service_type: String,
    pub city: String,
    pub area: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub rating: f64,
    pub review_count: i32,
    pub verified: bool,
    pub is_active: bool,
    pub attributes: Value,
}

impl TryFrom<VendorRow> for VendorRecord {
    type Error = DbError;

    fn try_from(row: VendorRow) -> Result<Self, Self::Error> {
        let location = GeoPoint::new(row.latitude, row.longitude)
            .map_err(|e| DbError::InvalidRow(format!("vendor {}: {e}", row.id)))?;
        let Value::Object(attributes) = row.attributes else {
            return Err(DbError::InvalidRow(format!(
                "vendor {}: attributes must be a JSON object",
                row.id
            )));
        };
        Ok(VendorRecord {
            id: row.id,
            name: row.name,
            business_name: row.business_name,
            service_type: row.service_type,
            city: row.city,
            area: row.area,
            location,
            pricing: PriceRange {
                min: row.price_min,
                max: row.price_max,
            },
            rating: row.rating,
            review_count: row.review_count,
            verified: row.verified,
            is_active: row.is_active,
            attributes,
        })
    }
}

type VendorQuery<'q> = QueryAs<'q, Postgres, VendorRow, PgArguments>;

/// Bind `$1`..`$13` from `filter`.
fn bind_filter<'q>(query: VendorQuery<'q>, filter: &'q VendorFilter) -> VendorQuery<'q> {
    query
        .bind(filter.service_ids.as_deref())
        .bind(filter.text.as_deref().map(|t| t.trim().to_lowercase()))
        .bind(filter.budget.max())
        .bind(filter.budget.min())
        .bind(filter.min_rating)
        .bind(filter.verified_only)
        .bind(filter.exclude_city.as_deref())
        .bind(filter.exclude_ids.as_slice())
        .bind(filter.limit)
        .bind(filter.order.as_str())
        .bind(filter.origin.map(|o| o.latitude()))
        .bind(filter.origin.map(|o| o.longitude()))
        .bind(filter.outside_km)
}

fn into_records(rows: Vec<VendorRow>) -> Result<Vec<VendorRecord>, DbError> {
    rows.into_iter().map(VendorRecord::try_from).collect()
}

/// Vendors in `city` whose normalized `area` equals `area` normalized.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidRow`]
/// if a row cannot be converted.
pub async fn find_vendors_by_area(
    pool: &PgPool,
    city: &str,
    area: &str,
    filter: &VendorFilter,
) -> Result<Vec<VendorRecord>, DbError> {
    let sql = concat!(
        vendor_select!(
            "lower(v.city) = lower($14) \
             AND btrim(regexp_replace(lower(COALESCE(v.area, '')), '[^a-z0-9]+', ' ', 'g')) = $15"
        ),
        order_and_limit!()
    );
    let rows = bind_filter(sqlx::query_as::<_, VendorRow>(sql), filter)
        .bind(city.trim())
        .bind(normalize_name(area))
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

/// Vendors within `radius_km` of `center`, with `center` as the origin for
/// ordering and any `outside_km` bound.
///
/// A latitude/longitude bounding box narrows candidates before the exact
/// distance check.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidRow`]
/// if a row cannot be converted.
pub async fn find_vendors_near(
    pool: &PgPool,
    center: GeoPoint,
    radius_km: f64,
    filter: &VendorFilter,
) -> Result<Vec<VendorRecord>, DbError> {
    let sql = concat!(
        vendor_select!(
            "v.latitude BETWEEN $15 AND $16 \
             AND v.longitude BETWEEN $17 AND $18 \
             AND "
        ),
        distance_km!(),
        " <= CAST($14::FLOAT8 AS NUMERIC)",
        order_and_limit!()
    );
    let filter = VendorFilter {
        origin: Some(center),
        ..filter.clone()
    };
    let bbox = BoundingBox::around(center, radius_km);
    let rows = bind_filter(sqlx::query_as::<_, VendorRow>(sql), &filter)
        .bind(radius_km)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

/// Vendors in `city` (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidRow`]
/// if a row cannot be converted.
pub async fn find_vendors_by_city(
    pool: &PgPool,
    city: &str,
    filter: &VendorFilter,
) -> Result<Vec<VendorRecord>, DbError> {
    let sql = concat!(
        vendor_select!("lower(v.city) = lower($14)"),
        order_and_limit!()
    );
    let rows = bind_filter(sqlx::query_as::<_, VendorRow>(sql), filter)
        .bind(city.trim())
        .fetch_all(pool)
        .await?;
    into_records(rows)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box guaranteed to contain every point within `radius_km` of `center`.
    /// Longitude spans the full range when the box would cross a pole or
    /// the antimeridian.
    pub(crate) fn around(center: GeoPoint, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let min_lat = (center.latitude() - lat_delta).max(-90.0);
        let max_lat = (center.latitude() + lat_delta).min(90.0);

        // Widest longitude span is needed at the latitude furthest from the equator.
        let cos_lat = min_lat.abs().max(max_lat.abs()).to_radians().cos();
        let lng_delta = if cos_lat < 1e-6 {
            f64::INFINITY
        } else {
            radius_km / (KM_PER_DEGREE * cos_lat)
        };
        let (min_lng, max_lng) = (center.longitude() - lng_delta, center.longitude() + lng_delta);
        if min_lng < -180.0 || max_lng > 180.0 {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }
}
