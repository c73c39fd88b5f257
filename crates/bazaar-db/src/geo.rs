//! Read operations for the `cities` and `areas` tables.

use bazaar_core::{normalize_name, Area, City, GeoPoint};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CityRow {
    pub id: i64,
    pub name: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<CityRow> for City {
    type Error = DbError;

    fn try_from(row: CityRow) -> Result<Self, Self::Error> {
        let location = GeoPoint::new(row.latitude, row.longitude)
            .map_err(|e| DbError::InvalidRow(format!("city {}: {e}", row.id)))?;
        Ok(City {
            id: row.id,
            name: row.name,
            state: row.state,
            location,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AreaRow {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    pub city_id: i64,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<AreaRow> for Area {
    type Error = DbError;

    fn try_from(row: AreaRow) -> Result<Self, Self::Error> {
        let location = GeoPoint::new(row.latitude, row.longitude)
            .map_err(|e| DbError::InvalidRow(format!("area {}: {e}", row.id)))?;
        Ok(Area {
            id: row.id,
            name: row.name,
            normalized_name: row.normalized_name,
            city_id: row.city_id,
            city_name: row.city_name,
            location,
        })
    }
}

fn to_city(row: Option<CityRow>) -> Result<Option<City>, DbError> {
    row.map(City::try_from).transpose()
}

fn to_area(row: Option<AreaRow>) -> Result<Option<Area>, DbError> {
    row.map(Area::try_from).transpose()
}

/// Case-insensitive exact match on the city name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_city_by_name(pool: &PgPool, name: &str) -> Result<Option<City>, DbError> {
    let row = sqlx::query_as::<_, CityRow>(
        "SELECT id, name, state, latitude, longitude \
         FROM cities \
         WHERE lower(name) = lower(btrim($1)) \
         ORDER BY id \
         LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    to_city(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_city_by_id(pool: &PgPool, id: i64) -> Result<Option<City>, DbError> {
    let row = sqlx::query_as::<_, CityRow>(
        "SELECT id, name, state, latitude, longitude FROM cities WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    to_city(row)
}

/// Closest city centroid within `max_km` of `point`; ties go to the lower id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_nearest_city(
    pool: &PgPool,
    point: GeoPoint,
    max_km: f64,
) -> Result<Option<City>, DbError> {
    let row = sqlx::query_as::<_, CityRow>(
        "SELECT id, name, state, latitude, longitude \
         FROM ( \
             SELECT c.id, c.name, c.state, c.latitude, c.longitude, \
                    6371.0 * 2 * asin(sqrt( \
                        power(sin(radians(c.latitude - $1) / 2), 2) \
                        + cos(radians($1)) * cos(radians(c.latitude)) \
                          * power(sin(radians(c.longitude - $2) / 2), 2))) AS distance_km \
             FROM cities c \
         ) d \
         WHERE distance_km <= $3 \
         ORDER BY distance_km, id \
         LIMIT 1",
    )
    .bind(point.latitude())
    .bind(point.longitude())
    .bind(max_km)
    .fetch_optional(pool)
    .await?;
    to_city(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_area_by_id(pool: &PgPool, id: i64) -> Result<Option<Area>, DbError> {
    let row = sqlx::query_as::<_, AreaRow>(
        "SELECT a.id, a.name, a.normalized_name, a.city_id, c.name AS city_name, \
                a.latitude, a.longitude \
         FROM areas a \
         JOIN cities c ON c.id = a.city_id \
         WHERE a.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    to_area(row)
}

/// Area in `city_id` matching `name`.
///
/// An exact normalized match wins; otherwise the shortest area whose
/// normalized name contains the input, or is contained by it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_area_by_city_and_name(
    pool: &PgPool,
    city_id: i64,
    name: &str,
) -> Result<Option<Area>, DbError> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Ok(None);
    }

    let row = sqlx::query_as::<_, AreaRow>(
        "SELECT a.id, a.name, a.normalized_name, a.city_id, c.name AS city_name, \
                a.latitude, a.longitude \
         FROM areas a \
         JOIN cities c ON c.id = a.city_id \
         WHERE a.city_id = $1 \
           AND (a.normalized_name = $2 \
                OR strpos(a.normalized_name, $2) > 0 \
                OR strpos($2, a.normalized_name) > 0) \
         ORDER BY (a.normalized_name = $2) DESC, length(a.name), a.id \
         LIMIT 1",
    )
    .bind(city_id)
    .bind(&normalized)
    .fetch_optional(pool)
    .await?;
    to_area(row)
}

/// Closest area centroid within `max_km` of `point`; ties go to the lower id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_nearest_area(
    pool: &PgPool,
    point: GeoPoint,
    max_km: f64,
) -> Result<Option<Area>, DbError> {
    let row = sqlx::query_as::<_, AreaRow>(
        "SELECT id, name, normalized_name, city_id, city_name, latitude, longitude \
         FROM ( \
             SELECT a.id, a.name, a.normalized_name, a.city_id, c.name AS city_name, \
                    a.latitude, a.longitude, \
                    6371.0 * 2 * asin(sqrt( \
                        power(sin(radians(a.latitude - $1) / 2), 2) \
                        + cos(radians($1)) * cos(radians(a.latitude)) \
                          * power(sin(radians(a.longitude - $2) / 2), 2))) AS distance_km \
             FROM areas a \
             JOIN cities c ON c.id = a.city_id \
         ) d \
         WHERE distance_km <= $3 \
         ORDER BY distance_km, id \
         LIMIT 1",
    )
    .bind(point.latitude())
    .bind(point.longitude())
    .bind(max_km)
    .fetch_optional(pool)
    .await?;
    to_area(row)
}
