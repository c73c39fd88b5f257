use bazaar_core::{normalize_name, GeoFile, TaxonomyEntry, TaxonomyLevel};
use sqlx::PgPool;

use crate::DbError;

/// Rows touched by [`seed_geo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoSeedSummary {
    pub cities: usize,
    pub areas: usize,
}

/// Upsert taxonomy entries, parents before children.
///
/// Returns the number of entries processed. All upserts run inside a single
/// transaction; if any operation fails the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_taxonomy(pool: &PgPool, entries: &[TaxonomyEntry]) -> Result<usize, DbError> {
    let mut ordered: Vec<&TaxonomyEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| match e.level {
        TaxonomyLevel::Category => 0,
        TaxonomyLevel::Subcategory => 1,
        TaxonomyLevel::Service => 2,
    });

    let mut tx = pool.begin().await?;
    for entry in &ordered {
        sqlx::query(
            "INSERT INTO taxonomy_entries (id, level, name, parent_id, keywords, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET \
                 level = EXCLUDED.level, \
                 name = EXCLUDED.name, \
                 parent_id = EXCLUDED.parent_id, \
                 keywords = EXCLUDED.keywords, \
                 is_active = EXCLUDED.is_active, \
                 updated_at = NOW()",
        )
        .bind(&entry.id)
        .bind(entry.level.as_str())
        .bind(&entry.name)
        .bind(&entry.parent_id)
        .bind(&entry.keywords)
        .bind(entry.is_active)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::debug!(count = ordered.len(), "taxonomy seeded");
    Ok(ordered.len())
}

/// Upsert cities and their areas from the geo config file.
///
/// Cities are keyed by `(name, state)`, areas by `(city_id, normalized_name)`.
/// Runs in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_geo(pool: &PgPool, file: &GeoFile) -> Result<GeoSeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = GeoSeedSummary::default();

    for city in &file.cities {
        let city_id: i64 = sqlx::query_scalar(
            "INSERT INTO cities (name, state, latitude, longitude) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name, state) DO UPDATE SET \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&city.name)
        .bind(&city.state)
        .bind(city.latitude)
        .bind(city.longitude)
        .fetch_one(&mut *tx)
        .await?;
        summary.cities += 1;

        for area in &city.areas {
            sqlx::query(
                "INSERT INTO areas (city_id, name, normalized_name, latitude, longitude) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (city_id, normalized_name) DO UPDATE SET \
                     name = EXCLUDED.name, \
                     latitude = EXCLUDED.latitude, \
                     longitude = EXCLUDED.longitude, \
                     updated_at = NOW()",
            )
            .bind(city_id)
            .bind(&area.name)
            .bind(normalize_name(&area.name))
            .bind(area.latitude)
            .bind(area.longitude)
            .execute(&mut *tx)
            .await?;
            summary.areas += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}
