//! Read operations for the `taxonomy_entries` table.

use std::str::FromStr;

use bazaar_core::{TaxonomyEntry, TaxonomyLevel};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaxonomyRow {
    pub id: String,
    pub level: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub keywords: Vec<String>,
    pub is_active: bool,
}

impl TryFrom<TaxonomyRow> for TaxonomyEntry {
    type Error = DbError;

    fn try_from(row: TaxonomyRow) -> Result<Self, Self::Error> {
        let level = TaxonomyLevel::from_str(&row.level)
            .map_err(|e| DbError::InvalidRow(format!("taxonomy entry {}: {e}", row.id)))?;
        Ok(TaxonomyEntry {
            id: row.id,
            level,
            name: row.name,
            parent_id: row.parent_id,
            keywords: row.keywords,
            is_active: row.is_active,
        })
    }
}

fn into_entries(rows: Vec<TaxonomyRow>) -> Result<Vec<TaxonomyEntry>, DbError> {
    rows.into_iter().map(TaxonomyEntry::try_from).collect()
}

/// Every active taxonomy entry, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidRow`]
/// if a stored level is unrecognised.
pub async fn list_active_taxonomy(pool: &PgPool) -> Result<Vec<TaxonomyEntry>, DbError> {
    let rows = sqlx::query_as::<_, TaxonomyRow>(
        "SELECT id, level, name, parent_id, keywords, is_active \
         FROM taxonomy_entries \
         WHERE is_active = TRUE \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    into_entries(rows)
}

/// Active entries of `level` whose name or any keyword contains `text`, or
/// is contained by it (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::InvalidRow`]
/// if a stored level is unrecognised.
pub async fn find_taxonomy_by_keyword_or_name(
    pool: &PgPool,
    level: TaxonomyLevel,
    text: &str,
) -> Result<Vec<TaxonomyEntry>, DbError> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, TaxonomyRow>(
        "SELECT t.id, t.level, t.name, t.parent_id, t.keywords, t.is_active \
         FROM taxonomy_entries t \
         WHERE t.is_active = TRUE \
           AND t.level = $1 \
           AND (strpos(lower(t.name), $2) > 0 \
                OR strpos($2, lower(t.name)) > 0 \
                OR EXISTS ( \
                    SELECT 1 FROM unnest(t.keywords) AS k(keyword) \
                    WHERE k.keyword <> '' \
                      AND (strpos(lower(k.keyword), $2) > 0 \
                           OR strpos($2, lower(k.keyword)) > 0))) \
         ORDER BY t.id",
    )
    .bind(level.as_str())
    .bind(&needle)
    .fetch_all(pool)
    .await?;
    into_entries(rows)
}
