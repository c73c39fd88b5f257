//! `db` subcommand handlers.

use bazaar_core::{load_geo_file, load_taxonomy_file, AppConfig};

pub(crate) async fn run_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    bazaar_db::health_check(pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = bazaar_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Load both seed files before touching the database so a bad file aborts
/// the whole seed.
///
/// # Errors
///
/// Returns an error if either file fails to load or validate, or if an
/// upsert fails.
pub(crate) async fn run_seed(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let taxonomy = load_taxonomy_file(&config.taxonomy_path)?;
    let geo = load_geo_file(&config.geo_path)?;

    let entries = taxonomy.into_entries();
    let seeded = bazaar_db::seed_taxonomy(pool, &entries).await?;
    let summary = bazaar_db::seed_geo(pool, &geo).await?;

    tracing::info!(
        taxonomy = seeded,
        cities = summary.cities,
        areas = summary.areas,
        "seed complete"
    );
    println!(
        "seeded {seeded} taxonomy entries, {} cities, {} areas",
        summary.cities, summary.areas
    );
    Ok(())
}
