//! Live integration tests for bazaar-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need `DATABASE_URL`, so they are ignored by
//! default: `cargo test -p bazaar-db -- --ignored`.

use std::path::Path;

use bazaar_core::{
    load_geo_file, load_taxonomy_file, BudgetRange, CandidateOrder, GeoPoint, GeoStore,
    TaxonomyLevel, TaxonomyStore, VendorFilter, VendorStore,
};
use bazaar_db::{seed_geo, seed_taxonomy, PgCatalog};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

async fn seed_all(pool: &sqlx::PgPool) {
    let geo = load_geo_file(&config_path("geo.yaml")).expect("load geo.yaml");
    let taxonomy = load_taxonomy_file(&config_path("taxonomy.yaml")).expect("load taxonomy.yaml");
    seed_geo(pool, &geo).await.expect("seed_geo failed");
    seed_taxonomy(pool, &taxonomy.into_entries())
        .await
        .expect("seed_taxonomy failed");
}

/// Insert an approved vendor and return its generated `id`.
async fn insert_vendor(
    pool: &sqlx::PgPool,
    name: &str,
    service: &str,
    city: &str,
    area: Option<&str>,
    (lat, lng): (f64, f64),
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO vendors (name, service_type, city, area, latitude, longitude, \
                              price_min, price_max, rating, review_count, approval_status) \
         VALUES ($1, $2, $3, $4, $5, $6, 10000, 50000, 4.0, 10, 'approved') RETURNING id",
    )
    .bind(name)
    .bind(service)
    .bind(city)
    .bind(area)
    .bind(lat)
    .bind(lng)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_vendor failed for '{name}': {e}"))
}

fn photography_filter() -> VendorFilter {
    VendorFilter {
        service_ids: Some(vec!["wedding-photography".to_string()]),
        ..VendorFilter::any(50)
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn seeding_twice_is_idempotent(pool: sqlx::PgPool) {
    let geo = load_geo_file(&config_path("geo.yaml")).unwrap();
    let first = seed_geo(&pool, &geo).await.unwrap();
    let second = seed_geo(&pool, &geo).await.unwrap();
    assert_eq!(first, second);

    let cities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cities")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(usize::try_from(cities).unwrap(), first.cities);
}

// ---------------------------------------------------------------------------
// Geo reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn city_and_area_lookups(pool: sqlx::PgPool) {
    seed_all(&pool).await;
    let catalog = PgCatalog::new(pool);

    let indore = catalog
        .find_city_by_name("  INDORE ")
        .await
        .unwrap()
        .expect("Indore should exist");
    assert_eq!(indore.state, "Madhya Pradesh");

    let area = catalog
        .find_area_by_city_and_name(indore.id, "vijay-nagar")
        .await
        .unwrap()
        .expect("Vijay Nagar should resolve");
    assert_eq!(area.name, "Vijay Nagar");
    assert_eq!(area.city_name, "Indore");

    let partial = catalog
        .find_area_by_city_and_name(indore.id, "Palasia Square")
        .await
        .unwrap()
        .expect("contained area name should resolve");
    assert_eq!(partial.name, "Palasia");

    assert!(catalog
        .find_area_by_city_and_name(indore.id, "Freeganj")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn nearest_lookups_respect_max_distance(pool: sqlx::PgPool) {
    seed_all(&pool).await;
    let catalog = PgCatalog::new(pool);
    let near_vijay_nagar = GeoPoint::new(22.7540, 75.8940).unwrap();

    let area = catalog
        .find_nearest_area(near_vijay_nagar, 5.0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(area.name, "Vijay Nagar");

    let city = catalog
        .find_nearest_city(near_vijay_nagar, 30.0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(city.name, "Indore");

    let mid_ocean = GeoPoint::new(10.0, 65.0).unwrap();
    assert!(catalog
        .find_nearest_city(mid_ocean, 30.0)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Vendor reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn vendor_reads_apply_location_and_filters(pool: sqlx::PgPool) {
    seed_all(&pool).await;
    let in_area = insert_vendor(
        &pool,
        "Lens & Light",
        "wedding-photography",
        "Indore",
        Some("Vijay-Nagar"),
        (22.7533, 75.8937),
    )
    .await;
    let nearby = insert_vendor(
        &pool,
        "Palasia Pixels",
        "wedding-photography",
        "Indore",
        Some("Palasia"),
        (22.7244, 75.8839),
    )
    .await;
    let dewas = insert_vendor(
        &pool,
        "Dewas Frames",
        "wedding-photography",
        "Dewas",
        Some("AB Road"),
        (22.9587, 76.0450),
    )
    .await;
    insert_vendor(
        &pool,
        "Spice Route",
        "wedding-catering",
        "Indore",
        Some("Vijay Nagar"),
        (22.7530, 75.8930),
    )
    .await;
    sqlx::query("UPDATE vendors SET approval_status = 'pending' WHERE name = 'Spice Route'")
        .execute(&pool)
        .await
        .unwrap();

    let catalog = PgCatalog::new(pool);
    let filter = photography_filter();

    let by_area = catalog
        .find_by_area("indore", "vijay nagar", &filter)
        .await
        .unwrap();
    assert_eq!(by_area.iter().map(|v| v.id).collect::<Vec<_>>(), vec![in_area]);

    let center = GeoPoint::new(22.7533, 75.8937).unwrap();
    let near = catalog
        .find_near(center, 10.0, &filter.ordered(CandidateOrder::Distance))
        .await
        .unwrap();
    assert_eq!(
        near.iter().map(|v| v.id).collect::<Vec<_>>(),
        vec![in_area, nearby]
    );

    let adjacent = catalog
        .find_near(center, 40.0, &filter.excluding_city(Some("Indore")))
        .await
        .unwrap();
    assert_eq!(adjacent.iter().map(|v| v.id).collect::<Vec<_>>(), vec![dewas]);

    let unaffordable = filter.with_budget(BudgetRange::new(None, Some(Decimal::from(5_000))).unwrap());
    assert!(catalog
        .find_by_city("Indore", &unaffordable)
        .await
        .unwrap()
        .is_empty());

    let by_name = VendorFilter {
        text: Some("PIXELS".to_string()),
        ..VendorFilter::any(50)
    };
    let named = catalog.find_by_city("Indore", &by_name).await.unwrap();
    assert_eq!(named.iter().map(|v| v.id).collect::<Vec<_>>(), vec![nearby]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn radius_boundary_uses_rounded_distance(pool: sqlx::PgPool) {
    seed_all(&pool).await;
    // 10.003 km due north of the centre; rounds to 10.00.
    let edge = insert_vendor(
        &pool,
        "Edge Studio",
        "wedding-photography",
        "Indore",
        None,
        (22.84326, 75.8937),
    )
    .await;
    let catalog = PgCatalog::new(pool);
    let center = GeoPoint::new(22.7533, 75.8937).unwrap();
    let filter = photography_filter();

    let near = catalog.find_near(center, 10.0, &filter).await.unwrap();
    assert_eq!(near.iter().map(|v| v.id).collect::<Vec<_>>(), vec![edge]);

    let beyond = catalog
        .find_by_city("Indore", &filter.outside(center, 10.0))
        .await
        .unwrap();
    assert!(beyond.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn capped_reads_take_rows_in_candidate_order(pool: sqlx::PgPool) {
    seed_all(&pool).await;
    let mut ids = Vec::new();
    for (name, at) in [
        ("Alpha Frames", (22.7533, 75.8937)),
        ("Beta Frames", (22.7533, 75.8937)),
        ("Gamma Frames", (22.6355, 75.8110)),
    ] {
        let id = insert_vendor(
            &pool,
            name,
            "wedding-photography",
            "Indore",
            Some("Vijay Nagar"),
            at,
        )
        .await;
        ids.push(id);
    }
    sqlx::query("UPDATE vendors SET rating = 5.0 WHERE name = 'Gamma Frames'")
        .execute(&pool)
        .await
        .unwrap();
    let catalog = PgCatalog::new(pool);
    let center = GeoPoint::new(22.7533, 75.8937).unwrap();
    let capped = VendorFilter {
        limit: 2,
        ..photography_filter()
    };

    let by_rating = catalog
        .find_by_area("Indore", "Vijay Nagar", &capped)
        .await
        .unwrap();
    assert_eq!(
        by_rating.iter().map(|v| v.id).collect::<Vec<_>>(),
        vec![ids[2], ids[0]]
    );

    let beyond = catalog
        .find_by_city("Indore", &capped.outside(center, 10.0))
        .await
        .unwrap();
    assert_eq!(beyond.iter().map(|v| v.id).collect::<Vec<_>>(), vec![ids[2]]);

    let skipping = catalog
        .find_near(
            center,
            20.0,
            &capped
                .ordered(CandidateOrder::Distance)
                .excluding_ids([ids[0]]),
        )
        .await
        .unwrap();
    assert_eq!(
        skipping.iter().map(|v| v.id).collect::<Vec<_>>(),
        vec![ids[1], ids[2]]
    );
}

// ---------------------------------------------------------------------------
// Taxonomy reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn taxonomy_snapshot_and_keyword_lookup(pool: sqlx::PgPool) {
    seed_all(&pool).await;
    let catalog = PgCatalog::new(pool);

    let snapshot = catalog.load_catalog().await.unwrap();
    assert!(snapshot.get("wedding-photography").is_some());
    assert!(snapshot
        .services_under("photography-video")
        .contains(&"cinematic-video".to_string()));

    let hits = catalog
        .find_by_keyword_or_name(TaxonomyLevel::Service, "photographer")
        .await
        .unwrap();
    assert!(hits.iter().any(|e| e.id == "wedding-photography"));
    assert!(hits.iter().all(|e| e.level == TaxonomyLevel::Service));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn ping_succeeds_on_live_pool(pool: sqlx::PgPool) {
    PgCatalog::new(pool).ping().await.unwrap();
}
