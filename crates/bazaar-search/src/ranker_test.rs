use std::time::Duration;

use bazaar_core::VendorRecord;
use rust_decimal::Decimal;

use super::*;
use crate::fixtures::{self, price, vendor, DEWAS_AB_ROAD, PALASIA, RAU, VIJAY_NAGAR};
use crate::memory::{MemoryCatalog, StoreOp};
use crate::{normalize, LocationResolver, LocationSpec};

const FREEGANJ: (f64, f64) = (23.1793, 75.7849);

fn params() -> SearchParams {
    SearchParams {
        query: None,
        service_id: None,
        location: LocationSpec::default(),
        radius_km: 10.0,
        filters: RankFilters::default(),
        sort: SortMode::Relevance,
        page: 1,
        limit: 20,
    }
}

fn photographer(id: i64, city: &str, area: Option<&str>, at: (f64, f64)) -> VendorRecord {
    vendor(id, "wedding-photography", city, area, at)
}

async fn vijay_nagar(catalog: &MemoryCatalog) -> ResolvedLocation {
    LocationResolver::new(catalog, 30.0, 5.0)
        .resolve(&LocationSpec {
            city: Some("Indore".to_string()),
            area: Some("Vijay Nagar".to_string()),
            ..LocationSpec::default()
        })
        .await
        .unwrap()
}

async fn rank_with(
    catalog: &MemoryCatalog,
    config: &SearchConfig,
    params: &SearchParams,
) -> RankedPage {
    let location = vijay_nagar(catalog).await;
    TieredRanker::new(catalog, config)
        .rank(Some(&location), &CategoryFilter::any(), params)
        .await
        .unwrap()
}

fn ids(page: &RankedPage) -> Vec<i64> {
    page.results.iter().map(|r| r.vendor.id).collect()
}

fn tiers(page: &RankedPage) -> Vec<MatchTier> {
    page.results.iter().map(|r| r.match_tier).collect()
}

#[tokio::test]
async fn missing_location_is_rejected() {
    let catalog = fixtures::catalog();
    let config = SearchConfig::default();
    let err = TieredRanker::new(&catalog, &config)
        .rank(None, &CategoryFilter::any(), &params())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::NoLocationContext));
}

#[tokio::test]
async fn tiers_are_concatenated_in_priority_order() {
    let catalog = fixtures::catalog().with_vendors([
        photographer(4, "Dewas", Some("AB Road"), DEWAS_AB_ROAD),
        photographer(3, "Indore", Some("Rau"), RAU),
        photographer(2, "Indore", Some("Palasia"), PALASIA),
        photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR),
    ]);
    let page = rank_with(&catalog, &SearchConfig::default(), &params()).await;

    assert_eq!(ids(&page), vec![1, 2, 3, 4]);
    assert_eq!(
        tiers(&page),
        vec![
            MatchTier::ExactArea,
            MatchTier::Nearby,
            MatchTier::SameCity,
            MatchTier::AdjacentCity
        ]
    );
    let priorities: Vec<u8> = page.results.iter().map(|r| r.tier_priority).collect();
    assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(page.breakdown.total(), 4);
    assert!(page.degradations.is_empty());
}

#[tokio::test]
async fn nearby_results_respect_radius() {
    let catalog = fixtures::catalog().with_vendors([
        photographer(1, "Indore", Some("Palasia"), PALASIA),
        photographer(2, "Indore", None, (22.7196, 75.8577)),
        photographer(3, "Indore", Some("Rau"), RAU),
    ]);
    let page = rank_with(&catalog, &SearchConfig::default(), &params()).await;

    let nearby: Vec<&TierResult> = page
        .results
        .iter()
        .filter(|r| r.match_tier == MatchTier::Nearby)
        .collect();
    assert_eq!(nearby.len(), 2);
    for result in &nearby {
        assert!(result.distance_km.unwrap() <= page.radius_used_km);
    }
    assert!(nearby[0].distance_km <= nearby[1].distance_km);
    assert_eq!(page.results[2].vendor.id, 3);
    assert_eq!(page.results[2].match_tier, MatchTier::SameCity);
}

#[tokio::test]
async fn budget_is_strict_near_and_relaxed_far() {
    let mut near = photographer(10, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR);
    near.pricing = price(16_000, 20_000);
    let mut same_city = photographer(11, "Indore", Some("Rau"), RAU);
    same_city.pricing = price(16_000, 20_000);
    let mut adjacent = photographer(12, "Dewas", Some("AB Road"), DEWAS_AB_ROAD);
    adjacent.pricing = price(16_000, 20_000);
    let catalog = fixtures::catalog().with_vendors([near, same_city, adjacent]);

    let mut params = params();
    params.filters.budget =
        BudgetRange::new(Some(Decimal::from(5_000)), Some(Decimal::from(15_000))).unwrap();
    let page = rank_with(&catalog, &SearchConfig::default(), &params).await;

    assert_eq!(ids(&page), vec![11, 12]);
    assert_eq!(
        tiers(&page),
        vec![MatchTier::SameCity, MatchTier::AdjacentCity]
    );
}

#[tokio::test]
async fn adjacent_cities_fill_an_empty_city() {
    let catalog = fixtures::catalog().with_vendors([
        photographer(1, "Dewas", Some("AB Road"), DEWAS_AB_ROAD),
        photographer(2, "Ujjain", Some("Freeganj"), FREEGANJ),
    ]);
    let page = rank_with(&catalog, &SearchConfig::default(), &params()).await;

    assert_eq!(page.total, 2);
    assert_eq!(page.breakdown.adjacent_city, 2);
    assert_eq!(ids(&page), vec![1, 2]);
    assert_eq!(page.adjacent_radius_km, Some(80.0));
}

#[tokio::test]
async fn adjacent_radius_stops_growing_once_threshold_met() {
    let mut config = SearchConfig::default();
    config.min_results = 1;
    let catalog = fixtures::catalog().with_vendors([
        photographer(1, "Dewas", Some("AB Road"), DEWAS_AB_ROAD),
        photographer(2, "Ujjain", Some("Freeganj"), FREEGANJ),
    ]);
    let page = rank_with(&catalog, &config, &params()).await;

    assert_eq!(ids(&page), vec![1]);
    assert_eq!(page.adjacent_radius_km, Some(40.0));
}

#[tokio::test]
async fn adjacent_tier_skipped_when_threshold_met() {
    let mut vendors: Vec<VendorRecord> = (1..=5)
        .map(|id| photographer(id, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR))
        .collect();
    vendors.push(photographer(6, "Dewas", Some("AB Road"), DEWAS_AB_ROAD));
    let catalog = fixtures::catalog().with_vendors(vendors);
    let page = rank_with(&catalog, &SearchConfig::default(), &params()).await;

    assert_eq!(page.total, 5);
    assert_eq!(page.adjacent_radius_km, None);
    assert_eq!(page.breakdown.adjacent_city, 0);
}

#[tokio::test]
async fn relevance_orders_by_rating_then_reviews() {
    let mut a = photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR);
    a.rating = 4.2;
    let mut b = photographer(2, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR);
    b.rating = 4.8;
    let mut c = photographer(3, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR);
    c.rating = 4.8;
    c.review_count = 50;
    let catalog = fixtures::catalog().with_vendors([a, b, c]);
    let page = rank_with(&catalog, &SearchConfig::default(), &params()).await;

    assert_eq!(ids(&page)[..3], [3, 2, 1]);
}

#[tokio::test]
async fn sort_mode_never_crosses_tiers() {
    let mut exact = photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR);
    exact.pricing = price(40_000, 60_000);
    let mut nearby_pricey = photographer(2, "Indore", Some("Palasia"), PALASIA);
    nearby_pricey.pricing = price(30_000, 35_000);
    let mut nearby_cheap = photographer(3, "Indore", None, (22.7196, 75.8577));
    nearby_cheap.pricing = price(5_000, 8_000);
    let catalog = fixtures::catalog().with_vendors([exact, nearby_pricey, nearby_cheap]);

    let mut params = params();
    params.sort = SortMode::PriceLow;
    let page = rank_with(&catalog, &SearchConfig::default(), &params).await;

    assert_eq!(ids(&page), vec![1, 3, 2]);
    assert_eq!(page.results[0].match_tier, MatchTier::ExactArea);
}

#[tokio::test]
async fn pages_are_disjoint_slices_of_the_merge() {
    let mut vendors: Vec<VendorRecord> = (1..=3)
        .map(|id| photographer(id, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR))
        .collect();
    vendors.extend((4..=5).map(|id| photographer(id, "Indore", Some("Palasia"), PALASIA)));
    vendors.extend((6..=7).map(|id| photographer(id, "Indore", Some("Rau"), RAU)));
    let catalog = fixtures::catalog().with_vendors(vendors);
    let config = SearchConfig::default();

    let full = rank_with(&catalog, &config, &params()).await;
    let mut paged = params();
    paged.limit = 3;
    let first = rank_with(&catalog, &config, &paged).await;
    paged.page = 2;
    let second = rank_with(&catalog, &config, &paged).await;

    assert_eq!(first.total, 7);
    assert_eq!(first.total_pages, 3);
    let (p1, p2) = (ids(&first), ids(&second));
    assert!(p1.iter().all(|id| !p2.contains(id)));
    let union: Vec<i64> = p1.into_iter().chain(p2).collect();
    assert_eq!(union, ids(&full)[..6].to_vec());
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let catalog = fixtures::catalog()
        .with_vendor(photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR));
    let mut params = params();
    params.page = 4;
    let page = rank_with(&catalog, &SearchConfig::default(), &params).await;
    assert!(page.results.is_empty());
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn slow_tier_times_out_to_empty() {
    let catalog = fixtures::catalog()
        .with_vendors([
            photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR),
            photographer(2, "Indore", Some("Rau"), RAU),
        ])
        .with_delay(StoreOp::FindByCity, Duration::from_millis(500));
    let mut config = SearchConfig::default();
    config.tier_timeout = Duration::from_millis(50);
    config.min_results = 1;
    let page = rank_with(&catalog, &config, &params()).await;

    assert_eq!(ids(&page), vec![1]);
    assert_eq!(page.breakdown.same_city, 0);
    assert_eq!(
        page.degradations,
        vec![Degradation::TierTimedOut {
            tier: MatchTier::SameCity
        }]
    );
}

#[tokio::test]
async fn failed_tier_is_reported_not_raised() {
    let catalog = fixtures::catalog()
        .with_vendor(photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR))
        .with_failure(StoreOp::FindNear);
    let page = rank_with(&catalog, &SearchConfig::default(), &params()).await;

    assert_eq!(ids(&page), vec![1]);
    assert!(page.degradations.contains(&Degradation::TierFailed {
        tier: MatchTier::Nearby,
        reason: "find_near failed".to_string(),
    }));
    assert!(page.degradations.contains(&Degradation::TierFailed {
        tier: MatchTier::AdjacentCity,
        reason: "find_near failed".to_string(),
    }));
}

#[tokio::test]
async fn category_and_verified_filters_apply_to_every_tier() {
    let mut verified = photographer(1, "Indore", Some("Rau"), RAU);
    verified.verified = true;
    let catalog = fixtures::catalog().with_vendors([
        verified,
        photographer(2, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR),
        vendor(3, "dj", "Indore", Some("Vijay Nagar"), VIJAY_NAGAR),
    ]);
    let config = SearchConfig::default();
    let location = vijay_nagar(&catalog).await;
    let taxonomy = fixtures::taxonomy();
    let category = CategoryFilter::explicit(&taxonomy, "photography");
    let mut params = params();
    params.filters.verified_only = true;

    let page = TieredRanker::new(&catalog, &config)
        .rank(Some(&location), &category, &params)
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![1]);
}

#[test]
fn category_filter_expands_best_match() {
    let taxonomy = fixtures::taxonomy();
    let result = normalize(&taxonomy, "menu");
    let filter = CategoryFilter::from_normalization(&result, &taxonomy);
    assert_eq!(
        filter.service_ids,
        Some(vec![
            "custom-cakes".to_string(),
            "live-counters".to_string(),
            "wedding-catering".to_string()
        ])
    );
    assert_eq!(filter.text, None);
}

#[test]
fn low_confidence_adds_name_search() {
    let taxonomy = fixtures::taxonomy();
    let result = normalize(&taxonomy, "film camera rental");
    let filter = CategoryFilter::from_normalization(&result, &taxonomy);
    assert_eq!(
        filter.service_ids,
        Some(vec!["cinematic-video".to_string()])
    );
    assert_eq!(filter.text.as_deref(), Some("film camera rental"));
}

#[test]
fn unmatched_query_searches_names_only() {
    let taxonomy = fixtures::taxonomy();
    let result = normalize(&taxonomy, "Shree Studio");
    let filter = CategoryFilter::from_normalization(&result, &taxonomy);
    assert_eq!(filter.service_ids, None);
    assert_eq!(filter.text.as_deref(), Some("Shree Studio"));
}

fn capped(limit: i64) -> SearchConfig {
    SearchConfig {
        tier_candidate_limit: limit,
        ..SearchConfig::default()
    }
}

#[tokio::test]
async fn capped_same_city_read_skips_in_radius_vendors() {
    let catalog = fixtures::catalog().with_vendors([
        photographer(1, "Indore", Some("Palasia"), PALASIA),
        photographer(2, "Indore", Some("Palasia"), PALASIA),
        photographer(3, "Indore", Some("Rau"), RAU),
    ]);
    let page = rank_with(&catalog, &capped(2), &params()).await;

    assert_eq!(ids(&page), vec![1, 2, 3]);
    assert_eq!(
        tiers(&page),
        vec![MatchTier::Nearby, MatchTier::Nearby, MatchTier::SameCity]
    );
}

#[tokio::test]
async fn capped_exact_area_keeps_the_best_rated() {
    let mut top = photographer(3, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR);
    top.rating = 5.0;
    let catalog = fixtures::catalog().with_vendors([
        photographer(1, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR),
        photographer(2, "Indore", Some("Vijay Nagar"), VIJAY_NAGAR),
        top,
    ]);
    let page = rank_with(&catalog, &capped(2), &params()).await;

    let exact: Vec<i64> = page
        .results
        .iter()
        .filter(|r| r.match_tier == MatchTier::ExactArea)
        .map(|r| r.vendor.id)
        .collect();
    assert_eq!(exact, vec![3, 1]);
}

#[tokio::test]
async fn capped_same_city_follows_the_sort_mode() {
    let mut cheap = photographer(9, "Indore", Some("Rau"), RAU);
    cheap.pricing = price(1_000, 2_000);
    let catalog = fixtures::catalog().with_vendors([
        photographer(7, "Indore", Some("Rau"), RAU),
        photographer(8, "Indore", Some("Rau"), RAU),
        cheap,
    ]);
    let mut params = params();
    params.sort = SortMode::PriceLow;
    let page = rank_with(&catalog, &capped(1), &params).await;

    let same_city: Vec<i64> = page
        .results
        .iter()
        .filter(|r| r.match_tier == MatchTier::SameCity)
        .map(|r| r.vendor.id)
        .collect();
    assert_eq!(same_city, vec![9]);
}

#[tokio::test]
async fn capped_adjacent_read_skips_vendors_already_placed() {
    // A Dewas vendor inside the search radius is already placed in tier 2.
    let mut config = capped(1);
    config.min_results = 3;
    let mut across_line = photographer(1, "Dewas", Some("AB Road"), PALASIA);
    across_line.rating = 5.0;
    let catalog = fixtures::catalog().with_vendors([
        across_line,
        photographer(2, "Dewas", Some("AB Road"), DEWAS_AB_ROAD),
    ]);
    let page = rank_with(&catalog, &config, &params()).await;

    assert_eq!(ids(&page), vec![1, 2]);
    assert_eq!(
        tiers(&page),
        vec![MatchTier::Nearby, MatchTier::AdjacentCity]
    );
}
