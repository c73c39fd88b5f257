use super::*;
use crate::fixtures;

fn ids(matches: &[TaxonomyMatch]) -> Vec<&str> {
    matches.iter().map(|m| m.taxonomy_id.as_str()).collect()
}

#[test]
fn keyword_hit_picks_service() {
    let result = normalize(&fixtures::taxonomy(), "photographer");
    let best = result.best_match.as_ref().unwrap();
    assert_eq!(best.taxonomy_id, "wedding-photography");
    assert_eq!(best.level, TaxonomyLevel::Service);
    assert_eq!(best.score, 90);
    assert!((result.confidence - 0.9).abs() < 1e-9);
    assert!(!result.is_low_confidence());
    assert_eq!(
        ids(&result.services),
        vec!["wedding-photography", "candid-photography"]
    );
}

#[test]
fn exact_name_caps_confidence_at_one() {
    let result = normalize(&fixtures::taxonomy(), "  Wedding   PHOTOGRAPHY ");
    let best = result.best_match.unwrap();
    assert_eq!(best.taxonomy_id, "wedding-photography");
    assert_eq!(best.score, 120);
    assert!((result.confidence - 1.0).abs() < f64::EPSILON);
}

#[test]
fn service_outranks_stronger_subcategory() {
    let result = normalize(&fixtures::taxonomy(), "catering");
    assert_eq!(result.best_match.unwrap().taxonomy_id, "wedding-catering");
    assert_eq!(result.subcategories[0].taxonomy_id, "catering");
    assert!(result.subcategories[0].score > result.services[0].score);
}

#[test]
fn falls_back_to_category_level() {
    let result = normalize(&fixtures::taxonomy(), "menu");
    assert!(result.services.is_empty());
    assert!(result.subcategories.is_empty());
    let best = result.best_match.unwrap();
    assert_eq!(best.taxonomy_id, "food-beverage");
    assert_eq!(best.level, TaxonomyLevel::Category);
    assert!((result.confidence - 75.0 / 80.0).abs() < 1e-9);
}

#[test]
fn token_only_matches_are_low_confidence() {
    let result = normalize(&fixtures::taxonomy(), "film camera rental");
    assert_eq!(
        result.best_match.as_ref().unwrap().taxonomy_id,
        "cinematic-video"
    );
    assert!((result.confidence - 0.1).abs() < 1e-9);
    assert!(result.is_low_confidence());
}

#[test]
fn ties_break_by_id() {
    let result = normalize(&fixtures::taxonomy(), "wedding");
    assert_eq!(
        ids(&result.services[..4]),
        vec![
            "cinematic-video",
            "pre-wedding-shoot",
            "wedding-catering",
            "wedding-photography"
        ]
    );
    assert!(result.services[..4].iter().all(|m| m.score == 70));
    assert_eq!(result.services[4].taxonomy_id, "custom-cakes");
}

#[test]
fn unmatched_query_has_zero_confidence() {
    let result = normalize(&fixtures::taxonomy(), "xyzzy");
    assert!(result.best_match.is_none());
    assert!(result.confidence.abs() < f64::EPSILON);
    assert!(result.is_low_confidence());
    assert_eq!(result.matches().count(), 0);
}

#[test]
fn blank_query_is_empty_result() {
    let result = normalize(&fixtures::taxonomy(), "   ");
    assert!(result.best_match.is_none());
    assert_eq!(result.source, MatchSource::Normalized);
}

#[test]
fn inactive_entries_never_match() {
    let mut entries: Vec<TaxonomyEntry> = fixtures::taxonomy().iter().cloned().collect();
    for entry in &mut entries {
        if entry.id == "wedding-photography" {
            entry.is_active = false;
        }
    }
    let catalog = TaxonomyCatalog::from_entries(entries);
    let result = normalize(&catalog, "photographer");
    assert_eq!(
        result.best_match.unwrap().taxonomy_id,
        "candid-photography"
    );
}

#[test]
fn explicit_result_is_fully_confident() {
    let catalog = fixtures::taxonomy();
    let entry = catalog.get("banquet-venues").unwrap();
    let result = NormalizationResult::explicit(entry);
    assert_eq!(result.source, MatchSource::Explicit);
    assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    assert_eq!(ids(&result.subcategories), vec!["banquet-venues"]);
}

#[test]
fn normalization_is_deterministic() {
    let catalog = fixtures::taxonomy();
    let a = serde_json::to_string(&normalize(&catalog, "wedding photos")).unwrap();
    let b = serde_json::to_string(&normalize(&catalog, "wedding photos")).unwrap();
    assert_eq!(a, b);
}
