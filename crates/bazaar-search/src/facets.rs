//! Refinement facets derived from one page of results.
//!
//! Everything here is a pure function of the page and the taxonomy snapshot:
//! no store reads, and identical input always serializes identically.

use std::collections::{BTreeMap, BTreeSet};

use bazaar_core::{TaxonomyCatalog, VendorRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::TierResult;

const BUDGET_BUCKETS: u32 = 5;
const RATING_THRESHOLDS: [f64; 4] = [3.0, 3.5, 4.0, 4.5];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetBucket {
    pub min: Decimal,
    pub max: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaFacet {
    pub area: String,
    pub city: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFacet {
    pub taxonomy_id: String,
    /// Absent when the id is not in the active taxonomy.
    pub name: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategoryFacet {
    pub taxonomy_id: String,
    pub name: String,
    pub count: usize,
    pub services: Vec<ServiceFacet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFacet {
    pub taxonomy_id: String,
    pub name: String,
    pub count: usize,
    pub subcategories: Vec<SubcategoryFacet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBucket {
    pub min_rating: f64,
    pub count: usize,
}

/// Filters a client can offer for narrowing the current results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetSet {
    pub budget: Vec<BudgetBucket>,
    pub cities: Vec<FacetCount>,
    pub areas: Vec<AreaFacet>,
    pub services: Vec<ServiceFacet>,
    pub service_groups: Vec<CategoryFacet>,
    pub ratings: Vec<RatingBucket>,
    pub verified_count: usize,
    pub attributes: BTreeMap<String, Vec<FacetCount>>,
}

/// Derive facets from `page`.
///
/// Named facets are ordered by count descending, then name ascending.
/// Budget buckets are ordered by price. Zero-count entries are omitted.
#[must_use]
pub fn derive_facets(page: &[TierResult], catalog: &TaxonomyCatalog) -> FacetSet {
    let vendors: Vec<&VendorRecord> = page.iter().map(|r| &r.vendor).collect();

    let mut cities: BTreeMap<String, usize> = BTreeMap::new();
    let mut areas: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut services: BTreeMap<String, usize> = BTreeMap::new();
    for vendor in &vendors {
        *cities.entry(vendor.city.clone()).or_default() += 1;
        if let Some(area) = &vendor.area {
            *areas
                .entry((area.clone(), vendor.city.clone()))
                .or_default() += 1;
        }
        *services.entry(vendor.service_type.clone()).or_default() += 1;
    }

    let mut area_facets: Vec<AreaFacet> = areas
        .into_iter()
        .map(|((area, city), count)| AreaFacet { area, city, count })
        .collect();
    area_facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.area.cmp(&b.area)));

    let service_facets = service_facets(&services, catalog);

    FacetSet {
        budget: budget_buckets(&vendors),
        cities: ranked(cities),
        areas: area_facets,
        service_groups: service_groups(&service_facets, catalog),
        services: service_facets,
        ratings: RATING_THRESHOLDS
            .iter()
            .map(|&min_rating| RatingBucket {
                min_rating,
                count: vendors.iter().filter(|v| v.rating >= min_rating).count(),
            })
            .filter(|b| b.count > 0)
            .collect(),
        verified_count: vendors.iter().filter(|v| v.verified).count(),
        attributes: attribute_facets(&vendors),
    }
}

fn ranked(counts: BTreeMap<String, usize>) -> Vec<FacetCount> {
    let mut facets: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect();
    facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    facets
}

/// Equal-width buckets over the page's observed price span. A vendor counts
/// in every bucket its price range overlaps.
fn budget_buckets(vendors: &[&VendorRecord]) -> Vec<BudgetBucket> {
    let Some(low) = vendors.iter().map(|v| v.pricing.min).min() else {
        return Vec::new();
    };
    let high = vendors
        .iter()
        .map(|v| v.pricing.max)
        .max()
        .unwrap_or(low)
        .max(low);

    let count_overlapping = |min: Decimal, max: Decimal| {
        vendors
            .iter()
            .filter(|v| v.pricing.min <= max && v.pricing.max >= min)
            .count()
    };

    if high == low {
        return vec![BudgetBucket {
            min: low.round_dp(2),
            max: high.round_dp(2),
            count: vendors.len(),
        }];
    }

    let width = (high - low) / Decimal::from(BUDGET_BUCKETS);
    (0..BUDGET_BUCKETS)
        .map(|i| {
            let min = low + width * Decimal::from(i);
            let max = if i + 1 == BUDGET_BUCKETS {
                high
            } else {
                min + width
            };
            (min, max)
        })
        .filter_map(|(min, max)| {
            let count = count_overlapping(min, max);
            (count > 0).then(|| BudgetBucket {
                min: min.round_dp(2),
                max: max.round_dp(2),
                count,
            })
        })
        .collect()
}

fn service_facets(counts: &BTreeMap<String, usize>, catalog: &TaxonomyCatalog) -> Vec<ServiceFacet> {
    let mut facets: Vec<ServiceFacet> = counts
        .iter()
        .map(|(id, &count)| ServiceFacet {
            taxonomy_id: id.clone(),
            name: catalog.get(id).map(|e| e.name.clone()),
            count,
        })
        .collect();
    facets.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| display_name(a).cmp(display_name(b)))
    });
    facets
}

fn display_name(facet: &ServiceFacet) -> &str {
    facet.name.as_deref().unwrap_or(&facet.taxonomy_id)
}

/// Roll services up into subcategory and category aggregates.
fn service_groups(services: &[ServiceFacet], catalog: &TaxonomyCatalog) -> Vec<CategoryFacet> {
    let mut tree: BTreeMap<String, BTreeMap<String, Vec<ServiceFacet>>> = BTreeMap::new();
    for facet in services {
        let Some(entry) = catalog.get(&facet.taxonomy_id) else {
            continue;
        };
        let Some(sub) = catalog.parent(entry) else {
            continue;
        };
        let Some(category) = catalog.parent(sub) else {
            continue;
        };
        tree.entry(category.id.clone())
            .or_default()
            .entry(sub.id.clone())
            .or_default()
            .push(facet.clone());
    }

    let name_of = |id: &str| catalog.get(id).map_or_else(|| id.to_string(), |e| e.name.clone());

    let mut groups: Vec<CategoryFacet> = tree
        .into_iter()
        .map(|(category_id, subs)| {
            let mut subcategories: Vec<SubcategoryFacet> = subs
                .into_iter()
                .map(|(sub_id, services)| SubcategoryFacet {
                    name: name_of(&sub_id),
                    taxonomy_id: sub_id,
                    count: services.iter().map(|s| s.count).sum(),
                    services,
                })
                .collect();
            subcategories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
            CategoryFacet {
                name: name_of(&category_id),
                taxonomy_id: category_id,
                count: subcategories.iter().map(|s| s.count).sum(),
                subcategories,
            }
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    groups
}

/// Distinct scalar values per attribute key. Array elements count
/// individually; a value repeated within one vendor counts once.
fn attribute_facets(vendors: &[&VendorRecord]) -> BTreeMap<String, Vec<FacetCount>> {
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for vendor in vendors {
        for (key, value) in &vendor.attributes {
            let mut values = BTreeSet::new();
            match value {
                Value::Array(items) => values.extend(items.iter().filter_map(scalar)),
                other => values.extend(scalar(other)),
            }
            if values.is_empty() {
                continue;
            }
            let per_key = counts.entry(key.clone()).or_default();
            for value in values {
                *per_key.entry(value).or_default() += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|(key, values)| (key, ranked(values)))
        .collect()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
#[path = "facets_test.rs"]
mod tests;
