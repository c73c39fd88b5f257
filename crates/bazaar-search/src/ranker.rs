//! Four-tier proximity ranking.
//!
//! Tiers are queried independently and concatenated in priority order;
//! sort modes only reorder vendors inside a tier.

use std::collections::HashSet;
use std::future::Future;

use bazaar_core::{
    BudgetRange, CandidateOrder, GeoPoint, StoreError, TaxonomyCatalog, VendorFilter,
    VendorRecord, VendorStore,
};

use crate::{
    Degradation, MatchTier, NormalizationResult, RankedPage, ResolvedLocation, SearchConfig,
    SearchError, SearchParams, SortMode, TierBreakdown, TierResult,
};

/// Which vendors count as matching the requested service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub service_ids: Option<Vec<String>>,
    /// Name/business-name search, OR-ed with `service_ids`.
    pub text: Option<String>,
}

impl CategoryFilter {
    /// No service restriction.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Services at or beneath an explicit taxonomy id.
    #[must_use]
    pub fn explicit(catalog: &TaxonomyCatalog, taxonomy_id: &str) -> Self {
        Self {
            service_ids: Some(catalog.services_under(taxonomy_id)),
            text: None,
        }
    }

    /// Services beneath the best match, widened with a name search when the
    /// match is weak or missing.
    #[must_use]
    pub fn from_normalization(result: &NormalizationResult, catalog: &TaxonomyCatalog) -> Self {
        let service_ids = result
            .best_match
            .as_ref()
            .map(|best| catalog.services_under(&best.taxonomy_id));
        let query = result.query.trim();
        let text = (result.is_low_confidence() && !query.is_empty()).then(|| query.to_string());
        Self { service_ids, text }
    }

    fn vendor_filter(&self, filters: &RankFilters, origin: GeoPoint, limit: i64) -> VendorFilter {
        VendorFilter {
            service_ids: self.service_ids.clone(),
            text: self.text.clone(),
            budget: filters.budget,
            min_rating: filters.min_rating,
            verified_only: filters.verified_only,
            origin: Some(origin),
            ..VendorFilter::any(limit)
        }
    }
}

/// Predicates ANDed onto every tier. Only the budget is relaxed for tiers 3 and 4.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankFilters {
    pub budget: BudgetRange,
    pub min_rating: Option<f64>,
    pub verified_only: bool,
}

pub struct TieredRanker<'a, V> {
    vendors: &'a V,
    config: &'a SearchConfig,
}

impl<'a, V: VendorStore> TieredRanker<'a, V> {
    pub fn new(vendors: &'a V, config: &'a SearchConfig) -> Self {
        Self { vendors, config }
    }

    /// Rank vendors around `location` and return the requested page.
    ///
    /// Tiers 1–3 are read concurrently; the adjacent-city tier runs only when
    /// they hold fewer than `min_results` vendors, widening its radius until
    /// the threshold is met or the configured maximum is reached.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NoLocationContext`] when `location` is `None`.
    /// Store failures and timeouts never fail the call; they empty the tier
    /// and add a [`Degradation`].
    pub async fn rank(
        &self,
        location: Option<&ResolvedLocation>,
        category: &CategoryFilter,
        params: &SearchParams,
    ) -> Result<RankedPage, SearchError> {
        let location = location.ok_or(SearchError::NoLocationContext)?;
        let center = location.coordinates;
        let radius_km = params.radius_km;
        let order = |tier| candidate_order(tier, params.sort);
        let strict =
            category.vendor_filter(&params.filters, center, self.config.tier_candidate_limit);
        let relaxed = strict.with_budget(params.filters.budget.relaxed());
        let exact_filter = strict.ordered(order(MatchTier::ExactArea));
        let nearby_filter = strict.ordered(order(MatchTier::Nearby));
        // In-radius city vendors are dropped in the read, before the row cap.
        let city_filter = relaxed
            .outside(center, radius_km)
            .ordered(order(MatchTier::SameCity));

        let (exact, nearby, same_city) = tokio::join!(
            self.guarded(MatchTier::ExactArea, self.exact_area(location, &exact_filter)),
            self.guarded(
                MatchTier::Nearby,
                self.vendors.find_near(center, radius_km, &nearby_filter)
            ),
            self.guarded(MatchTier::SameCity, self.same_city(location, &city_filter)),
        );

        let mut degradations = Vec::new();
        let mut seen = HashSet::new();
        let mut tiers = Vec::with_capacity(MatchTier::ALL.len());
        for (tier, (rows, note), keep) in [
            (MatchTier::ExactArea, exact, Keep::Any),
            (MatchTier::Nearby, nearby, Keep::Within(radius_km)),
            (MatchTier::SameCity, same_city, Keep::Beyond(radius_km)),
        ] {
            degradations.extend(note);
            tiers.push(annotate(rows, tier, center, keep, &mut seen));
        }

        let base_count: usize = tiers.iter().map(Vec::len).sum();
        let mut adjacent_radius_km = None;
        if base_count < self.config.min_results {
            let filter = relaxed
                .excluding_city(location.city_name())
                .excluding_ids(seen.iter().copied())
                .ordered(order(MatchTier::AdjacentCity));
            let (rows, radius, note) = self
                .adjacent_city(center, radius_km, &filter, &seen, base_count)
                .await;
            degradations.extend(note);
            adjacent_radius_km = Some(radius);
            tiers.push(rows);
        }

        let mut breakdown = TierBreakdown::default();
        for results in &mut tiers {
            if let Some(first) = results.first() {
                let tier = first.match_tier;
                breakdown.record(tier, results.len());
                let tier_order = order(tier);
                results.sort_by(|a, b| tier_order.compare(&a.vendor, &b.vendor, Some(center)));
            }
        }
        tracing::debug!(
            exact_area = breakdown.exact_area,
            nearby = breakdown.nearby,
            same_city = breakdown.same_city,
            adjacent_city = breakdown.adjacent_city,
            "tiers ranked"
        );

        let merged: Vec<TierResult> = tiers.into_iter().flatten().collect();
        let total = merged.len();
        let limit = params.limit.max(1) as usize;
        let offset = (params.page.max(1) as usize - 1).saturating_mul(limit);
        let results = merged.into_iter().skip(offset).take(limit).collect();

        Ok(RankedPage {
            results,
            total,
            page: params.page.max(1),
            limit: params.limit.max(1),
            total_pages: u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX),
            breakdown,
            radius_used_km: radius_km,
            adjacent_radius_km,
            degradations,
        })
    }

    async fn exact_area(
        &self,
        location: &ResolvedLocation,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        match (location.city_name(), location.area_name()) {
            (Some(city), Some(area)) => self.vendors.find_by_area(city, area, filter).await,
            _ => Ok(Vec::new()),
        }
    }

    async fn same_city(
        &self,
        location: &ResolvedLocation,
        filter: &VendorFilter,
    ) -> Result<Vec<VendorRecord>, StoreError> {
        match location.city_name() {
            Some(city) => self.vendors.find_by_city(city, filter).await,
            None => Ok(Vec::new()),
        }
    }

    /// Expanding-radius search outside the resolved city.
    async fn adjacent_city(
        &self,
        center: GeoPoint,
        base_radius_km: f64,
        filter: &VendorFilter,
        seen: &HashSet<i64>,
        base_count: usize,
    ) -> (Vec<TierResult>, f64, Option<Degradation>) {
        let mut radius = self.config.adjacent_start_radius(base_radius_km);
        let max_radius = self.config.adjacent_max_radius_km.max(radius);
        loop {
            let (rows, note) = self
                .guarded(
                    MatchTier::AdjacentCity,
                    self.vendors.find_near(center, radius, filter),
                )
                .await;
            let mut scratch = seen.clone();
            let results = annotate(rows, MatchTier::AdjacentCity, center, Keep::Any, &mut scratch);
            if note.is_some()
                || base_count + results.len() >= self.config.min_results
                || radius >= max_radius
            {
                return (results, radius, note);
            }
            radius = (radius * 2.0).min(max_radius);
        }
    }

    /// Run one tier read under the configured timeout.
    async fn guarded<F>(&self, tier: MatchTier, read: F) -> (Vec<VendorRecord>, Option<Degradation>)
    where
        F: Future<Output = Result<Vec<VendorRecord>, StoreError>>,
    {
        match tokio::time::timeout(self.config.tier_timeout, read).await {
            Ok(Ok(rows)) => (rows, None),
            Ok(Err(e)) => {
                tracing::warn!(tier = %tier, error = %e, "tier read failed; returning empty tier");
                let reason = format!("{} failed", e.operation);
                (Vec::new(), Some(Degradation::TierFailed { tier, reason }))
            }
            Err(_) => {
                tracing::warn!(
                    tier = %tier,
                    timeout_ms = self.config.tier_timeout.as_millis(),
                    "tier read timed out; returning empty tier"
                );
                (Vec::new(), Some(Degradation::TierTimedOut { tier }))
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Keep {
    Any,
    Within(f64),
    Beyond(f64),
}

impl Keep {
    fn admits(self, distance_km: f64) -> bool {
        match self {
            Keep::Any => true,
            Keep::Within(radius) => distance_km <= radius,
            Keep::Beyond(radius) => distance_km > radius,
        }
    }
}

/// Attach tier and distance, dropping vendors already placed in an earlier tier.
fn annotate(
    rows: Vec<VendorRecord>,
    tier: MatchTier,
    center: GeoPoint,
    keep: Keep,
    seen: &mut HashSet<i64>,
) -> Vec<TierResult> {
    rows.into_iter()
        .filter_map(|vendor| {
            let distance = center.distance_km(&vendor.location);
            (keep.admits(distance) && seen.insert(vendor.id))
                .then(|| TierResult::new(vendor, tier, Some(distance)))
        })
        .collect()
}

/// Order a tier's vendors for `sort`. Stores apply the same order before
/// their row cap, so the cap keeps the vendors that would rank first.
fn candidate_order(tier: MatchTier, sort: SortMode) -> CandidateOrder {
    match sort {
        SortMode::Relevance if tier == MatchTier::Nearby => CandidateOrder::Distance,
        SortMode::Relevance | SortMode::Rating => CandidateOrder::Rating,
        SortMode::PriceLow => CandidateOrder::PriceLow,
        SortMode::PriceHigh => CandidateOrder::PriceHigh,
        SortMode::Distance => CandidateOrder::Distance,
    }
}

#[cfg(test)]
#[path = "ranker_test.rs"]
mod tests;
