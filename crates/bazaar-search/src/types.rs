use std::fmt;

use bazaar_core::VendorRecord;
use serde::Serialize;

/// Proximity tier a vendor was matched through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExactArea,
    Nearby,
    SameCity,
    AdjacentCity,
}

impl MatchTier {
    pub const ALL: [MatchTier; 4] = [
        MatchTier::ExactArea,
        MatchTier::Nearby,
        MatchTier::SameCity,
        MatchTier::AdjacentCity,
    ];

    /// 1 for the most specific tier through 4 for the broadest.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            MatchTier::ExactArea => 1,
            MatchTier::Nearby => 2,
            MatchTier::SameCity => 3,
            MatchTier::AdjacentCity => 4,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchTier::ExactArea => "exact_area",
            MatchTier::Nearby => "nearby",
            MatchTier::SameCity => "same_city",
            MatchTier::AdjacentCity => "adjacent_city",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked vendor. Serializes flat: vendor fields plus tier annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierResult {
    #[serde(flatten)]
    pub vendor: VendorRecord,
    pub match_tier: MatchTier,
    pub tier_priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl TierResult {
    #[must_use]
    pub fn new(vendor: VendorRecord, tier: MatchTier, distance_km: Option<f64>) -> Self {
        Self {
            vendor,
            match_tier: tier,
            tier_priority: tier.priority(),
            distance_km,
        }
    }
}

/// Result counts per tier over the full merged list, before pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierBreakdown {
    pub exact_area: usize,
    pub nearby: usize,
    pub same_city: usize,
    pub adjacent_city: usize,
}

impl TierBreakdown {
    pub fn record(&mut self, tier: MatchTier, count: usize) {
        match tier {
            MatchTier::ExactArea => self.exact_area += count,
            MatchTier::Nearby => self.nearby += count,
            MatchTier::SameCity => self.same_city += count,
            MatchTier::AdjacentCity => self.adjacent_city += count,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.exact_area + self.nearby + self.same_city + self.adjacent_city
    }
}

/// A non-fatal condition surfaced in response metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// The named area was not found in the city; the city centroid was used.
    AreaNotFound { area: String, city: String },
    /// Taxonomy confidence fell below threshold; vendor-name matching was added.
    LowTaxonomyConfidence { confidence: f64 },
    TierTimedOut { tier: MatchTier },
    TierFailed { tier: MatchTier, reason: String },
}

/// One page of the merged tier list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPage {
    pub results: Vec<TierResult>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub breakdown: TierBreakdown,
    pub radius_used_km: f64,
    /// Final radius of the adjacent-city search, when that tier ran.
    pub adjacent_radius_km: Option<f64>,
    pub degradations: Vec<Degradation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_follow_tier_order() {
        let priorities: Vec<u8> = MatchTier::ALL.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
    }

    #[test]
    fn tier_serializes_snake_case() {
        let json = serde_json::to_string(&MatchTier::AdjacentCity).unwrap();
        assert_eq!(json, "\"adjacent_city\"");
    }

    #[test]
    fn degradation_is_tagged() {
        let json = serde_json::to_value(Degradation::TierTimedOut {
            tier: MatchTier::SameCity,
        })
        .unwrap();
        assert_eq!(json["kind"], "tier_timed_out");
        assert_eq!(json["tier"], "same_city");
    }

    #[test]
    fn breakdown_totals_all_tiers() {
        let mut breakdown = TierBreakdown::default();
        breakdown.record(MatchTier::ExactArea, 2);
        breakdown.record(MatchTier::AdjacentCity, 3);
        assert_eq!(breakdown.total(), 5);
        assert_eq!(breakdown.nearby, 0);
    }
}
