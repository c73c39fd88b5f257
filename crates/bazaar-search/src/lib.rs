//! Tiered vendor search.
//!
//! Resolves a location, normalizes the free-text query against the service
//! taxonomy, ranks vendors into four strictly ordered proximity tiers, and
//! derives refinement facets from the returned page.

pub mod config;
pub mod error;
pub mod facets;
pub mod memory;
pub mod normalizer;
pub mod params;
pub mod ranker;
pub mod resolver;
pub mod service;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use config::SearchConfig;
pub use error::SearchError;
pub use facets::{derive_facets, FacetSet};
pub use memory::{MemoryCatalog, StoreOp};
pub use normalizer::{normalize, MatchSource, NormalizationResult, TaxonomyMatch};
pub use params::{BudgetSpec, LocationSpec, SearchParams, SearchRequest, SortMode};
pub use ranker::{CategoryFilter, RankFilters, TieredRanker};
pub use resolver::{LocationResolver, LocationSource, ResolvedLocation};
pub use service::{
    SearchLocation, SearchMetadata, SearchResponse, SearchService, TaxonomySummary,
};
pub use types::{Degradation, MatchTier, RankedPage, TierBreakdown, TierResult};
