//! Request-level orchestration: validate, resolve and classify concurrently,
//! rank, then derive facets.

use bazaar_core::{Catalog, TaxonomyCatalog};
use serde::Serialize;

use crate::normalizer::MatchSource;
use crate::{
    derive_facets, normalize, CategoryFilter, Degradation, FacetSet, LocationResolver,
    LocationSource, NormalizationResult, ResolvedLocation, SearchConfig, SearchError,
    SearchParams, SearchRequest, TaxonomyMatch, TierBreakdown, TierResult, TieredRanker,
};

const TOP_MATCHES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub area: Option<String>,
    pub source: LocationSource,
}

impl From<&ResolvedLocation> for SearchLocation {
    fn from(location: &ResolvedLocation) -> Self {
        Self {
            latitude: location.coordinates.latitude(),
            longitude: location.coordinates.longitude(),
            city: location.city_name().map(ToOwned::to_owned),
            area: location.area_name().map(ToOwned::to_owned),
            source: location.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomySummary {
    pub best_match: Option<TaxonomyMatch>,
    pub confidence: f64,
    pub low_confidence: bool,
    pub source: MatchSource,
    pub matches: Vec<TaxonomyMatch>,
}

impl From<&NormalizationResult> for TaxonomySummary {
    fn from(result: &NormalizationResult) -> Self {
        Self {
            best_match: result.best_match.clone(),
            confidence: result.confidence,
            low_confidence: result.is_low_confidence(),
            source: result.source,
            matches: result.matches().take(TOP_MATCHES).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMetadata {
    pub search_location: SearchLocation,
    pub tier_breakdown: TierBreakdown,
    pub radius_used_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjacent_radius_km: Option<f64>,
    /// Absent when the request carried neither a query nor a service id.
    pub taxonomy: Option<TaxonomySummary>,
    pub degradations: Vec<Degradation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub results: Vec<TierResult>,
    pub available_filters: FacetSet,
    pub metadata: SearchMetadata,
}

/// Resolved service filter plus the taxonomy snapshot it was computed from.
struct Classification {
    catalog: TaxonomyCatalog,
    category: CategoryFilter,
    normalization: Option<NormalizationResult>,
}

/// Entry point for vendor search over any [`Catalog`].
#[derive(Debug, Clone)]
pub struct SearchService<S> {
    store: S,
    config: SearchConfig,
}

impl<S: Catalog> SearchService<S> {
    pub fn new(store: S, config: SearchConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run one search.
    ///
    /// An explicit `service_id` takes precedence over `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] for invalid input, unresolvable locations,
    /// unknown service ids, or a failed geo/taxonomy read. Vendor tier
    /// failures are reported in metadata instead.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let params = SearchParams::from_request(request, &self.config)?;

        let resolver = LocationResolver::new(
            &self.store,
            self.config.city_snap_radius_km,
            self.config.area_snap_radius_km,
        );
        let (location, classification) = tokio::join!(
            resolver.resolve(&params.location),
            self.classify(&params)
        );
        let location = location?;
        let Classification {
            catalog,
            category,
            normalization,
        } = classification?;

        let ranked = TieredRanker::new(&self.store, &self.config)
            .rank(Some(&location), &category, &params)
            .await?;
        let available_filters = derive_facets(&ranked.results, &catalog);

        let mut degradations = location.degradations.clone();
        if let Some(result) = normalization
            .as_ref()
            .filter(|r| r.source == MatchSource::Normalized && r.is_low_confidence())
        {
            degradations.push(Degradation::LowTaxonomyConfidence {
                confidence: result.confidence,
            });
        }
        degradations.extend(ranked.degradations);

        tracing::info!(
            total = ranked.total,
            page = ranked.page,
            source = ?location.source,
            degradations = degradations.len(),
            "search completed"
        );

        Ok(SearchResponse {
            total: ranked.total,
            page: ranked.page,
            limit: ranked.limit,
            total_pages: ranked.total_pages,
            results: ranked.results,
            available_filters,
            metadata: SearchMetadata {
                search_location: SearchLocation::from(&location),
                tier_breakdown: ranked.breakdown,
                radius_used_km: ranked.radius_used_km,
                adjacent_radius_km: ranked.adjacent_radius_km,
                taxonomy: normalization.as_ref().map(TaxonomySummary::from),
                degradations,
            },
        })
    }

    /// Normalize `query` against the current taxonomy snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the taxonomy cannot be loaded.
    pub async fn normalize_query(&self, query: &str) -> Result<NormalizationResult, SearchError> {
        let catalog = self.store.load_catalog().await?;
        Ok(normalize(&catalog, query))
    }

    async fn classify(&self, params: &SearchParams) -> Result<Classification, SearchError> {
        let catalog = self.store.load_catalog().await?;

        if let Some(id) = params.service_id.as_deref() {
            let entry = catalog
                .get(id)
                .ok_or_else(|| SearchError::UnknownService(id.to_string()))?;
            let normalization = NormalizationResult::explicit(entry);
            let category = CategoryFilter::explicit(&catalog, id);
            return Ok(Classification {
                catalog,
                category,
                normalization: Some(normalization),
            });
        }

        let Some(query) = params.query.as_deref() else {
            return Ok(Classification {
                catalog,
                category: CategoryFilter::any(),
                normalization: None,
            });
        };
        let normalization = normalize(&catalog, query);
        let category = CategoryFilter::from_normalization(&normalization, &catalog);
        Ok(Classification {
            catalog,
            category,
            normalization: Some(normalization),
        })
    }
}
