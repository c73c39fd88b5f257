use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use bazaar_core::Catalog;
use bazaar_search::{BudgetSpec, LocationSpec, SearchRequest, SearchResponse, SortMode};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Flat query-string form of [`SearchRequest`].
#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
    pub service_id: Option<String>,
    pub city: Option<String>,
    pub area: Option<String>,
    pub area_id: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub verified: Option<bool>,
    pub rating: Option<f64>,
    pub sort: Option<SortMode>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<SearchQuery> for SearchRequest {
    fn from(query: SearchQuery) -> Self {
        SearchRequest {
            query: query.q,
            service_id: query.service_id,
            location: LocationSpec {
                city: query.city,
                area: query.area,
                area_id: query.area_id,
                latitude: query.lat,
                longitude: query.lng,
                radius_km: query.radius_km,
            },
            budget: BudgetSpec {
                min: query.budget_min,
                max: query.budget_max,
            },
            verified: query.verified,
            rating: query.rating,
            sort: query.sort.unwrap_or_default(),
            page: query.page,
            limit: query.limit,
        }
    }
}

pub(super) async fn search_get<S: Catalog>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    run(&state, req_id, SearchRequest::from(query)).await
}

pub(super) async fn search_post<S: Catalog>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    run(&state, req_id, request).await
}

async fn run<S: Catalog>(
    state: &AppState<S>,
    req_id: RequestId,
    request: SearchRequest,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let data = state
        .search
        .search(request)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
