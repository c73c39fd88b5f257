use axum::{
    extract::{Query, State},
    Extension, Json,
};
use bazaar_core::Catalog;
use bazaar_search::NormalizationResult;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct NormalizeQuery {
    pub q: Option<String>,
}

/// Debug view of how a free-text query maps onto the taxonomy.
pub(super) async fn normalize<S: Catalog>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NormalizeQuery>,
) -> Result<Json<ApiResponse<NormalizationResult>>, ApiError> {
    let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "query parameter `q` is required",
        ));
    };

    let data = state
        .search
        .normalize_query(q)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
