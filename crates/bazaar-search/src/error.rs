use bazaar_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed request; rejected before any store access.
    #[error("invalid search request: {0}")]
    Validation(String),

    #[error("a city, area, area id, or coordinates are required")]
    LocationRequired,

    #[error("area not found: {area_id}")]
    AreaNotFound { area_id: i64 },

    #[error("city not found: {city}")]
    CityNotFound { city: String },

    #[error("ranking requires a resolved location")]
    NoLocationContext,

    #[error("unknown service id: {0}")]
    UnknownService(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SearchError {
    /// True for failures caused by the caller's input rather than the system.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SearchError::Store(_) | SearchError::NoLocationContext)
    }
}
