use thiserror::Error;

use crate::catalog::CatalogError;
use crate::geocode::GeocodeError;
use crate::select::NoSceneReason;

/// Request-level failures. Partial band failures are not errors; they are
/// reported inside a `SceneReport`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("no eligible scene: {}", .0.describe())]
    NoEligibleScene(NoSceneReason),
}

impl FetchError {
    /// Stable machine-readable code for API and tool responses.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::InvalidInput(_) => "invalid_input",
            FetchError::NotFound(_) => "not_found",
            FetchError::ServiceUnavailable(_) => "service_unavailable",
            FetchError::NoEligibleScene(NoSceneReason::NoCollectionMatch) => "no_collection_match",
            FetchError::NoEligibleScene(NoSceneReason::CloudCeilingExceeded) => {
                "cloud_ceiling_exceeded"
            }
        }
    }
}

impl From<GeocodeError> for FetchError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::InvalidInput => FetchError::InvalidInput(err.to_string()),
            GeocodeError::NotFound(_) => FetchError::NotFound(err.to_string()),
            GeocodeError::ServiceUnavailable(_) => FetchError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<CatalogError> for FetchError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidInput(msg) => FetchError::InvalidInput(msg),
            CatalogError::ServiceUnavailable(_) => FetchError::ServiceUnavailable(err.to_string()),
        }
    }
}
