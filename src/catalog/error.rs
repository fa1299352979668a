use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid search input: {0}")]
    InvalidInput(String),
    #[error("catalog service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::ServiceUnavailable(err.to_string())
    }
}
