use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("place name must not be empty")]
    InvalidInput,
    #[error("no location found for '{0}'")]
    NotFound(String),
    #[error("geocoding service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::ServiceUnavailable(err.to_string())
    }
}
