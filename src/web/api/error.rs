use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::agent::AgentError;
use crate::fetch::FetchError;

pub enum ApiError {
    Fetch(FetchError),
    Validation(String),
    SessionNotFound,
    ChatDisabled,
    Agent(AgentError),
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::Fetch(e)
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        ApiError::Agent(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fetch(e) => {
                let status = match &e {
                    FetchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    FetchError::NotFound(_) => StatusCode::NOT_FOUND,
                    FetchError::NoEligibleScene(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    FetchError::ServiceUnavailable(_) => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    Json(ErrorResponse::with_message(e.code(), &e.to_string())),
                )
                    .into_response()
            }
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("invalid_input", &msg)),
            )
                .into_response(),
            ApiError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("session_not_found")),
            )
                .into_response(),
            ApiError::ChatDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::with_message(
                    "chat_disabled",
                    "no LLM API key is configured",
                )),
            )
                .into_response(),
            ApiError::Agent(e) => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::with_message("model_unavailable", &e.to_string())),
            )
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
