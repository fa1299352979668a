use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::geocode::Location;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct GeocodeQuery {
    /// Place name or address
    pub q: String,
}

#[utoipa::path(
    get,
    path = "/api/geocode",
    tag = "imagery",
    params(GeocodeQuery),
    responses(
        (status = 200, description = "Resolved coordinates", body = Location),
        (status = 400, description = "Missing or blank query", body = ErrorResponse),
        (status = 404, description = "No match", body = ErrorResponse),
        (status = 502, description = "Geocoder unavailable", body = ErrorResponse)
    )
)]
pub async fn geocode(
    State(state): State<AppState>,
    query: Result<Query<GeocodeQuery>, QueryRejection>,
) -> ApiResult<Json<Location>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(Json(state.fetcher.geocode(&query.q).await?))
}
