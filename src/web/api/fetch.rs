use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::fetch::{FetchRequest, SceneReport};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[utoipa::path(
    post,
    path = "/api/fetch",
    tag = "imagery",
    request_body = FetchRequest,
    responses(
        (status = 200, description = "Scene selected; per-band results inside", body = SceneReport),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Place could not be geocoded", body = ErrorResponse),
        (status = 422, description = "No scene satisfies the constraints", body = ErrorResponse),
        (status = 502, description = "Geocoder or catalog unavailable", body = ErrorResponse)
    )
)]
pub async fn fetch_scene(
    State(state): State<AppState>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> ApiResult<Json<SceneReport>> {
    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let report = state.fetcher.fetch(&request).await?;
    log::info!(
        "Fetched {}: {} of {} band(s) saved",
        report.scene_id,
        report.saved_count(),
        report.bands.len()
    );
    Ok(Json(report))
}
