use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::agent::{AgentEvent, TranscriptEntry};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Omit to start a new session.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub reply: String,
    pub events: Vec<AgentEvent>,
    pub transcript: Vec<TranscriptEntry>,
}

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply and progress events", body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 502, description = "Language model unavailable", body = ErrorResponse),
        (status = 503, description = "Chat is not configured", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let agent = state.agent.clone().ok_or(ApiError::ChatDisabled)?;
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let session = state.session(session_id).await;
    // one turn at a time per session
    let mut conversation = session.lock().await;
    let turn = agent.respond(&mut conversation, message).await?;

    Ok(Json(ChatResponse {
        session_id,
        reply: turn.reply,
        events: turn.events,
        transcript: conversation.transcript(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/chat/{session_id}",
    tag = "chat",
    params(("session_id" = Uuid, Path, description = "Session to discard")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.end_session(&session_id).await {
        log::info!("Chat session {} discarded", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound)
    }
}
