use utoipa::OpenApi;

use super::api::chat::{ChatRequest, ChatResponse};
use super::api::error::ErrorResponse;
use super::api::geocode::GeocodeQuery;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::fetch::fetch_scene,
        super::api::geocode::geocode,
        super::api::chat::send_message,
        super::api::chat::end_session,
    ),
    components(
        schemas(
            ErrorResponse,
            GeocodeQuery,
            ChatRequest,
            ChatResponse,
            crate::fetch::FetchRequest,
            crate::fetch::SceneReport,
            crate::geocode::Location,
            crate::catalog::Satellite,
            crate::catalog::BoundingBox,
            crate::download::BandOutcome,
            crate::download::BandResult,
            crate::download::BandFailure,
            crate::download::SavedBand,
            crate::agent::AgentEvent,
            crate::agent::TranscriptEntry,
        )
    ),
    info(
        title = "Scene-O-Mat API",
        description = "Find and download the Sentinel scene closest to a place and date",
        version = "0.1.0"
    ),
    tags(
        (name = "imagery", description = "Geocoding and direct scene downloads"),
        (name = "chat", description = "Conversational assistant")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for path in ["/api/fetch", "/api/geocode", "/api/chat", "/api/chat/{session_id}"] {
            assert!(paths.iter().any(|p| p == path), "{path} missing");
        }
    }
}
