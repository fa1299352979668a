use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::agent::{Agent, AgentError, OpenAiChat};
use crate::config::Config;
use crate::fetch::{FetchError, SceneFetcher};

use super::api::chat as chat_handlers;
use super::api::fetch as fetch_handlers;
use super::api::geocode as geocode_handlers;
use super::api_doc::ApiDoc;
use super::state::AppState;
use super::ui::handlers as ui_handlers;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to set up upstream clients: {0}")]
    Setup(#[from] FetchError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // UI routes
        .route("/", get(ui_handlers::dashboard))
        // Imagery API endpoints
        .route("/api/fetch", post(fetch_handlers::fetch_scene))
        .route("/api/geocode", get(geocode_handlers::geocode))
        // Chat API endpoints
        .route("/api/chat", post(chat_handlers::send_message))
        .route("/api/chat/{session_id}", delete(chat_handlers::end_session))
        // Static files
        .nest_service("/static", ServeDir::new("src/web/static"))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let bind_addr = config.web.bind.clone();
    let fetcher = Arc::new(SceneFetcher::new(&config)?);

    let agent = match OpenAiChat::new(&config.llm) {
        Ok(model) => Some(Arc::new(Agent::new(
            Arc::new(model),
            fetcher.clone(),
            config.llm.max_iterations,
        ))),
        Err(AgentError::MissingApiKey) => {
            log::warn!("No LLM API key configured, chat is disabled");
            None
        }
        Err(e) => {
            log::warn!("Chat model unavailable, chat is disabled: {}", e);
            None
        }
    };

    log::info!(
        "Saving scenes to {}",
        config.storage.destination_dir.display()
    );
    let app = router(AppState::new(config, fetcher, agent));

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AssistantMessage, ChatMessage, ChatModel, ToolSpec};
    use crate::test_support::{fake_upstream, test_config};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<AssistantMessage, AgentError> {
            let last = messages
                .last()
                .and_then(|m| m.content.clone())
                .unwrap_or_default();
            Ok(AssistantMessage {
                content: Some(format!("echo: {last}")),
                tool_calls: Vec::new(),
            })
        }
    }

    async fn state(dir: &std::path::Path, with_chat: bool) -> AppState {
        let base = fake_upstream().await;
        let config = test_config(&base, dir);
        let fetcher = Arc::new(SceneFetcher::new(&config).unwrap());
        let agent = with_chat.then(|| Arc::new(Agent::new(Arc::new(EchoModel), fetcher.clone(), 3)));
        AppState::new(config, fetcher, agent)
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response: Response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn dashboard_renders_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false).await;

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("35.1796"));
        assert!(html.contains("2023-06-02"));
    }

    #[tokio::test]
    async fn fetch_returns_report() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false).await;

        let request = post_json(
            "/api/fetch",
            json!({ "satellite": "sentinel-2", "place": "Busan", "date": "2023-06-02" }),
        );
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        let report = json_body(&body);
        assert_eq!(report["scene_id"], "S2_20230525");
        assert_eq!(report["location"]["address"], "Busan, South Korea");
        assert_eq!(report["bands"][0]["band"], "visual");
        assert_eq!(report["bands"][0]["status"], "saved");
    }

    #[tokio::test]
    async fn fetch_errors_map_to_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false).await;

        let cases = [
            (
                json!({ "satellite": "sentinel-2", "lat": 35.1, "lon": 129.0, "date": "2023-06-02", "cloud_ceiling": 1 }),
                StatusCode::UNPROCESSABLE_ENTITY,
                "cloud_ceiling_exceeded",
            ),
            (
                json!({ "satellite": "sentinel-1", "place": "Atlantis", "date": "2023-06-02" }),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                json!({ "satellite": "sentinel-1", "lat": 95.0, "lon": 0.0, "date": "2023-06-02" }),
                StatusCode::BAD_REQUEST,
                "invalid_input",
            ),
            (
                json!({ "satellite": "landsat", "date": "2023-06-02" }),
                StatusCode::BAD_REQUEST,
                "invalid_input",
            ),
        ];

        for (request, expected_status, expected_code) in cases {
            let (status, body) = send(&state, post_json("/api/fetch", request)).await;
            assert_eq!(status, expected_status);
            assert_eq!(json_body(&body)["error"], expected_code);
        }
    }

    #[tokio::test]
    async fn unreachable_catalog_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let base = fake_upstream().await;
        let mut config = test_config(&base, dir.path());
        config.catalog.url = "http://127.0.0.1:9/stac".to_string();
        let fetcher = Arc::new(SceneFetcher::new(&config).unwrap());
        let state = AppState::new(config, fetcher, None);

        let request = post_json(
            "/api/fetch",
            json!({ "satellite": "sentinel-1", "lat": 35.1, "lon": 129.0, "date": "2023-06-02" }),
        );
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(&body)["error"], "service_unavailable");
    }

    #[tokio::test]
    async fn geocode_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false).await;

        let request = Request::builder()
            .uri("/api/geocode?q=Busan")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["longitude"], 129.075);
    }

    #[tokio::test]
    async fn geocode_without_query_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false).await;

        for uri in ["/api/geocode", "/api/geocode?q=%20%20"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let (status, body) = send(&state, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json_body(&body)["error"], "invalid_input");
        }
    }

    #[tokio::test]
    async fn chat_without_key_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false).await;

        let (status, body) = send(&state, post_json("/api/chat", json!({ "message": "hi" }))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(&body)["error"], "chat_disabled");
    }

    #[tokio::test]
    async fn chat_sessions_keep_history_until_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), true).await;

        let (status, body) = send(&state, post_json("/api/chat", json!({ "message": "hello" }))).await;
        assert_eq!(status, StatusCode::OK);
        let first = json_body(&body);
        assert_eq!(first["reply"], "echo: hello");
        let session_id = first["session_id"].as_str().unwrap().to_string();

        let (_, body) = send(
            &state,
            post_json("/api/chat", json!({ "session_id": session_id, "message": "again" })),
        )
        .await;
        let second = json_body(&body);
        assert_eq!(second["session_id"], session_id.as_str());
        assert_eq!(second["transcript"].as_array().unwrap().len(), 4);

        let (status, _) = send(&state, post_json("/api/chat", json!({ "message": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/chat/{session_id}"))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = send(&state, delete()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&state, delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["error"], "session_not_found");
    }
}
