use crate::models::api::{ ErrorResponse, GenerateResponse, GENERATE_ROUTE };
use crate::relay::{ RelayError, RelayService };
use axum::{
    body::Bytes,
    routing::post,
    Router,
    Json,
    extract::State,
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use tokio::net::TcpListener;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;
use log::{ info, warn, error };

#[derive(Clone)]
struct AppState {
    relay: RelayService,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::MissingConversation => StatusCode::BAD_REQUEST,
            RelayError::MalformedRequest | RelayError::Upstream =>
                StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

pub fn router(relay: RelayService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(GENERATE_ROUTE, post(generate_handler))
        .layer(cors)
        .with_state(AppState { relay })
}

/// Serves the relay on an already bound listener until the process is
/// interrupted.
pub async fn serve(listener: TcpListener, relay: RelayService) -> std::io::Result<()> {
    let app = router(relay);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn generate_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    info!("[{}] POST {} ({} bytes)", request_id, GENERATE_ROUTE, body.len());

    match state.relay.generate(&body).await {
        Ok(text) => {
            info!("[{}] Generated {} bytes", request_id, text.len());
            (StatusCode::OK, Json(GenerateResponse { text })).into_response()
        }
        Err(e) => {
            warn!("[{}] Request failed: {}", request_id, e);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::tests::MockChatClient;
    use axum::body::{ to_bytes, Body };
    use axum::http::Request;
    use serde_json::{ json, Value };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post_json(app: Router, payload: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(GENERATE_ROUTE)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_success_returns_text_envelope() {
        let upstream = Arc::new(MockChatClient::replying("Hi there"));
        let app = router(RelayService::new(upstream));

        let (status, body) = post_json(
            app,
            r#"{"conversation":[{"role":"user","content":"Hello"}]}"#
        ).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "text": "Hi there" }));
    }

    #[tokio::test]
    async fn test_empty_conversation_is_bad_request_without_upstream_call() {
        let upstream = Arc::new(MockChatClient::replying("unused"));
        let app = router(RelayService::new(upstream.clone()));

        let (status, body) = post_json(app, r#"{"conversation":[],"extra":true}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Conversation history is required" }));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_conversation_is_bad_request() {
        let app = router(RelayService::new(Arc::new(MockChatClient::replying("unused"))));
        let (status, _) = post_json(app, r#"{"prompt":"Hello"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_internal_error() {
        let upstream = Arc::new(MockChatClient::replying("unused"));
        let app = router(RelayService::new(upstream.clone()));

        let (status, body) = post_json(app.clone(), "not json").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to generate content" }));

        let (status, body) = post_json(app, r#"{"conversation":"Hello"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to generate content" }));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_internal_error() {
        let app = router(RelayService::new(Arc::new(MockChatClient::failing())));

        let (status, body) = post_json(
            app,
            r#"{"conversation":[{"role":"user","content":"Hello"}]}"#
        ).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to generate content" }));
    }
}
