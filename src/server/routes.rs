//! Application routing
//!
//! This module defines all HTTP routes for the application.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{chat, health, index, models};
use crate::middleware::logging::{log_request, REQUEST_ID_HEADER, TRACE_ID_HEADER};
use crate::server::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/liveness", get(health::liveness));

    let api_routes = Router::new()
        .route("/models", post(models::list_models))
        .route("/chat", post(chat::chat));

    let mut router = Router::new()
        .route("/", get(index::index))
        .nest("/api", api_routes)
        .merge(health_routes);

    if state.settings.cors_enabled {
        router = router.layer(create_cors_layer());
    }

    router
        // Custom request logging with trace IDs
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Create CORS layer with permissive settings
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            axum::http::HeaderName::from_static(TRACE_ID_HEADER),
            axum::http::HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::fake::FakeUpstream;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router_with(fake: Arc<FakeUpstream>) -> Router {
        create_router(AppState::with_upstream(Settings::default(), fake))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_models_endpoint_lists_sorted() {
        let fake = Arc::new(FakeUpstream::default().with_catalogue(&["z/one", "a/two"]));

        let (status, body) = post_json(router_with(fake), "/api/models", json!({"api_key": "k"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"models": [{"id": "a/two", "name": "A/TWO"}, {"id": "z/one", "name": "Z/ONE"}]})
        );
    }

    #[tokio::test]
    async fn test_models_endpoint_missing_key_is_empty() {
        let fake = Arc::new(FakeUpstream::default().with_catalogue(&["a/x"]));

        let (status, body) = post_json(router_with(fake.clone()), "/api/models", json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"models": []}));
        assert_eq!(fake.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_models_endpoint_null_key_is_empty() {
        let fake = Arc::new(FakeUpstream::default().with_catalogue(&["a/x"]));

        let (status, body) =
            post_json(router_with(fake.clone()), "/api/models", json!({"api_key": null})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"models": []}));
        assert_eq!(fake.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_models_endpoint_reports_degraded() {
        let fake = Arc::new(FakeUpstream::default().listing_fails());

        let (status, body) = post_json(router_with(fake), "/api/models", json!({"api_key": "k"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"models": [], "degraded": true}));
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_fields_without_dispatch() {
        let fake = Arc::new(FakeUpstream::default());
        let messages = json!([{"role": "user", "content": "hi"}]);

        let cases = [
            json!({"api_key": "k", "models": [], "messages": messages}),
            json!({"api_key": "", "models": ["a/x"], "messages": messages}),
            json!({"api_key": "k", "models": ["a/x"], "messages": []}),
            json!({"models": ["a/x"], "messages": messages}),
            json!({"api_key": null, "models": ["a/x"], "messages": messages}),
            json!({"api_key": "k", "models": null, "messages": messages}),
            json!({"api_key": "k", "models": ["a/x"], "messages": null}),
            json!({}),
        ];

        for case in cases {
            let (status, body) = post_json(router_with(fake.clone()), "/api/chat", case).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"error": "Missing required fields"}));
        }

        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_returns_all_responses() {
        let fake = Arc::new(FakeUpstream::new(Duration::from_millis(5)).failing(&["bad/model"]));

        let (status, body) = post_json(
            router_with(fake),
            "/api/chat",
            json!({
                "api_key": "k",
                "models": ["good/model", "bad/model", "good/model"],
                "messages": [{"role": "user", "content": "hello"}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let responses = body["responses"].as_object().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses["good/model"], "good/model: hello");
        assert!(responses["bad/model"].as_str().unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_chat_all_failed_is_still_ok() {
        let fake = Arc::new(FakeUpstream::default().failing(&["a", "b"]));

        let (status, body) = post_json(
            router_with(fake),
            "/api/chat",
            json!({"api_key": "k", "models": ["a", "b"], "messages": [{"role": "user", "content": "?"}]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["responses"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = router_with(Arc::new(FakeUpstream::default()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_index_and_trace_header() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = router_with(Arc::new(FakeUpstream::default()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Ask Em All"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = router_with(Arc::new(FakeUpstream::default()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["upstream"], "https://openrouter.ai/api/v1");
        assert!(body["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn test_liveness() {
        let request = Request::builder().uri("/liveness").body(Body::empty()).unwrap();

        let response = router_with(Arc::new(FakeUpstream::default()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
