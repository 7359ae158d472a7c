pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::agents::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Agent API
        .route(
            "/api/v1/ai/resume/analyze",
            post(handlers::handle_resume_analyze),
        )
        .route(
            "/api/v1/ai/interview/questions",
            post(handlers::handle_interview_questions),
        )
        .route(
            "/api/v1/ai/interview/chat",
            post(handlers::handle_interview_chat),
        )
        .route(
            "/api/v1/ai/interview/evaluate",
            post(handlers::handle_interview_evaluate),
        )
        .route(
            "/api/v1/ai/market/analyze",
            post(handlers::handle_market_analyze),
        )
        .route("/api/v1/ai/route", post(handlers::handle_route))
        // Operations
        .route(
            "/api/v1/ai/config/refresh",
            post(handlers::handle_config_refresh),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::agents::testing::{settings, ScriptedBackend};
    use crate::config::StaticConfigSource;

    fn app(backend: Arc<ScriptedBackend>, api_key: Option<&str>) -> Router {
        let config = Arc::new(StaticConfigSource(settings(api_key)));
        build_router(AppState::new(backend, config))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_provider() {
        let response = app(ScriptedBackend::replying(vec![]), Some("k"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "gemini");
    }

    #[tokio::test]
    async fn test_resume_analyze_returns_provenance() {
        let backend = ScriptedBackend::ok(
            r#"{"name": "Jane", "skills": ["Rust"], "radarData": [{"subject": "Breadth", "value": 60}]}"#,
        );
        let (status, body) = post_json(
            app(backend, Some("k")),
            "/api/v1/ai/resume/analyze",
            r#"{"resumeText": "Jane, Rust engineer"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "live");
        assert_eq!(body["data"]["name"], "Jane");
        assert_eq!(body["data"]["radarData"][0]["value"], json!(60.0));
        assert!(body["generatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_provider_failure_is_still_200_with_fallback() {
        let (status, body) = post_json(
            app(ScriptedBackend::replying(vec![]), Some("k")),
            "/api/v1/ai/market/analyze",
            r#"{"role": "Data Engineer"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        assert!(body["data"]["salaryRange"].is_object());
    }

    #[tokio::test]
    async fn test_missing_credential_is_503() {
        let (status, body) = post_json(
            app(ScriptedBackend::replying(vec![]), None),
            "/api/v1/ai/route",
            r#"{"task": "Hire a Rust engineer"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (status, body) = post_json(
            app(ScriptedBackend::replying(vec![]), Some("k")),
            "/api/v1/ai/interview/chat",
            r#"{"history": "not a list"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_chat_wraps_reply() {
        let backend = ScriptedBackend::ok("Why did you choose Kafka?");
        let (status, body) = post_json(
            app(backend, Some("k")),
            "/api/v1/ai/interview/chat",
            r#"{"role": "SRE", "message": "We used Kafka.", "history": []}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["data"], "Why did you choose Kafka?");
        assert_eq!(body["reply"]["source"], "live");
    }

    #[tokio::test]
    async fn test_refresh_reports_provider() {
        let (status, body) = post_json(
            app(ScriptedBackend::replying(vec![]), Some("k")),
            "/api/v1/ai/config/refresh",
            "",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "gemini");
        assert_eq!(body["credentialsPresent"], true);
    }
}
