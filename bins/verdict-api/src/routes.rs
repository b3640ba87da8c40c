use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/evaluate", post(handlers::evaluate))
        .route("/health", get(handlers::health_check))
        .route("/languages", get(handlers::list_languages))
        .route("/metrics", get(handlers::metrics_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`
    use verdict_common::config::EngineSettings;
    use verdict_engine::{Dispatcher, LanguageConfigManager, RunResult};

    fn app() -> Router {
        let state = Arc::new(AppState {
            dispatcher: Dispatcher::new(EngineSettings::default(), LanguageConfigManager::builtin()),
        });
        routes().with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_languages() {
        let response = app()
            .oneshot(Request::builder().uri("/languages").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["default"], "javascript");
        assert_eq!(json["languages"][1]["name"], "python");
        assert_eq!(json["languages"][1]["comparison"], "quote_stripped");
    }

    #[tokio::test]
    async fn test_evaluate_javascript() {
        let payload = serde_json::json!({
            "code": "function add(a, b) { return a + b; }",
            "language": "js",
            "function_name": "add",
            "test_cases": [
                { "input": "2, 3", "expected": "5" },
                { "input": "2, 3", "expected": "6", "description": "wrong on purpose" }
            ]
        });

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: RunResult = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.results[1].description, "wrong on purpose");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_evaluate_rejects_malformed_body() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let response = app()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
