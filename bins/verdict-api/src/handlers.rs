// HTTP route handlers for the Verdict API

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;
use verdict_common::types::TestCase;
use verdict_engine::LanguageConfig;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub default: String,
    pub languages: Vec<LanguageConfig>,
}

/// POST /evaluate - Run a submission against its test cases
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    let language = state
        .dispatcher
        .languages()
        .resolve(payload.language.as_deref())
        .language
        .to_string();

    info!(
        request_id = %request_id,
        language = %language,
        test_cases = payload.test_cases.len(),
        "Evaluation requested"
    );

    let start = Instant::now();
    let result = state
        .dispatcher
        .evaluate(
            &payload.code,
            payload.language.as_deref(),
            &payload.test_cases,
            payload.function_name.as_deref().unwrap_or_default(),
            payload.timeout_ms,
        )
        .await;
    let elapsed = start.elapsed();

    metrics::record_evaluation(&language, &result, elapsed.as_secs_f64());
    info!(
        request_id = %request_id,
        passed = result.passed,
        total = result.total,
        outcome = metrics::outcome_label(&result),
        elapsed_ms = elapsed.as_millis() as u64,
        "Evaluation completed"
    );

    (StatusCode::OK, Json(result))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /languages - Configured languages and their aliases
pub async fn list_languages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let languages = state.dispatcher.languages();
    let body = LanguagesResponse {
        default: languages.resolve(None).config.name.clone(),
        languages: languages.list_languages().into_iter().cloned().collect(),
    };
    (StatusCode::OK, Json(body))
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                format!("Failed to render metrics: {}", e),
            )
        }
    }
}
