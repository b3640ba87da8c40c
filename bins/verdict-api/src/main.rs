mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use verdict_common::config::EngineSettings;
use verdict_engine::{Dispatcher, LanguageConfigManager};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

pub struct AppState {
    pub dispatcher: Dispatcher,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if std::env::var("VERDICT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Verdict API booting...");

    let settings = EngineSettings::from_env();
    let config_path = std::env::var("VERDICT_LANGUAGES_CONFIG").ok().map(PathBuf::from);
    let languages = LanguageConfigManager::load_or_builtin(config_path.as_deref())
        .context("Failed to load language configuration")?;

    info!(
        languages = ?languages.list_languages().iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
        script_timeout_ms = settings.script_timeout_ms,
        max_concurrent_isolates = settings.max_concurrent_isolates,
        "Engine configured"
    );

    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(settings, languages),
    });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    // Start server
    let addr = std::env::var("VERDICT_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
