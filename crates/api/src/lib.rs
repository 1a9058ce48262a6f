//! Classroom Monitor API Server
//!
//! HTTP transport for mood and attention sessions: start, per-frame
//! processing, stop with summary, plus health and metrics.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use landmarks::{LandmarkExtractor, UnavailableExtractor};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use sessions::SessionStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
mod routes;

pub use crate::config::{LogFormat, ServerConfig};
pub use crate::error::ApiError;

use attention::SessionConfig;

/// Largest accepted request body (encoded frames)
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Application state shared across handlers
pub struct AppState {
    /// Live sessions
    pub store: SessionStore,
    /// Landmark model used for uploaded frames
    pub extractor: Arc<dyn LandmarkExtractor>,
    /// Thresholds for sessions started without overrides
    pub session_defaults: SessionConfig,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus exporter, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: &ServerConfig, extractor: Arc<dyn LandmarkExtractor>) -> Self {
        Self {
            store: SessionStore::new(config.contention),
            extractor,
            session_defaults: config.session_defaults.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
    /// Landmark backend for uploaded frames
    pub extractor: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/sessions/:id", get(routes::sessions::get_session))
        .route("/api/v1/:mode/sessions", post(routes::sessions::start_session))
        .route("/api/v1/:mode/sessions/:id/frames", post(routes::frames::process_frame))
        .route(
            "/api/v1/:mode/sessions/:id/observations",
            post(routes::frames::process_observation),
        )
        .route("/api/v1/:mode/sessions/:id/stop", post(routes::sessions::stop_session))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.store.len(),
        extractor: state.extractor.name().to_string(),
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(config: &ServerConfig) {
    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match config.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .expect("Failed to set tracing subscriber");
}

/// Periodically stop sessions that stopped sending frames
pub fn spawn_reaper(state: Arc<AppState>, max_idle: Duration, every: Duration) -> JoinHandle<()> {
    info!(?max_idle, ?every, "Idle session reaper started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reaped = state.store.reap_idle(max_idle);
            if !reaped.is_empty() {
                info!(
                    reaped = reaped.len(),
                    active = state.store.len(),
                    "Idle sessions stopped"
                );
            }
        }
    })
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let extractor: Arc<dyn LandmarkExtractor> = Arc::new(UnavailableExtractor::new());
    let mut state = AppState::new(&config, extractor);
    if config.metrics_enabled {
        state = state.with_metrics(PrometheusBuilder::new().install_recorder()?);
    }
    let state = Arc::new(state);

    if let Some(max_idle) = config.idle_timeout() {
        spawn_reaper(Arc::clone(&state), max_idle, config.reap_interval());
    }

    let app = create_router(state);

    info!("Starting API server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
