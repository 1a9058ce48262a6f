//! Session Lifecycle Routes

use ::sessions::{Mode, SessionError, SessionId, SessionSnapshot, Summary};
use attention::{SessionConfig, SessionConfigOverrides};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{parse_id, parse_mode};
use crate::error::ApiError;
use crate::AppState;

/// Body for starting a session. Empty or `null` bodies use the server defaults.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub config: Option<SessionConfigOverrides>,
}

/// Response for a started session
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: SessionId,
    pub mode: Mode,
    /// Effective thresholds
    pub config: SessionConfig,
}

/// Response for a stopped session
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub summary: Summary,
}

/// Start a session
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let mode = parse_mode(&mode)?;

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice::<Option<StartRequest>>(&body)
            .map_err(|e| ApiError::InvalidConfig(e.to_string()))?
            .unwrap_or_default()
    };

    let config = match request.config {
        Some(overrides) => overrides
            .apply(&state.session_defaults)
            .map_err(SessionError::from)?,
        None => state.session_defaults.clone(),
    };

    let session_id = state.store.create(mode, config.clone())?;
    counter!("sessions_started_total", "mode" => mode.as_str()).increment(1);

    Ok((
        StatusCode::CREATED,
        Json(StartResponse {
            session_id,
            mode,
            config,
        }),
    ))
}

/// Stop a session and return its summary
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path((mode, id)): Path<(String, String)>,
) -> Result<Json<StopResponse>, ApiError> {
    let mode = parse_mode(&mode)?;
    let id = parse_id(&id)?;

    let summary = super::run_blocking(move || Ok(state.store.stop(&id, mode)?)).await?;
    Ok(Json(StopResponse { summary }))
}

/// Live counters of a session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let id = parse_id(&id)?;
    let snapshot = super::run_blocking(move || Ok(state.store.get(&id)?)).await?;
    Ok(Json(snapshot))
}
