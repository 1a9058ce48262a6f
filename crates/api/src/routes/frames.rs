//! Frame Processing Routes

use ::sessions::{Mode, SessionId};
use attention::FrameAnalysis;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use landmarks::{FrameError, FrameObservation, VideoFrame};
use metrics::counter;
use std::sync::Arc;

use super::{parse_id, parse_mode, run_blocking};
use crate::error::ApiError;
use crate::AppState;

/// Analyze an uploaded camera frame (PNG or JPEG bytes)
pub async fn process_frame(
    State(state): State<Arc<AppState>>,
    Path((mode, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<FrameAnalysis>, ApiError> {
    let mode = parse_mode(&mode)?;
    let id = parse_id(&id)?;

    let extractor = Arc::clone(&state.extractor);
    let observation = run_blocking(move || {
        let frame = VideoFrame::decode(&body)?;
        Ok(extractor.observe(&frame))
    })
    .await?;

    analyze(state, id, mode, observation).await
}

/// Analyze landmarks already extracted by the client
pub async fn process_observation(
    State(state): State<Arc<AppState>>,
    Path((mode, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<FrameAnalysis>, ApiError> {
    let mode = parse_mode(&mode)?;
    let id = parse_id(&id)?;

    let observation: FrameObservation =
        serde_json::from_slice(&body).map_err(|e| FrameError::Decode(e.to_string()))?;
    if observation.width == 0 || observation.height == 0 {
        return Err(FrameError::Dimensions {
            width: observation.width,
            height: observation.height,
        }
        .into());
    }

    analyze(state, id, mode, observation).await
}

async fn analyze(
    state: Arc<AppState>,
    id: SessionId,
    mode: Mode,
    observation: FrameObservation,
) -> Result<Json<FrameAnalysis>, ApiError> {
    let analysis = run_blocking(move || Ok(state.store.process(&id, mode, &observation)?)).await?;

    counter!("frames_processed_total", "mode" => mode.as_str()).increment(1);
    if let Some(warning) = analysis.warning {
        counter!("warnings_surfaced_total", "kind" => warning.kind.as_str()).increment(1);
    }

    Ok(Json(analysis))
}
