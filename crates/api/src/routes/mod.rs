//! Route handlers

pub mod frames;
pub mod sessions;

use ::sessions::{Mode, SessionId};

use crate::error::ApiError;

fn parse_mode(raw: &str) -> Result<Mode, ApiError> {
    raw.parse().map_err(|_| ApiError::UnknownMode(raw.to_string()))
}

fn parse_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse().map_err(|_| ApiError::UnknownSession(raw.to_string()))
}

/// Run blocking session work off the async executor
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}
