//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use landmarks::FrameError;
use serde::Serialize;
use sessions::SessionError;
use thiserror::Error;
use tracing::error;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    #[error("Session not found: {0}")]
    UnknownSession(String),

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Session(SessionError::NotFound(_)) => "not_found",
            ApiError::Session(SessionError::InvalidMode { .. }) => "invalid_mode",
            ApiError::Session(SessionError::Busy(_)) => "busy",
            ApiError::Session(SessionError::InvalidConfig(_)) => "invalid_config",
            ApiError::Session(SessionError::IdCollision(_)) => "internal",
            ApiError::Frame(_) => "invalid_frame",
            ApiError::UnknownMode(_) | ApiError::UnknownSession(_) => "not_found",
            ApiError::InvalidConfig(_) => "invalid_config",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            "not_found" => StatusCode::NOT_FOUND,
            "invalid_mode" => StatusCode::CONFLICT,
            "invalid_frame" | "invalid_config" => StatusCode::BAD_REQUEST,
            "busy" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(kind = self.kind(), "{}", self);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessions::{Mode, SessionId};

    #[test]
    fn test_status_mapping() {
        let id = SessionId::new();
        let cases = [
            (ApiError::Session(SessionError::NotFound(id)), StatusCode::NOT_FOUND),
            (
                ApiError::Session(SessionError::InvalidMode {
                    session: Mode::Mood,
                    requested: Mode::Attention,
                }),
                StatusCode::CONFLICT,
            ),
            (ApiError::Session(SessionError::Busy(id)), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::Frame(FrameError::Empty), StatusCode::BAD_REQUEST),
            (ApiError::UnknownMode("sleep".into()), StatusCode::NOT_FOUND),
            (ApiError::InvalidConfig("bad".into()), StatusCode::BAD_REQUEST),
            (ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[test]
    fn test_message_passthrough() {
        let err = ApiError::Frame(FrameError::Empty);
        assert_eq!(err.kind(), "invalid_frame");
        assert_eq!(err.to_string(), "Frame is empty");
    }
}
