//! Session Layer
//!
//! Owns monitoring sessions from start to summary:
//! - `Session`: per-session counters and analyzers
//! - `SessionStore`: concurrent registry with per-session exclusion
//! - `Summary`: end-of-session report

mod session;
mod store;
mod summary;

pub use session::{Mode, Session, SessionId, SessionSnapshot, WarningEvent};
pub use store::{ContentionPolicy, SessionStore};
pub use summary::{MoodSummary, Summary};

use attention::AttentionError;
use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session is a {session} session, {requested} processing is not enabled")]
    InvalidMode { session: Mode, requested: Mode },

    #[error("Session {0} is busy processing another frame")]
    Busy(SessionId),

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(#[from] AttentionError),

    #[error("Session identifier collision: {0}")]
    IdCollision(SessionId),
}
