//! Attention & Mood Analysis
//!
//! Real-time learner state from facial landmarks:
//! - Eye aspect ratio (eyes closed / drowsiness)
//! - Face position and head tilt (looking away)
//! - Face presence
//! - Mood category from emotion scores, smoothed over recent frames

pub mod analysis;
pub mod config;
pub mod geometry;
pub mod mood;
pub mod state;

pub use analysis::FrameAnalysis;
pub use config::{SessionConfig, SessionConfigOverrides, StreakOverrides, StreakThresholds};
pub use geometry::{FaceOffset, FrameMetrics};
pub use mood::{MoodCategory, MoodClassifier, MoodReading, MoodSample, MoodTable, MoodTally};
pub use state::{
    AttentionMonitor, AttentionState, AttentionUpdate, DrowsinessLevel, Streaks, Warning,
    WarningCounters, WarningKind,
};

use thiserror::Error;

/// Attention analysis error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttentionError {
    #[error("Configuration error: {0}")]
    Config(String),
}
