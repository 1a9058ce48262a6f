//! Session thresholds

use serde::{Deserialize, Serialize};

use crate::mood::MoodTable;
use crate::state::WarningKind;
use crate::AttentionError;

/// Consecutive frames a condition must hold before it becomes a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakThresholds {
    /// No face in frame (~2s at 30fps)
    pub face_absent: u32,
    /// Face off-center or head tilted (~1.5s at 30fps)
    pub looking_away: u32,
    /// Eye aspect ratio under the cutoff
    pub eyes_closed: u32,
}

impl Default for StreakThresholds {
    fn default() -> Self {
        Self {
            face_absent: 60,
            looking_away: 45,
            eyes_closed: 3,
        }
    }
}

impl StreakThresholds {
    pub fn get(&self, kind: WarningKind) -> u32 {
        match kind {
            WarningKind::FaceAbsent => self.face_absent,
            WarningKind::LookingAway => self.looking_away,
            WarningKind::EyesClosed => self.eyes_closed,
        }
    }
}

/// Per-session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// EAR below this counts as eyes closed
    pub ear_threshold: f32,

    /// Max normalized face-center offset on either axis (0-1)
    pub offset_bound: f32,

    /// Max head tilt (degrees from horizontal)
    pub tilt_bound: f32,

    /// Gap that must be exceeded between two surfaced warnings of one kind (milliseconds)
    pub cooldown_ms: u64,

    pub streak_thresholds: StreakThresholds,

    /// Mood samples used for the smoothed mood
    pub mood_window: usize,

    /// Frames of eye-closure history used for PERCLOS
    pub perclos_window: usize,

    /// PERCLOS above this reports the learner as sleepy
    pub sleepy_perclos: f32,

    /// Surfaced warnings retained for the session summary
    pub warning_log_capacity: usize,

    /// Per-frame mood samples retained for the session summary
    pub mood_history_capacity: usize,

    /// Emotion to mood category mapping
    pub mood_table: MoodTable,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            offset_bound: 0.3,
            tilt_bound: 20.0,
            cooldown_ms: 5000,
            streak_thresholds: StreakThresholds::default(),
            mood_window: 10,
            perclos_window: 30,
            sleepy_perclos: 0.5,
            warning_log_capacity: 256,
            mood_history_capacity: 1800,
            mood_table: MoodTable::default(),
        }
    }
}

impl SessionConfig {
    /// Create strict config (warns sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.28,
            offset_bound: 0.2,
            tilt_bound: 15.0,
            cooldown_ms: 3000,
            streak_thresholds: StreakThresholds {
                face_absent: 30,
                looking_away: 20,
                eyes_closed: 2,
            },
            ..Default::default()
        }
    }

    /// Create lenient config (warns later)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.2,
            offset_bound: 0.45,
            tilt_bound: 30.0,
            cooldown_ms: 10_000,
            streak_thresholds: StreakThresholds {
                face_absent: 90,
                looking_away: 75,
                eyes_closed: 6,
            },
            ..Default::default()
        }
    }

    /// Reject thresholds the state machine cannot work with
    pub fn validate(&self) -> Result<(), AttentionError> {
        let positive = [
            ("ear_threshold", self.ear_threshold),
            ("offset_bound", self.offset_bound),
            ("tilt_bound", self.tilt_bound),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AttentionError::Config(format!(
                    "{field} must be a positive number, got {value}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.sleepy_perclos) {
            return Err(AttentionError::Config(format!(
                "sleepy_perclos must be within [0, 1], got {}",
                self.sleepy_perclos
            )));
        }

        for kind in WarningKind::ALL {
            if self.streak_thresholds.get(kind) == 0 {
                return Err(AttentionError::Config(format!(
                    "streak threshold for {kind} must be at least 1"
                )));
            }
        }

        let windows = [
            ("mood_window", self.mood_window),
            ("perclos_window", self.perclos_window),
            ("warning_log_capacity", self.warning_log_capacity),
            ("mood_history_capacity", self.mood_history_capacity),
        ];
        for (field, value) in windows {
            if value == 0 {
                return Err(AttentionError::Config(format!("{field} must be at least 1")));
            }
        }

        Ok(())
    }
}

/// Partial streak thresholds supplied by a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakOverrides {
    pub face_absent: Option<u32>,
    pub looking_away: Option<u32>,
    pub eyes_closed: Option<u32>,
}

/// Client-supplied tuning applied on top of the server defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfigOverrides {
    pub ear_threshold: Option<f32>,
    pub offset_bound: Option<f32>,
    pub tilt_bound: Option<f32>,
    pub cooldown_ms: Option<u64>,
    pub streak_thresholds: Option<StreakOverrides>,
}

impl SessionConfigOverrides {
    /// Overlay onto `base` and validate the result
    pub fn apply(&self, base: &SessionConfig) -> Result<SessionConfig, AttentionError> {
        let mut config = base.clone();
        if let Some(v) = self.ear_threshold {
            config.ear_threshold = v;
        }
        if let Some(v) = self.offset_bound {
            config.offset_bound = v;
        }
        if let Some(v) = self.tilt_bound {
            config.tilt_bound = v;
        }
        if let Some(v) = self.cooldown_ms {
            config.cooldown_ms = v;
        }
        if let Some(streaks) = self.streak_thresholds {
            let t = &mut config.streak_thresholds;
            t.face_absent = streaks.face_absent.unwrap_or(t.face_absent);
            t.looking_away = streaks.looking_away.unwrap_or(t.looking_away);
            t.eyes_closed = streaks.eyes_closed.unwrap_or(t.eyes_closed);
        }
        config.validate()?;
        Ok(config)
    }
}
