//! Session aggregate

use attention::{
    AttentionMonitor, AttentionState, FrameAnalysis, FrameMetrics, MoodCategory, MoodClassifier,
    MoodSample, MoodTally, SessionConfig, Streaks, Warning, WarningKind,
};
use chrono::{DateTime, Utc};
use landmarks::FrameObservation;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::SessionError;

/// Opaque session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Client mode a session was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Test-taking mood overlay
    Mood,
    /// Demo-class attention monitor
    Attention,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Mood => "mood",
            Mode::Attention => "attention",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mood" => Ok(Mode::Mood),
            "attention" => Ok(Mode::Attention),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// A surfaced warning as recorded in the session log
#[derive(Debug, Clone, Serialize)]
pub struct WarningEvent {
    pub frame_index: u64,
    /// Milliseconds since session start
    pub elapsed_ms: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub warning: Warning,
}

/// Mode-specific analyzers
#[derive(Debug, Clone)]
pub(crate) enum Analyzer {
    Attention(AttentionMonitor),
    Mood {
        classifier: MoodClassifier,
        tally: MoodTally,
        history: RingBuffer<MoodSample>,
    },
}

/// One client's monitoring run
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    mode: Mode,
    started_at: DateTime<Utc>,
    created: Instant,
    last_activity: Instant,
    frames_processed: u64,
    frames_with_face: u64,
    analyzer: Analyzer,
    warning_log: RingBuffer<WarningEvent>,
    closed: bool,
}

impl Session {
    pub fn new(id: SessionId, mode: Mode, config: SessionConfig, now: Instant) -> Self {
        let warning_log = RingBuffer::new(config.warning_log_capacity);
        let analyzer = match mode {
            Mode::Attention => Analyzer::Attention(AttentionMonitor::new(config)),
            Mode::Mood => Analyzer::Mood {
                classifier: MoodClassifier::new(config.mood_table.clone(), config.mood_window),
                tally: MoodTally::default(),
                history: RingBuffer::new(config.mood_history_capacity),
            },
        };

        Self {
            id,
            mode,
            started_at: Utc::now(),
            created: now,
            last_activity: now,
            frames_processed: 0,
            frames_with_face: 0,
            analyzer,
            warning_log,
            closed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_with_face(&self) -> u64 {
        self.frames_with_face
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Time since creation
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created)
    }

    /// Time since the last processed frame (or creation)
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Wall-clock time corresponding to `now`
    pub(crate) fn wall_clock(&self, now: Instant) -> DateTime<Utc> {
        let delta = chrono::Duration::from_std(self.elapsed(now)).unwrap_or_else(|_| chrono::Duration::zero());
        self.started_at + delta
    }

    pub(crate) fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Surfaced warnings, oldest first
    pub fn warning_log(&self) -> Vec<WarningEvent> {
        self.warning_log.to_vec()
    }

    /// Attention state, for attention sessions
    pub fn attention_state(&self) -> Option<AttentionState> {
        match &self.analyzer {
            Analyzer::Attention(monitor) => Some(monitor.state()),
            Analyzer::Mood { .. } => None,
        }
    }

    /// Mark as destroyed. Later frames are rejected.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Analyze one frame for `feature` and fold it into the session
    pub fn process(
        &mut self,
        feature: Mode,
        observation: &FrameObservation,
        now: Instant,
    ) -> Result<FrameAnalysis, SessionError> {
        if self.closed {
            return Err(SessionError::NotFound(self.id));
        }
        if feature != self.mode {
            return Err(SessionError::InvalidMode {
                session: self.mode,
                requested: feature,
            });
        }

        let metrics = FrameMetrics::compute(observation);
        self.frames_processed += 1;
        if metrics.face_present {
            self.frames_with_face += 1;
        }
        self.last_activity = now;
        let frame_index = self.frames_processed;

        let analysis = match &mut self.analyzer {
            Analyzer::Attention(monitor) => {
                let update = monitor.update(&metrics, now);
                FrameAnalysis::attention(frame_index, metrics, update)
            }
            Analyzer::Mood { classifier, tally, history } => {
                let scores = observation
                    .primary_face()
                    .filter(|_| metrics.face_present)
                    .and_then(|face| face.emotions.as_ref());
                let reading = classifier.classify(scores);
                tally.record(&reading.sample);
                history.push(reading.sample);
                FrameAnalysis::mood(frame_index, metrics, reading)
            }
        };

        if let Some(warning) = analysis.warning {
            let event = WarningEvent {
                frame_index,
                elapsed_ms: self.elapsed(now).as_millis() as u64,
                at: self.wall_clock(now),
                warning,
            };
            self.warning_log.push(event);
        }

        Ok(analysis)
    }

    /// Point-in-time view of the counters
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let (state, streaks, warnings_surfaced, smoothed_mood) = match &self.analyzer {
            Analyzer::Attention(monitor) => {
                let surfaced = WarningKind::ALL
                    .iter()
                    .map(|&k| monitor.counters(k).surfaced)
                    .sum();
                (Some(monitor.state()), Some(monitor.streaks()), surfaced, None)
            }
            Analyzer::Mood { classifier, .. } => (None, None, 0, classifier.smoothed()),
        };

        SessionSnapshot {
            session_id: self.id,
            mode: self.mode,
            started_at: self.started_at,
            elapsed_seconds: self.elapsed(now).as_secs_f64(),
            frames_processed: self.frames_processed,
            frames_with_face: self.frames_with_face,
            state,
            streaks,
            warnings_surfaced,
            smoothed_mood,
        }
    }
}

/// Live counters of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub frames_processed: u64,
    pub frames_with_face: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AttentionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaks: Option<Streaks>,
    pub warnings_surfaced: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed_mood: Option<MoodCategory>,
}
