//! End-of-session summary

use attention::{MoodCategory, MoodSample, WarningCounters, WarningKind};
use chrono::{DateTime, Utc};
use landmarks::Emotion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::session::{Analyzer, Mode, Session, SessionId, WarningEvent};

/// Mood totals for a mood session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodSummary {
    /// Sample count per category, including unknown samples as neutral
    pub distribution: BTreeMap<MoodCategory, u64>,
    pub overall_mood: Option<MoodCategory>,
    pub emotion_distribution: BTreeMap<Emotion, u64>,
    pub dominant_emotion: Option<Emotion>,
    pub unknown_samples: u64,
    pub total_samples: u64,
    /// Most recent per-frame samples, oldest first
    pub mood_history: Vec<MoodSample>,
}

/// Session report produced when a session is stopped or reaped
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub session_id: SessionId,
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total_frames: u64,
    pub frames_with_face: u64,
    /// Per-kind counters; all zero for mood sessions
    pub warnings: BTreeMap<WarningKind, WarningCounters>,
    pub total_warnings_surfaced: u64,
    /// Most recent surfaced warnings, oldest first
    pub warning_log: Vec<WarningEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<MoodSummary>,
}

impl Summary {
    /// Summarize `session` as of `now`. Does not modify the session.
    pub fn from_session(session: &Session, now: Instant) -> Self {
        let warnings: BTreeMap<WarningKind, WarningCounters> = WarningKind::ALL
            .iter()
            .map(|&kind| {
                let counters = match session.analyzer() {
                    Analyzer::Attention(monitor) => monitor.counters(kind),
                    Analyzer::Mood { .. } => WarningCounters::default(),
                };
                (kind, counters)
            })
            .collect();

        let mood = match session.analyzer() {
            Analyzer::Attention(_) => None,
            Analyzer::Mood { tally, history, .. } => Some(MoodSummary {
                distribution: tally.by_category.clone(),
                overall_mood: tally.overall(),
                emotion_distribution: tally.by_emotion.clone(),
                dominant_emotion: tally.dominant_emotion(),
                unknown_samples: tally.unknown,
                total_samples: tally.total,
                mood_history: history.to_vec(),
            }),
        };

        let total_warnings_surfaced = warnings.values().map(|c| c.surfaced).sum();

        Self {
            session_id: session.id(),
            mode: session.mode(),
            started_at: session.started_at(),
            ended_at: session.wall_clock(now),
            duration_seconds: session.elapsed(now).as_secs_f64(),
            total_frames: session.frames_processed(),
            frames_with_face: session.frames_with_face(),
            warnings,
            total_warnings_surfaced,
            warning_log: session.warning_log(),
            mood,
        }
    }

    pub fn counters(&self, kind: WarningKind) -> WarningCounters {
        self.warnings.get(&kind).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{centered_face, observation, quick_config};
    use attention::SessionConfig;
    use std::time::Duration;

    #[test]
    fn test_attention_summary() {
        let t0 = Instant::now();
        let mut session = Session::new(SessionId::new(), Mode::Attention, quick_config(), t0);
        for i in 0..4 {
            session
                .process(Mode::Attention, &observation(None), t0 + Duration::from_millis(i * 33))
                .unwrap();
        }
        let closed = observation(Some(centered_face(1.5, None)));
        session
            .process(Mode::Attention, &closed, t0 + Duration::from_millis(200))
            .unwrap();

        let summary = Summary::from_session(&session, t0 + Duration::from_secs(3));
        assert_eq!(summary.total_frames, 5);
        assert_eq!(summary.frames_with_face, 1);
        assert!((summary.duration_seconds - 3.0).abs() < 1e-9);

        let absent = summary.counters(WarningKind::FaceAbsent);
        assert_eq!(absent.condition_frames, 4);
        assert_eq!(absent.observed, 3);
        assert_eq!(absent.surfaced, 1);
        assert_eq!(summary.counters(WarningKind::EyesClosed).condition_frames, 1);
        assert_eq!(summary.total_warnings_surfaced, 1);
        assert_eq!(summary.warning_log.len(), 1);
        assert!(summary.mood.is_none());
        assert!(summary.ended_at >= summary.started_at);
    }

    #[test]
    fn test_mood_summary() {
        let t0 = Instant::now();
        let mut session = Session::new(SessionId::new(), Mode::Mood, quick_config(), t0);
        for emotion in [Emotion::Happy, Emotion::Happy, Emotion::Sad] {
            let obs = observation(Some(centered_face(9.0, Some(emotion))));
            session.process(Mode::Mood, &obs, t0).unwrap();
        }
        session.process(Mode::Mood, &observation(None), t0).unwrap();

        let summary = Summary::from_session(&session, t0);
        let mood = summary.mood.as_ref().unwrap();
        assert_eq!(mood.total_samples, 4);
        assert_eq!(mood.unknown_samples, 1);
        assert_eq!(mood.overall_mood, Some(MoodCategory::Positive));
        assert_eq!(mood.dominant_emotion, Some(Emotion::Happy));
        assert_eq!(mood.distribution.get(&MoodCategory::Neutral), Some(&1));
        assert_eq!(summary.total_warnings_surfaced, 0);

        let emotions: Vec<_> = mood.mood_history.iter().map(|s| s.emotion).collect();
        assert_eq!(emotions, vec![Some(Emotion::Happy), Some(Emotion::Happy), Some(Emotion::Sad), None]);
        assert_eq!(mood.mood_history[2].category, MoodCategory::Negative);
        assert!(mood.mood_history[3].is_unknown());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mode"], "mood");
        assert_eq!(json["mood"]["overall_mood"], "positive");
        assert_eq!(json["warnings"]["face_absent"]["surfaced"], 0);
        assert_eq!(json["mood"]["mood_history"][0]["emotion"], "happy");
        assert_eq!(json["mood"]["mood_history"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_mood_history_keeps_latest() {
        let t0 = Instant::now();
        let config = SessionConfig {
            mood_history_capacity: 3,
            ..quick_config()
        };
        let mut session = Session::new(SessionId::new(), Mode::Mood, config, t0);
        for emotion in [Emotion::Angry, Emotion::Happy, Emotion::Sad, Emotion::Neutral, Emotion::Surprise] {
            let obs = observation(Some(centered_face(9.0, Some(emotion))));
            session.process(Mode::Mood, &obs, t0).unwrap();
        }

        let mood = Summary::from_session(&session, t0).mood.unwrap();
        assert_eq!(mood.total_samples, 5);
        let emotions: Vec<_> = mood.mood_history.iter().filter_map(|s| s.emotion).collect();
        assert_eq!(emotions, vec![Emotion::Sad, Emotion::Neutral, Emotion::Surprise]);
    }

    #[test]
    fn test_empty_session_summary() {
        let t0 = Instant::now();
        let session = Session::new(SessionId::new(), Mode::Mood, quick_config(), t0);
        let summary = Summary::from_session(&session, t0);
        assert_eq!(summary.total_frames, 0);
        let mood = summary.mood.unwrap();
        assert_eq!(mood.overall_mood, None);
        assert_eq!(mood.dominant_emotion, None);
        assert!(mood.mood_history.is_empty());
        assert_eq!(summary.duration_seconds, 0.0);
    }
}
