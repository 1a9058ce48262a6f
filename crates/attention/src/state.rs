//! Attention / drowsiness state machine

use alerting::{CooldownConfig, CooldownGate, Severity};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::geometry::FrameMetrics;

/// Attention state after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionState {
    #[default]
    Attentive,
    EyesClosedWarning,
    LookingAwayWarning,
    FaceAbsentWarning,
}

/// Drowsiness level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrowsinessLevel {
    #[default]
    Awake,
    /// Eyes closed for at least the eyes-closed streak threshold
    Drowsy,
    /// Eyes closed in most of the recent frames (PERCLOS)
    Sleepy,
}

/// Conditions that can raise a warning, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FaceAbsent,
    LookingAway,
    EyesClosed,
}

impl WarningKind {
    pub const ALL: [WarningKind; 3] = [
        WarningKind::FaceAbsent,
        WarningKind::LookingAway,
        WarningKind::EyesClosed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::FaceAbsent => "face_absent",
            WarningKind::LookingAway => "looking_away",
            WarningKind::EyesClosed => "eyes_closed",
        }
    }

    /// State entered when this condition reaches its threshold
    pub fn state(&self) -> AttentionState {
        match self {
            WarningKind::FaceAbsent => AttentionState::FaceAbsentWarning,
            WarningKind::LookingAway => AttentionState::LookingAwayWarning,
            WarningKind::EyesClosed => AttentionState::EyesClosedWarning,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            WarningKind::FaceAbsent => Severity::High,
            WarningKind::LookingAway => Severity::Medium,
            WarningKind::EyesClosed => Severity::High,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WarningKind::FaceAbsent => "You are not visible on screen. Please return to your seat.",
            WarningKind::LookingAway => "Please focus on the screen and pay attention to the class.",
            WarningKind::EyesClosed => "Your eyes have been closed for a while. Please stay awake.",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning delivered to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: &'static str,
}

impl Warning {
    pub fn new(kind: WarningKind) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: kind.message(),
        }
    }
}

/// Consecutive frames each condition has held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub face_absent: u32,
    pub looking_away: u32,
    pub eyes_closed: u32,
}

impl Streaks {
    pub fn get(&self, kind: WarningKind) -> u32 {
        match kind {
            WarningKind::FaceAbsent => self.face_absent,
            WarningKind::LookingAway => self.looking_away,
            WarningKind::EyesClosed => self.eyes_closed,
        }
    }

    /// Extend the matched condition's streak and zero every other one
    fn advance(&mut self, matched: Option<WarningKind>) {
        let bump = |kind: WarningKind, streak: u32| {
            if matched == Some(kind) {
                streak.saturating_add(1)
            } else {
                0
            }
        };
        self.face_absent = bump(WarningKind::FaceAbsent, self.face_absent);
        self.looking_away = bump(WarningKind::LookingAway, self.looking_away);
        self.eyes_closed = bump(WarningKind::EyesClosed, self.eyes_closed);
    }
}

/// Cumulative counts for one warning kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarningCounters {
    /// Frames where the condition held at all (streak >= 1)
    pub condition_frames: u64,
    /// Frames where the condition held at or above its streak threshold
    pub observed: u64,
    /// Warnings actually delivered after the cooldown
    pub surfaced: u64,
}

/// Result of feeding one frame to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttentionUpdate {
    pub state: AttentionState,
    /// Condition matched this frame, if any
    pub condition: Option<WarningKind>,
    pub warning: Option<Warning>,
    pub drowsiness: DrowsinessLevel,
    /// Fraction of recent frames with eyes closed, once enough history exists
    pub perclos: Option<f32>,
}

/// Per-session attention state machine.
///
/// Only `update` changes state, one call per processed frame.
#[derive(Debug, Clone)]
pub struct AttentionMonitor {
    config: SessionConfig,
    state: AttentionState,
    streaks: Streaks,
    counters: [WarningCounters; 3],
    gate: CooldownGate<WarningKind>,
    /// Eye-closed flags for recent frames with a defined EAR
    closure_history: RingBuffer<bool>,
}

impl AttentionMonitor {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            gate: CooldownGate::new(CooldownConfig {
                cooldown_ms: config.cooldown_ms,
            }),
            closure_history: RingBuffer::new(config.perclos_window),
            state: AttentionState::Attentive,
            streaks: Streaks::default(),
            counters: [WarningCounters::default(); 3],
            config,
        }
    }

    pub fn state(&self) -> AttentionState {
        self.state
    }

    pub fn streaks(&self) -> Streaks {
        self.streaks
    }

    pub fn counters(&self, kind: WarningKind) -> WarningCounters {
        self.counters[kind.index()]
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// First matching condition in precedence order
    pub fn classify(&self, metrics: &FrameMetrics) -> Option<WarningKind> {
        if !metrics.face_present {
            Some(WarningKind::FaceAbsent)
        } else if metrics.is_looking_away(&self.config) {
            Some(WarningKind::LookingAway)
        } else if metrics.is_eyes_closed(&self.config) {
            Some(WarningKind::EyesClosed)
        } else {
            None
        }
    }

    /// Apply one frame observed at `now`
    pub fn update(&mut self, metrics: &FrameMetrics, now: Instant) -> AttentionUpdate {
        let condition = self.classify(metrics);
        self.streaks.advance(condition);

        if let Some(ear) = metrics.ear {
            self.closure_history.push(ear < self.config.ear_threshold);
        }

        let mut warning = None;
        let next_state = match condition {
            Some(kind) => {
                let threshold = self.config.streak_thresholds.get(kind);
                let counters = &mut self.counters[kind.index()];
                counters.condition_frames += 1;

                if self.streaks.get(kind) >= threshold {
                    counters.observed += 1;
                    if self.gate.try_fire(kind, now) {
                        counters.surfaced += 1;
                        warn!(kind = %kind, streak = self.streaks.get(kind), "Warning surfaced");
                        warning = Some(Warning::new(kind));
                    }
                    kind.state()
                } else {
                    debug!(kind = %kind, streak = self.streaks.get(kind), threshold, "Condition building");
                    // a short face dropout keeps whatever warning was showing
                    if kind == WarningKind::FaceAbsent {
                        self.state
                    } else {
                        AttentionState::Attentive
                    }
                }
            }
            None => AttentionState::Attentive,
        };

        if next_state != self.state {
            info!(from = ?self.state, to = ?next_state, "Attention state changed");
            self.state = next_state;
        }

        let perclos = self.perclos();
        AttentionUpdate {
            state: self.state,
            condition,
            warning,
            drowsiness: self.drowsiness(perclos),
            perclos,
        }
    }

    /// PERCLOS over the closure history, `None` until half the window is filled
    pub fn perclos(&self) -> Option<f32> {
        let min_samples = (self.closure_history.capacity() / 2).max(1);
        if self.closure_history.len() < min_samples {
            return None;
        }
        let closed = self.closure_history.iter().filter(|&&c| c).count();
        Some(closed as f32 / self.closure_history.len() as f32)
    }

    fn drowsiness(&self, perclos: Option<f32>) -> DrowsinessLevel {
        if perclos.is_some_and(|p| p > self.config.sleepy_perclos) {
            DrowsinessLevel::Sleepy
        } else if self.streaks.eyes_closed >= self.config.streak_thresholds.eyes_closed {
            DrowsinessLevel::Drowsy
        } else {
            DrowsinessLevel::Awake
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreakThresholds;
    use crate::geometry::FaceOffset;
    use proptest::prelude::*;
    use std::time::Duration;

    fn forward(ear: f32) -> FrameMetrics {
        FrameMetrics {
            face_present: true,
            left_ear: Some(ear),
            right_ear: Some(ear),
            ear: Some(ear),
            offset: FaceOffset::default(),
            head_tilt_deg: Some(0.0),
        }
    }

    fn looking_away() -> FrameMetrics {
        FrameMetrics {
            offset: FaceOffset { x: 0.8, y: 0.0 },
            ..forward(0.3)
        }
    }

    fn config(eyes_closed: u32) -> SessionConfig {
        SessionConfig {
            ear_threshold: 0.15,
            cooldown_ms: 1000,
            streak_thresholds: StreakThresholds {
                face_absent: 3,
                looking_away: 3,
                eyes_closed,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_eyes_closed_sequence() {
        let mut monitor = AttentionMonitor::new(config(3));
        let t0 = Instant::now();
        let ears = [0.30, 0.30, 0.30, 0.10, 0.10, 0.10, 0.10, 0.30];
        let states: Vec<_> = ears
            .iter()
            .enumerate()
            .map(|(i, &ear)| monitor.update(&forward(ear), t0 + Duration::from_millis(33 * i as u64)).state)
            .collect();

        use AttentionState::*;
        assert_eq!(
            states,
            vec![Attentive, Attentive, Attentive, Attentive, Attentive, EyesClosedWarning, EyesClosedWarning, Attentive]
        );

        let counters = monitor.counters(WarningKind::EyesClosed);
        assert_eq!(counters.condition_frames, 4);
        assert_eq!(counters.observed, 2);
        // second observed frame is within the cooldown
        assert_eq!(counters.surfaced, 1);
        assert_eq!(monitor.streaks().eyes_closed, 0);
    }

    #[test]
    fn test_warning_emitted_once_at_threshold() {
        let mut monitor = AttentionMonitor::new(config(2));
        let t0 = Instant::now();

        assert!(monitor.update(&forward(0.1), t0).warning.is_none());
        let update = monitor.update(&forward(0.1), t0);
        assert_eq!(update.warning, Some(Warning::new(WarningKind::EyesClosed)));
        assert_eq!(update.drowsiness, DrowsinessLevel::Drowsy);
        assert!(monitor.update(&forward(0.1), t0).warning.is_none());
    }

    #[test]
    fn test_cooldown_resurfaces() {
        let mut monitor = AttentionMonitor::new(config(3));
        let t0 = Instant::now();
        let absent = FrameMetrics::absent();

        let mut surfaced_at = Vec::new();
        for i in 0..40u64 {
            let at = t0 + Duration::from_millis(100 * i);
            if monitor.update(&absent, at).warning.is_some() {
                surfaced_at.push(i);
            }
        }
        // threshold reached at frame index 2, then once more than 1000ms has passed
        assert_eq!(surfaced_at, vec![2, 13, 24, 35]);
        let counters = monitor.counters(WarningKind::FaceAbsent);
        assert_eq!(counters.observed, 38);
        assert_eq!(counters.surfaced, 4);
        assert_eq!(monitor.state(), AttentionState::FaceAbsentWarning);
    }

    #[test]
    fn test_precedence_face_absent_over_everything() {
        let monitor = AttentionMonitor::new(config(3));
        assert_eq!(monitor.classify(&FrameMetrics::absent()), Some(WarningKind::FaceAbsent));

        let away_and_closed = FrameMetrics {
            offset: FaceOffset { x: 0.0, y: -0.9 },
            ..forward(0.05)
        };
        assert_eq!(monitor.classify(&away_and_closed), Some(WarningKind::LookingAway));

        let tilted = FrameMetrics {
            head_tilt_deg: Some(-35.0),
            ..forward(0.3)
        };
        assert_eq!(monitor.classify(&tilted), Some(WarningKind::LookingAway));
        assert_eq!(monitor.classify(&forward(0.05)), Some(WarningKind::EyesClosed));
        assert_eq!(monitor.classify(&forward(0.3)), None);
    }

    #[test]
    fn test_switching_condition_resets_streaks() {
        let mut monitor = AttentionMonitor::new(config(3));
        let t0 = Instant::now();

        monitor.update(&looking_away(), t0);
        monitor.update(&looking_away(), t0);
        monitor.update(&looking_away(), t0);
        assert_eq!(monitor.state(), AttentionState::LookingAwayWarning);

        let update = monitor.update(&FrameMetrics::absent(), t0);
        assert_eq!(update.state, AttentionState::LookingAwayWarning);
        assert!(update.warning.is_none());
        assert_eq!(monitor.streaks(), Streaks { face_absent: 1, looking_away: 0, eyes_closed: 0 });
        // the earlier warning stays counted
        assert_eq!(monitor.counters(WarningKind::LookingAway).surfaced, 1);

        let update = monitor.update(&forward(0.05), t0);
        assert_eq!(update.state, AttentionState::Attentive);
        assert_eq!(monitor.streaks(), Streaks { face_absent: 0, looking_away: 0, eyes_closed: 1 });
    }

    #[test]
    fn test_face_absent_below_threshold_keeps_state() {
        let mut monitor = AttentionMonitor::new(SessionConfig {
            streak_thresholds: StreakThresholds {
                face_absent: 3,
                looking_away: 2,
                eyes_closed: 3,
            },
            ..config(3)
        });
        let t0 = Instant::now();

        monitor.update(&looking_away(), t0);
        assert_eq!(monitor.update(&looking_away(), t0).state, AttentionState::LookingAwayWarning);

        let update = monitor.update(&FrameMetrics::absent(), t0);
        assert_eq!(update.state, AttentionState::LookingAwayWarning);
        assert_eq!(update.condition, Some(WarningKind::FaceAbsent));
        assert!(update.warning.is_none());
        assert_eq!(monitor.update(&FrameMetrics::absent(), t0).state, AttentionState::LookingAwayWarning);

        let update = monitor.update(&FrameMetrics::absent(), t0);
        assert_eq!(update.state, AttentionState::FaceAbsentWarning);
        assert_eq!(update.warning, Some(Warning::new(WarningKind::FaceAbsent)));
        assert_eq!(monitor.counters(WarningKind::FaceAbsent).condition_frames, 3);
        assert_eq!(monitor.counters(WarningKind::FaceAbsent).observed, 1);
    }

    #[test]
    fn test_face_absent_from_attentive_stays_attentive() {
        let mut monitor = AttentionMonitor::new(config(3));
        let t0 = Instant::now();
        monitor.update(&forward(0.3), t0);
        for _ in 0..2 {
            assert_eq!(monitor.update(&FrameMetrics::absent(), t0).state, AttentionState::Attentive);
        }
    }

    #[test]
    fn test_undefined_ear_is_not_closed() {
        let mut monitor = AttentionMonitor::new(config(1));
        let metrics = FrameMetrics {
            ear: None,
            left_ear: None,
            right_ear: None,
            ..forward(0.3)
        };
        let update = monitor.update(&metrics, Instant::now());
        assert_eq!(update.state, AttentionState::Attentive);
        assert_eq!(update.condition, None);
    }

    #[test]
    fn test_perclos_sleepy() {
        let mut monitor = AttentionMonitor::new(SessionConfig {
            perclos_window: 10,
            ..config(100)
        });
        let t0 = Instant::now();

        for _ in 0..4 {
            assert_eq!(monitor.update(&forward(0.1), t0).perclos, None);
        }
        let update = monitor.update(&forward(0.1), t0);
        assert_eq!(update.perclos, Some(1.0));
        assert_eq!(update.drowsiness, DrowsinessLevel::Sleepy);

        for _ in 0..10 {
            monitor.update(&forward(0.3), t0);
        }
        assert_eq!(monitor.perclos(), Some(0.0));
    }

    fn metrics_strategy() -> impl Strategy<Value = FrameMetrics> {
        prop_oneof![
            Just(FrameMetrics::absent()),
            Just(looking_away()),
            (0.0f32..0.4).prop_map(forward),
        ]
    }

    proptest! {
        #[test]
        fn counters_and_streaks_stay_consistent(
            frames in prop::collection::vec((metrics_strategy(), 0u64..400), 1..300),
            eyes_closed in 1u32..5,
        ) {
            let mut monitor = AttentionMonitor::new(config(eyes_closed));
            let t0 = Instant::now();
            let mut elapsed = 0;
            let mut expected = Streaks::default();

            for (metrics, step) in frames {
                elapsed += step;
                let before = WarningKind::ALL.map(|k| monitor.counters(k));
                let state_before = monitor.state();
                let update = monitor.update(&metrics, t0 + Duration::from_millis(elapsed));

                // reference streaks, recomputed independently
                let matched = monitor.classify(&metrics);
                for kind in WarningKind::ALL {
                    let s = match kind {
                        WarningKind::FaceAbsent => &mut expected.face_absent,
                        WarningKind::LookingAway => &mut expected.looking_away,
                        WarningKind::EyesClosed => &mut expected.eyes_closed,
                    };
                    *s = if matched == Some(kind) { *s + 1 } else { 0 };
                }
                prop_assert_eq!(monitor.streaks(), expected);

                // at most one streak is non-zero
                let s = monitor.streaks();
                prop_assert!([s.face_absent, s.looking_away, s.eyes_closed].iter().filter(|&&v| v > 0).count() <= 1);

                for (i, kind) in WarningKind::ALL.into_iter().enumerate() {
                    let c = monitor.counters(kind);
                    prop_assert!(c.surfaced <= c.observed);
                    prop_assert!(c.observed <= c.condition_frames);
                    prop_assert!(c.condition_frames >= before[i].condition_frames);
                    prop_assert!(c.observed >= before[i].observed);
                    prop_assert!(c.surfaced >= before[i].surfaced);
                }

                if let Some(w) = update.warning {
                    prop_assert_eq!(Some(w.kind), update.condition);
                    prop_assert_eq!(update.state, w.kind.state());
                }

                // below-threshold dropouts hold the previous state, anything else below threshold is attentive
                match update.condition {
                    Some(kind) if monitor.streaks().get(kind) >= monitor.config().streak_thresholds.get(kind) => {
                        prop_assert_eq!(update.state, kind.state());
                    }
                    Some(WarningKind::FaceAbsent) => prop_assert_eq!(update.state, state_before),
                    _ => prop_assert_eq!(update.state, AttentionState::Attentive),
                }
            }
        }
    }
}
