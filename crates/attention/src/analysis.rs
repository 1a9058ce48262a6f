//! Per-frame analysis results

use serde::Serialize;

use crate::geometry::FrameMetrics;
use crate::mood::MoodReading;
use crate::state::{AttentionState, AttentionUpdate, DrowsinessLevel, Warning};

/// Complete analysis of one processed frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameAnalysis {
    /// 1-based index of this frame within its session
    pub frame_index: u64,

    /// Whether a face was detected
    pub face_detected: bool,

    /// Geometric metrics of the primary face
    pub metrics: FrameMetrics,

    /// Attention state (attention sessions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AttentionState>,

    /// Warning surfaced by this frame, after rate limiting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,

    /// Drowsiness estimate (attention sessions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drowsiness: Option<DrowsinessLevel>,

    /// Eye-closure percentage over recent frames
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perclos: Option<f32>,

    /// Mood reading (mood sessions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<MoodReading>,
}

impl FrameAnalysis {
    /// Analysis for an attention session frame
    pub fn attention(frame_index: u64, metrics: FrameMetrics, update: AttentionUpdate) -> Self {
        Self {
            frame_index,
            face_detected: metrics.face_present,
            metrics,
            state: Some(update.state),
            warning: update.warning,
            drowsiness: Some(update.drowsiness),
            perclos: update.perclos,
            mood: None,
        }
    }

    /// Analysis for a mood session frame
    pub fn mood(frame_index: u64, metrics: FrameMetrics, reading: MoodReading) -> Self {
        Self {
            frame_index,
            face_detected: metrics.face_present,
            metrics,
            state: None,
            warning: None,
            drowsiness: None,
            perclos: None,
            mood: Some(reading),
        }
    }

    /// Check if this frame surfaced a warning
    pub fn has_warning(&self) -> bool {
        self.warning.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::{MoodCategory, MoodSample};
    use crate::state::WarningKind;

    #[test]
    fn test_attention_json_shape() {
        let update = AttentionUpdate {
            state: AttentionState::FaceAbsentWarning,
            condition: Some(WarningKind::FaceAbsent),
            warning: Some(Warning::new(WarningKind::FaceAbsent)),
            drowsiness: DrowsinessLevel::Awake,
            perclos: None,
        };
        let analysis = FrameAnalysis::attention(7, FrameMetrics::absent(), update);
        assert!(analysis.has_warning());

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["state"], "face_absent_warning");
        assert_eq!(json["warning"]["kind"], "face_absent");
        assert_eq!(json["warning"]["severity"], "high");
        assert!(json.get("mood").is_none());
        assert!(json.get("perclos").is_none());
    }

    #[test]
    fn test_mood_json_shape() {
        let reading = MoodReading {
            sample: MoodSample::unknown(),
            smoothed: MoodCategory::Neutral,
            scores: None,
        };
        let analysis = FrameAnalysis::mood(1, FrameMetrics::absent(), reading);
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["mood"]["smoothed"], "neutral");
        assert!(json["mood"]["sample"]["emotion"].is_null());
        assert!(json["mood"].get("scores").is_none());
        assert!(json.get("state").is_none());
    }
}
