//! Per-face detection results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::points::LandmarkSet;

/// Basic facial expressions reported by emotion models
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion probability vector, e.g. `{"happy": 0.7, "neutral": 0.2}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(pub BTreeMap<Emotion, f32>);

impl EmotionScores {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest-scoring emotion and its probability. NaN scores are skipped;
    /// on exact ties the emotion listed first in `Emotion::ALL` wins.
    pub fn dominant(&self) -> Option<(Emotion, f32)> {
        self.0
            .iter()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best: Option<(Emotion, f32)>, (&e, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((e, p)),
            })
    }
}

impl FromIterator<(Emotion, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (Emotion, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Detector confidence (0-1)
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Landmark points
    pub landmarks: LandmarkSet,
    /// Emotion probabilities, when the model provides them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<EmotionScores>,
}

fn default_confidence() -> f32 {
    1.0
}

/// Everything the extractor saw in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Detected faces, in no particular order
    #[serde(default)]
    pub faces: Vec<FaceDetection>,
}

impl FrameObservation {
    /// Observation with no detected faces
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            faces: Vec::new(),
        }
    }

    /// The most confident detection
    pub fn primary_face(&self) -> Option<&FaceDetection> {
        self.faces
            .iter()
            .filter(|f| !f.confidence.is_nan())
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}
