//! Geometric features from facial landmarks

use landmarks::{EyeSide, FrameObservation, LandmarkSet, Point};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;

/// Eye aspect ratio over the six eye-contour points.
///
/// `(|p2-p6| + |p3-p5|) / (2 |p1-p4|)`. `None` unless exactly six points are
/// given and the eye has non-zero width.
pub fn eye_aspect_ratio(eye: &[Point]) -> Option<f32> {
    let [p1, p2, p3, p4, p5, p6] = eye else {
        return None;
    };

    let vertical_1 = p2.distance(p6);
    let vertical_2 = p3.distance(p5);
    let horizontal = p1.distance(p4);

    if !(horizontal > 0.0) {
        return None;
    }
    Some((vertical_1 + vertical_2) / (2.0 * horizontal))
}

/// Face-center offset from frame center, normalized to [-1, 1] per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceOffset {
    pub x: f32,
    pub y: f32,
}

impl FaceOffset {
    /// True if either axis is beyond `bound`
    pub fn exceeds(&self, bound: f32) -> bool {
        self.x.abs() > bound || self.y.abs() > bound
    }
}

/// Landmark bounding-box center relative to the frame center
pub fn face_offset(landmarks: &LandmarkSet, width: u32, height: u32) -> FaceOffset {
    let Some(bbox) = landmarks.bounding_box() else {
        return FaceOffset::default();
    };
    if width == 0 || height == 0 {
        return FaceOffset::default();
    }

    let half_w = width as f32 / 2.0;
    let half_h = height as f32 / 2.0;
    let center = bbox.center();

    FaceOffset {
        x: ((center.x - half_w) / half_w).clamp(-1.0, 1.0),
        y: ((center.y - half_h) / half_h).clamp(-1.0, 1.0),
    }
}

/// Angle between the eye-center line and the horizontal, in degrees within [-90, 90]
pub fn head_tilt(landmarks: &LandmarkSet) -> Option<f32> {
    let left = Point::centroid(landmarks.eye(EyeSide::Left)?)?;
    let right = Point::centroid(landmarks.eye(EyeSide::Right)?)?;

    let dx = right.x - left.x;
    let dy = right.y - left.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    let angle = dy.atan2(dx).to_degrees();
    Some(if angle > 90.0 {
        angle - 180.0
    } else if angle < -90.0 {
        angle + 180.0
    } else {
        angle
    })
}

/// Per-frame metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// A usable face was detected
    pub face_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_ear: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_ear: Option<f32>,
    /// Average of both eyes, only when both are defined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<f32>,
    pub offset: FaceOffset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_tilt_deg: Option<f32>,
}

impl FrameMetrics {
    /// Metrics for a frame with no face
    pub fn absent() -> Self {
        Self::default()
    }

    /// Metrics for the most confident face in the observation
    pub fn compute(observation: &FrameObservation) -> Self {
        match observation.primary_face() {
            Some(face) => Self::from_landmarks(&face.landmarks, observation.width, observation.height),
            None => Self::absent(),
        }
    }

    pub fn from_landmarks(landmarks: &LandmarkSet, width: u32, height: u32) -> Self {
        if !landmarks.is_face() {
            return Self::absent();
        }

        let left_ear = landmarks.eye(EyeSide::Left).and_then(eye_aspect_ratio);
        let right_ear = landmarks.eye(EyeSide::Right).and_then(eye_aspect_ratio);
        let ear = match (left_ear, right_ear) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            _ => None,
        };

        Self {
            face_present: true,
            left_ear,
            right_ear,
            ear,
            offset: face_offset(landmarks, width, height),
            head_tilt_deg: head_tilt(landmarks),
        }
    }

    /// Face present but off-center or tilted beyond the configured bounds
    pub fn is_looking_away(&self, config: &SessionConfig) -> bool {
        self.face_present
            && (self.offset.exceeds(config.offset_bound)
                || self
                    .head_tilt_deg
                    .is_some_and(|tilt| tilt.abs() > config.tilt_bound))
    }

    /// EAR defined and under the cutoff
    pub fn is_eyes_closed(&self, config: &SessionConfig) -> bool {
        self.face_present && self.ear.is_some_and(|ear| ear < config.ear_threshold)
    }
}
