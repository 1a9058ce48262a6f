//! Landmark extractor seam
//!
//! Face detection and landmark regression run outside this workspace. The
//! monitor only consumes their output through `LandmarkExtractor`.

use tracing::{debug, warn};

use crate::detection::{FaceDetection, FrameObservation};
use crate::frame::VideoFrame;
use crate::DetectionError;

/// Produces face detections for a decoded frame
pub trait LandmarkExtractor: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Detect faces in frame
    fn extract(&self, frame: &VideoFrame) -> Result<Vec<FaceDetection>, DetectionError>;

    /// Run extraction, degrading any failure to "no face detected"
    fn observe(&self, frame: &VideoFrame) -> FrameObservation {
        match self.extract(frame) {
            Ok(faces) => FrameObservation {
                width: frame.width,
                height: frame.height,
                faces,
            },
            Err(e) => {
                debug!(extractor = self.name(), error = %e, "Detection failed, treating frame as face-absent");
                FrameObservation::empty(frame.width, frame.height)
            }
        }
    }
}

/// Backend used when no face model is configured: every frame reports
/// detection unavailable.
#[derive(Debug)]
pub struct UnavailableExtractor;

impl UnavailableExtractor {
    pub fn new() -> Self {
        warn!("No landmark model configured. Uploaded frames will be treated as face-absent.");
        Self
    }
}

impl Default for UnavailableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkExtractor for UnavailableExtractor {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn extract(&self, _frame: &VideoFrame) -> Result<Vec<FaceDetection>, DetectionError> {
        Err(DetectionError::Unavailable("no landmark model configured".into()))
    }
}

/// Returns the same detections for every frame. Useful for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    faces: Vec<FaceDetection>,
}

impl StaticExtractor {
    pub fn new(faces: Vec<FaceDetection>) -> Self {
        Self { faces }
    }
}

impl LandmarkExtractor for StaticExtractor {
    fn name(&self) -> &str {
        "static"
    }

    fn extract(&self, _frame: &VideoFrame) -> Result<Vec<FaceDetection>, DetectionError> {
        Ok(self.faces.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{LandmarkSet, Point};

    fn frame() -> VideoFrame {
        VideoFrame::from_rgb(vec![0; 4 * 3 * 3], 4, 3).unwrap()
    }

    #[test]
    fn test_unavailable_degrades_to_empty() {
        let obs = UnavailableExtractor::new().observe(&frame());
        assert_eq!(obs, FrameObservation::empty(4, 3));
    }

    #[test]
    fn test_static_carries_frame_size() {
        let face = FaceDetection {
            confidence: 0.8,
            landmarks: LandmarkSet::new(vec![Point::new(1.0, 1.0); 5]),
            emotions: None,
        };
        let obs = StaticExtractor::new(vec![face.clone()]).observe(&frame());
        assert_eq!((obs.width, obs.height), (4, 3));
        assert_eq!(obs.faces, vec![face]);
    }
}
