//! Frame & Landmark Types
//!
//! Input side of the monitor:
//! - Decoding uploaded camera frames
//! - 68-point facial landmark sets and their regions
//! - Per-face detections with optional emotion scores
//! - The `LandmarkExtractor` seam for an external face model

pub mod detection;
pub mod extractor;
pub mod frame;
pub mod points;

pub use detection::{Emotion, EmotionScores, FaceDetection, FrameObservation};
pub use extractor::{LandmarkExtractor, StaticExtractor, UnavailableExtractor};
pub use frame::VideoFrame;
pub use points::{BoundingBox, EyeSide, LandmarkSet, Point, Region, MIN_FACE_POINTS};

use thiserror::Error;

/// Frame errors: the upload is unusable before it reaches an extractor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame is empty")]
    Empty,

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Invalid frame dimensions: {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Extractor errors. Callers treat these as "no face in this frame".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Landmark detection unavailable: {0}")]
    Unavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}
