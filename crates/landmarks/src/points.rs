//! Facial landmark points in the 68-point iBUG layout

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Fewest points a landmark set needs to count as a detected face
pub const MIN_FACE_POINTS: usize = 4;

/// 2D image-space point (pixels). Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Centroid of a set of points
    pub fn centroid(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f32;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Named landmark regions.
///
/// Eye sides are as seen in the image, so `LeftEye` is the subject's
/// right eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Jaw,
    RightEyebrow,
    LeftEyebrow,
    Nose,
    LeftEye,
    RightEye,
    Mouth,
}

impl Region {
    /// Index range within the 68-point sequence
    pub const fn range(self) -> Range<usize> {
        match self {
            Region::Jaw => 0..17,
            Region::RightEyebrow => 17..22,
            Region::LeftEyebrow => 22..27,
            Region::Nose => 27..36,
            Region::LeftEye => 36..42,
            Region::RightEye => 42..48,
            Region::Mouth => 48..68,
        }
    }
}

/// Which eye
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub const fn region(self) -> Region {
        match self {
            EyeSide::Left => Region::LeftEye,
            EyeSide::Right => Region::RightEye,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Ordered landmark points for one face in one frame.
///
/// Sequences shorter than 68 points are accepted; regions they do not
/// cover are reported as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enough points to count as a face
    pub fn is_face(&self) -> bool {
        self.points.len() >= MIN_FACE_POINTS
    }

    /// Points of a region, or `None` if the set is too short to contain it
    pub fn region(&self, region: Region) -> Option<&[Point]> {
        self.points.get(region.range())
    }

    /// The six eye-contour points (outer corner, two upper, inner corner, two lower)
    pub fn eye(&self, side: EyeSide) -> Option<&[Point]> {
        self.region(side.region())
    }

    /// Bounding box over every point
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

impl From<Vec<Point>> for LandmarkSet {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}
