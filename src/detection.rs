//! Detection and bounding box types exchanged with the tracker.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracked_object::TrackId;
use crate::{Error, Result};

/// Axis-aligned bounding box in pixel coordinates, `(x1, y1)` top-left and
/// `(x2, y2)` bottom-right.
///
/// Construction through [`BoundingBox::new`] does not validate: a malformed
/// box is still accepted by the tracker and simply never matches anything.
/// Use [`BoundingBox::try_new`] to reject at the boundary instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Create a bounding box without validation.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a bounding box, rejecting non-finite or inverted coordinates.
    pub fn try_new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        let bbox = Self::new(x1, y1, x2, y2);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Create a bounding box from an `[x1, y1, x2, y2]` array.
    pub fn from_xyxy(xyxy: [f64; 4]) -> Self {
        Self::new(xyxy[0], xyxy[1], xyxy[2], xyxy[3])
    }

    /// Coordinates as `[x1, y1, x2, y2]`.
    pub fn to_xyxy(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Signed area. Zero or negative for degenerate boxes.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Geometric center of the box.
    pub fn center(&self) -> Point2<f64> {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// True when all coordinates are finite and the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.to_xyxy().iter().all(|v| v.is_finite()) && self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Check the box, returning a descriptive error when it is malformed.
    pub fn validate(&self) -> Result<()> {
        if !self.to_xyxy().iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidBoundingBox(format!(
                "non-finite coordinates {:?}",
                self.to_xyxy()
            )));
        }
        if self.x2 <= self.x1 || self.y2 <= self.y1 {
            return Err(Error::InvalidBoundingBox(format!(
                "expected x1 < x2 and y1 < y2, got {:?}",
                self.to_xyxy()
            )));
        }
        Ok(())
    }
}

/// A single detection produced by the object detector for one frame.
///
/// `tracking_id` is `None` on input and filled in by
/// [`Tracker::track`](crate::Tracker::track).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector class label, e.g. `"backpack"`.
    pub class_name: String,

    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,

    /// Bounding box in pixel coordinates.
    pub bbox: BoundingBox,

    /// Track identity attached by the tracker.
    #[serde(default)]
    pub tracking_id: Option<TrackId>,
}

impl Detection {
    /// Create an untracked detection.
    pub fn new(class_name: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
            tracking_id: None,
        }
    }

    /// Create an untracked detection from `[x1, y1, x2, y2]`.
    pub fn from_xyxy(class_name: impl Into<String>, confidence: f64, xyxy: [f64; 4]) -> Self {
        Self::new(class_name, confidence, BoundingBox::from_xyxy(xyxy))
    }

    /// Whether the tracker has assigned an identity to this detection.
    pub fn is_tracked(&self) -> bool {
        self.tracking_id.is_some()
    }
}
