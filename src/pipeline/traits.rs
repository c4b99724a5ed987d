//! Capability traits for the model backends the pipeline consumes.

use nalgebra::DVector;

use crate::detection::{BoundingBox, Detection};
use crate::Result;

/// Face found inside a person region.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEmbedding {
    /// Identity embedding; all embeddings of one backend share a dimensionality.
    pub embedding: DVector<f64>,

    /// Face rectangle in frame coordinates.
    pub face_location: BoundingBox,
}

/// Object detection backend.
///
/// Produces untracked detections with class names, confidences and boxes.
/// Implemented for any `Fn(&F) -> Result<Vec<Detection>>`.
pub trait ObjectDetector<F: ?Sized> {
    fn detect(&self, frame: &F) -> Result<Vec<Detection>>;
}

/// Face embedding backend.
///
/// Looks for a face inside `region` of `frame`. Returns at most one face.
/// Implemented for any `Fn(&F, &BoundingBox) -> Result<Option<FaceEmbedding>>`.
pub trait FaceEmbedder<F: ?Sized> {
    fn embed(&self, frame: &F, region: &BoundingBox) -> Result<Option<FaceEmbedding>>;
}

impl<F: ?Sized, T> ObjectDetector<F> for T
where
    T: Fn(&F) -> Result<Vec<Detection>>,
{
    fn detect(&self, frame: &F) -> Result<Vec<Detection>> {
        self(frame)
    }
}

impl<F: ?Sized, T> FaceEmbedder<F> for T
where
    T: Fn(&F, &BoundingBox) -> Result<Option<FaceEmbedding>>,
{
    fn embed(&self, frame: &F, region: &BoundingBox) -> Result<Option<FaceEmbedding>> {
        self(frame, region)
    }
}
