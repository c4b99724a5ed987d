//! Built-in distance functions.

use nalgebra::DVector;

use crate::detection::BoundingBox;

/// Intersection over Union of two axis-aligned boxes.
///
/// Returns a value in `[0, 1]`: 1 for identical boxes, 0 for disjoint ones.
/// Malformed boxes (non-finite, zero or negative area) score 0 against
/// everything, including themselves.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    if !a.is_valid() || !b.is_valid() {
        return 0.0;
    }

    // Intersection
    let inter_x1 = a.x1.max(b.x1);
    let inter_y1 = a.y1.max(b.y1);
    let inter_x2 = a.x2.min(b.x2);
    let inter_y2 = a.y2.min(b.y2);

    if inter_x2 < inter_x1 || inter_y2 < inter_y1 {
        return 0.0;
    }

    let inter_area = (inter_x2 - inter_x1) * (inter_y2 - inter_y1);

    // Union
    let union_area = a.area() + b.area() - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

/// Euclidean distance between the centers of two boxes, in pixels.
pub fn center_distance(a: &BoundingBox, b: &BoundingBox) -> f64 {
    nalgebra::distance(&a.center(), &b.center())
}

/// Euclidean (L2) distance between two embeddings.
///
/// Embeddings of different dimensionality are infinitely far apart.
pub fn embedding_distance(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    (a - b).norm()
}
