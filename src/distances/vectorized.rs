//! Batch versions of the distance functions.

use nalgebra::{DMatrix, DVector};

use super::functions::{embedding_distance, iou};
use crate::detection::BoundingBox;

/// Compute the IoU matrix between two sets of boxes.
///
/// # Arguments
/// * `candidates` - First set of boxes (rows)
/// * `objects` - Second set of boxes (columns)
///
/// # Returns
/// IoU matrix of shape (n_candidates, n_objects)
pub fn iou_matrix(candidates: &[BoundingBox], objects: &[BoundingBox]) -> DMatrix<f64> {
    let n = candidates.len();
    let m = objects.len();

    if n == 0 || m == 0 {
        return DMatrix::zeros(n, m);
    }

    DMatrix::from_fn(n, m, |i, j| iou(&candidates[i], &objects[j]))
}

/// Distance from a probe embedding to every known embedding, in order.
pub fn embedding_distances(known: &[DVector<f64>], probe: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(known.len(), known.iter().map(|k| embedding_distance(k, probe)))
}

/// Index and value of the smallest distance. The first index wins on ties.
///
/// Returns `None` for an empty vector or when every distance is NaN.
pub fn argmin(distances: &DVector<f64>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &d) in distances.iter().enumerate() {
        if d.is_nan() {
            continue;
        }
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_iou_matrix_shape_and_values() {
        let a = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(100.0, 100.0, 110.0, 110.0),
        ];
        let b = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(5.0, 0.0, 15.0, 10.0),
            BoundingBox::new(100.0, 100.0, 110.0, 110.0),
        ];

        let m = iou_matrix(&a, &b);
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert_relative_eq!(m[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(m[(0, 1)], 1.0 / 3.0, epsilon = 1e-10);
        assert_relative_eq!(m[(0, 2)], 0.0, epsilon = 1e-10);
        assert_relative_eq!(m[(1, 2)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_iou_matrix_empty() {
        let a = vec![BoundingBox::new(0.0, 0.0, 1.0, 1.0)];
        let m = iou_matrix(&a, &[]);
        assert_eq!(m.nrows(), 1);
        assert_eq!(m.ncols(), 0);
    }

    #[test]
    fn test_embedding_distances_and_argmin() {
        let known = vec![
            DVector::from_vec(vec![1.0, 0.0]),
            DVector::from_vec(vec![0.0, 0.5]),
            DVector::from_vec(vec![3.0, 4.0]),
        ];
        let probe = DVector::from_vec(vec![0.0, 0.0]);

        let d = embedding_distances(&known, &probe);
        assert_relative_eq!(d[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(d[1], 0.5, epsilon = 1e-10);
        assert_relative_eq!(d[2], 5.0, epsilon = 1e-10);

        assert_eq!(argmin(&d), Some((1, 0.5)));
    }

    #[test]
    fn test_argmin_first_wins_on_ties() {
        let d = DVector::from_vec(vec![2.0, 1.0, 1.0]);
        assert_eq!(argmin(&d).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_argmin_empty() {
        let d = DVector::<f64>::zeros(0);
        assert_eq!(argmin(&d), None);
    }
}
