//! Detection-to-track matching algorithms.
//!
//! All matchers only pair a detection with a track of the same class, and
//! only when their IoU is strictly greater than the threshold. They differ in
//! how conflicts between detections are settled:
//!
//! - [`MatchingStrategy::Permissive`] scans detections in input order and lets
//!   every detection pick its best track, even one already picked earlier in
//!   the same frame. A track refreshed by an earlier detection is compared
//!   using that detection's box.
//! - [`MatchingStrategy::Exclusive`] scans in input order but removes a track
//!   from the pool once matched.
//! - [`MatchingStrategy::Global`] sorts every qualifying pair by descending
//!   IoU and accepts pairs greedily, one-to-one.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::distances::{iou, iou_matrix};
use crate::tracked_object::TrackedObject;

/// Conflict resolution policy used by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    #[default]
    Permissive,
    Exclusive,
    Global,
}

/// Find the same-class track with the highest IoU above `threshold`.
///
/// Tracks are scanned in order and the first one wins on ties. Tracks marked
/// `false` in `available` are skipped.
///
/// # Returns
/// `(track_index, iou)` of the best candidate, if any.
pub fn best_match(
    detection: &Detection,
    objects: &[TrackedObject],
    threshold: f64,
    available: Option<&[bool]>,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    let mut best_iou = threshold;

    for (j, obj) in objects.iter().enumerate() {
        if obj.class_name != detection.class_name {
            continue;
        }
        if let Some(available) = available {
            if !available[j] {
                continue;
            }
        }

        let score = iou(&obj.bbox, &detection.bbox);
        if score > best_iou {
            best_iou = score;
            best = Some((j, score));
        }
    }

    best
}

/// Greedy one-to-one matching over an IoU matrix (n_detections x n_objects).
///
/// Pairs at or below `threshold` never match. Among qualifying pairs the
/// highest IoU is taken first; equal IoUs fall back to detection then object
/// order.
///
/// # Returns
/// For each detection, the matched object index.
pub fn match_global(iou_matrix: &DMatrix<f64>, threshold: f64) -> Vec<Option<usize>> {
    let n_detections = iou_matrix.nrows();
    let n_objects = iou_matrix.ncols();

    let mut assignments = vec![None; n_detections];
    if n_detections == 0 || n_objects == 0 {
        return assignments;
    }

    // Collect all valid (iou, det_idx, obj_idx) pairs
    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for i in 0..n_detections {
        for j in 0..n_objects {
            let score = iou_matrix[(i, j)];
            if score > threshold {
                pairs.push((score, i, j));
            }
        }
    }

    // Descending IoU; the sort is stable so ties keep (det, obj) order
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut used_objs = vec![false; n_objects];
    for (_score, det_idx, obj_idx) in pairs {
        if assignments[det_idx].is_some() || used_objs[obj_idx] {
            continue;
        }
        assignments[det_idx] = Some(obj_idx);
        used_objs[obj_idx] = true;
    }

    assignments
}

/// Match detections against existing tracks and refresh every matched track.
///
/// # Arguments
/// * `strategy` - Conflict resolution policy
/// * `detections` - Detections of the current frame, in input order
/// * `objects` - Tracks alive before this frame
/// * `threshold` - IoU a pair must strictly exceed
///
/// # Returns
/// For each detection, the index into `objects` of its track, or `None` when
/// it needs a new track.
pub fn assign(
    strategy: MatchingStrategy,
    detections: &[Detection],
    objects: &mut [TrackedObject],
    threshold: f64,
) -> Vec<Option<usize>> {
    match strategy {
        MatchingStrategy::Permissive => {
            let mut assignments = Vec::with_capacity(detections.len());
            for detection in detections {
                let matched = best_match(detection, objects, threshold, None).map(|(j, _)| j);
                if let Some(j) = matched {
                    objects[j].hit(detection);
                }
                assignments.push(matched);
            }
            assignments
        }
        MatchingStrategy::Exclusive => {
            let mut available = vec![true; objects.len()];
            let mut assignments = Vec::with_capacity(detections.len());
            for detection in detections {
                let matched =
                    best_match(detection, objects, threshold, Some(&available)).map(|(j, _)| j);
                if let Some(j) = matched {
                    available[j] = false;
                    objects[j].hit(detection);
                }
                assignments.push(matched);
            }
            assignments
        }
        MatchingStrategy::Global => {
            let det_boxes: Vec<_> = detections.iter().map(|d| d.bbox).collect();
            let obj_boxes: Vec<_> = objects.iter().map(|o| o.bbox).collect();
            let mut scores = iou_matrix(&det_boxes, &obj_boxes);

            // Mask cross-class pairs
            for (i, detection) in detections.iter().enumerate() {
                for (j, obj) in objects.iter().enumerate() {
                    if obj.class_name != detection.class_name {
                        scores[(i, j)] = f64::NEG_INFINITY;
                    }
                }
            }

            let assignments = match_global(&scores, threshold);
            for (detection, matched) in detections.iter().zip(&assignments) {
                if let Some(j) = *matched {
                    objects[j].hit(detection);
                }
            }
            assignments
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracked_object::TrackIdFactory;

    fn det(class: &str, xyxy: [f64; 4]) -> Detection {
        Detection::from_xyxy(class, 0.9, xyxy)
    }

    fn tracks(entries: &[(&str, [f64; 4])]) -> Vec<TrackedObject> {
        let mut factory = TrackIdFactory::sequential();
        entries
            .iter()
            .map(|(class, xyxy)| TrackedObject::from_detection(factory.next_id(), &det(class, *xyxy)))
            .collect()
    }

    // ===== best_match =====

    #[test]
    fn test_best_match_picks_highest_iou() {
        let objects = tracks(&[
            ("backpack", [0.0, 0.0, 10.0, 10.0]),
            ("backpack", [1.0, 0.0, 11.0, 10.0]),
        ]);
        let d = det("backpack", [1.0, 0.0, 11.0, 10.0]);

        let (j, score) = best_match(&d, &objects, 0.5, None).unwrap();
        assert_eq!(j, 1);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_best_match_threshold_is_exclusive() {
        // IoU exactly 1/3
        let objects = tracks(&[("backpack", [0.0, 0.0, 10.0, 10.0])]);
        let d = det("backpack", [5.0, 0.0, 15.0, 10.0]);

        assert!(best_match(&d, &objects, 1.0 / 3.0, None).is_none());
        assert!(best_match(&d, &objects, 0.33, None).is_some());
    }

    #[test]
    fn test_best_match_ignores_other_classes() {
        let objects = tracks(&[("laptop", [0.0, 0.0, 10.0, 10.0])]);
        let d = det("backpack", [0.0, 0.0, 10.0, 10.0]);

        assert!(best_match(&d, &objects, 0.5, None).is_none());
    }

    #[test]
    fn test_best_match_first_wins_on_ties() {
        let objects = tracks(&[
            ("backpack", [0.0, 0.0, 10.0, 10.0]),
            ("backpack", [0.0, 0.0, 10.0, 10.0]),
        ]);
        let d = det("backpack", [0.0, 0.0, 10.0, 10.0]);

        assert_eq!(best_match(&d, &objects, 0.5, None).map(|m| m.0), Some(0));
    }

    #[test]
    fn test_best_match_respects_availability() {
        let objects = tracks(&[
            ("backpack", [0.0, 0.0, 10.0, 10.0]),
            ("backpack", [1.0, 0.0, 11.0, 10.0]),
        ]);
        let d = det("backpack", [0.0, 0.0, 10.0, 10.0]);

        let available = [false, true];
        assert_eq!(best_match(&d, &objects, 0.5, Some(&available)).map(|m| m.0), Some(1));
    }

    // ===== match_global =====

    #[test]
    fn test_match_global_prefers_highest_iou() {
        // Detection 0 prefers object 0 but detection 1 fits it better,
        // so detection 0 falls back to object 1.
        let matrix = DMatrix::from_row_slice(2, 2, &[
            0.7, 0.6,
            0.9, 0.0,
        ]);
        let assignments = match_global(&matrix, 0.5);
        assert_eq!(assignments, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_match_global_threshold_filtering() {
        let matrix = DMatrix::from_row_slice(2, 2, &[
            0.5, 0.2,
            0.1, 0.8,
        ]);
        let assignments = match_global(&matrix, 0.5);
        assert_eq!(assignments, vec![None, Some(1)]);
    }

    #[test]
    fn test_match_global_empty() {
        let matrix = DMatrix::<f64>::zeros(3, 0);
        assert_eq!(match_global(&matrix, 0.5), vec![None, None, None]);
    }

    // ===== assign =====

    #[test]
    fn test_assign_permissive_allows_shared_track() {
        let mut objects = tracks(&[("backpack", [0.0, 0.0, 10.0, 10.0])]);
        let detections = vec![
            det("backpack", [0.0, 0.0, 10.0, 10.0]),
            det("backpack", [0.0, 0.0, 10.0, 10.0]),
        ];

        let assignments = assign(MatchingStrategy::Permissive, &detections, &mut objects, 0.5);
        assert_eq!(assignments, vec![Some(0), Some(0)]);
        assert_eq!(objects[0].frames_tracked, 3);
    }

    #[test]
    fn test_assign_permissive_sees_in_frame_update() {
        // The first detection moves the track to [2, 0, 12, 10]; the second
        // detection only clears the threshold against that moved box.
        let mut objects = tracks(&[("backpack", [0.0, 0.0, 10.0, 10.0])]);
        let detections = vec![
            det("backpack", [2.0, 0.0, 12.0, 10.0]),
            det("backpack", [4.0, 0.0, 14.0, 10.0]),
        ];

        let assignments = assign(MatchingStrategy::Permissive, &detections, &mut objects, 0.5);
        assert_eq!(assignments, vec![Some(0), Some(0)]);
        assert_eq!(objects[0].bbox, detections[1].bbox);
    }

    #[test]
    fn test_assign_exclusive_is_one_to_one() {
        let mut objects = tracks(&[("backpack", [0.0, 0.0, 10.0, 10.0])]);
        let detections = vec![
            det("backpack", [0.0, 0.0, 10.0, 10.0]),
            det("backpack", [0.0, 0.0, 10.0, 10.0]),
        ];

        let assignments = assign(MatchingStrategy::Exclusive, &detections, &mut objects, 0.5);
        assert_eq!(assignments, vec![Some(0), None]);
    }

    #[test]
    fn test_assign_global_masks_classes() {
        let mut objects = tracks(&[
            ("laptop", [0.0, 0.0, 10.0, 10.0]),
            ("backpack", [0.0, 0.0, 10.0, 10.0]),
        ]);
        let detections = vec![det("backpack", [0.0, 0.0, 10.0, 10.0])];

        let assignments = assign(MatchingStrategy::Global, &detections, &mut objects, 0.5);
        assert_eq!(assignments, vec![Some(1)]);
        assert_eq!(objects[0].frames_tracked, 1);
        assert_eq!(objects[1].frames_tracked, 2);
    }
}
