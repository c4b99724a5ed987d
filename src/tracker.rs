//! Main tracker implementation.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::matching::{assign, MatchingStrategy};
use crate::tracked_object::{IdGeneration, TrackId, TrackIdFactory};
use crate::utils::warn_once;
use crate::{Detection, Error, Result, TrackedObject};

/// Configuration for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// IoU a detection must strictly exceed to continue a track.
    pub iou_threshold: f64,

    /// Frames a track survives without a match. A track is evicted once its
    /// age is strictly greater than this.
    pub max_age: u32,

    /// How conflicting detections are resolved within one frame.
    pub matching: MatchingStrategy,

    /// How track ids are minted.
    pub id_generation: IdGeneration,
}

impl TrackerConfig {
    /// Create a new tracker configuration.
    ///
    /// # Arguments
    /// * `iou_threshold` - Minimum (exclusive) IoU for a match
    /// * `max_age` - Maximum frames without a match
    pub fn new(iou_threshold: f64, max_age: u32) -> Self {
        Self {
            iou_threshold,
            max_age,
            ..Self::default()
        }
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.iou_threshold.is_finite() || !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            max_age: 30,
            matching: MatchingStrategy::default(),
            id_generation: IdGeneration::default(),
        }
    }
}

/// Per-class IoU object tracker.
///
/// Maintains a set of tracked objects across frames, matching new detections
/// to existing objects of the same class and evicting objects that have gone
/// unmatched for too long. One instance per video stream; it is not meant to
/// be shared between streams.
#[derive(Debug)]
pub struct Tracker {
    /// Tracker configuration.
    pub config: TrackerConfig,

    /// Currently tracked objects, oldest first.
    tracked_objects: Vec<TrackedObject>,

    /// Source of fresh track ids.
    id_factory: TrackIdFactory,

    /// Number of calls to `track` so far.
    frame_count: u64,
}

impl Tracker {
    /// Create a new tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let id_factory = TrackIdFactory::new(config.id_generation);
        Ok(Self {
            config,
            tracked_objects: Vec::new(),
            id_factory,
            frame_count: 0,
        })
    }

    /// Process one frame of detections.
    ///
    /// Every existing track ages by one frame, then each detection is matched
    /// to a same-class track or starts a new one, and finally tracks older
    /// than `max_age` are dropped.
    ///
    /// # Arguments
    /// * `detections` - Detections for this frame, already filtered to the
    ///   classes of interest
    ///
    /// # Returns
    /// The same detections, in the same order, each with `tracking_id` set
    pub fn track(&mut self, mut detections: Vec<Detection>) -> Vec<Detection> {
        self.frame_count += 1;

        for obj in &mut self.tracked_objects {
            obj.age = obj.age.saturating_add(1);
        }

        for det in &detections {
            if !det.bbox.is_valid() {
                warn_once(&format!(
                    "detection of class '{}' has a malformed bounding box; it will never match an existing track",
                    det.class_name
                ));
            }
        }

        // Only tracks alive before this frame are candidates
        let assignments = assign(
            self.config.matching,
            &detections,
            &mut self.tracked_objects,
            self.config.iou_threshold,
        );

        for (det, matched) in detections.iter_mut().zip(assignments) {
            let track_id = match matched {
                Some(idx) => {
                    let obj = &self.tracked_objects[idx];
                    trace!("matched {} detection to track {}", det.class_name, obj.track_id);
                    obj.track_id
                }
                None => self.create_object(det),
            };
            det.tracking_id = Some(track_id);
        }

        self.evict_stale();

        detections
    }

    /// Currently tracked objects, oldest first.
    pub fn tracked_objects(&self) -> &[TrackedObject] {
        &self.tracked_objects
    }

    /// Look up a live track by id.
    pub fn get(&self, track_id: &TrackId) -> Option<&TrackedObject> {
        self.tracked_objects.iter().find(|obj| obj.track_id == *track_id)
    }

    /// Get the total number of tracks ever created.
    pub fn total_object_count(&self) -> u64 {
        self.id_factory.issued_count()
    }

    /// Get the current number of live tracks.
    pub fn current_object_count(&self) -> usize {
        self.tracked_objects.len()
    }

    /// Number of frames processed.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // Internal: start a new track for an unmatched detection
    fn create_object(&mut self, detection: &Detection) -> TrackId {
        let track_id = self.id_factory.next_id();
        debug!(
            "new {} track {} at {:?}",
            detection.class_name,
            track_id,
            detection.bbox.to_xyxy()
        );
        self.tracked_objects
            .push(TrackedObject::from_detection(track_id, detection));
        track_id
    }

    // Internal: drop tracks unmatched for more than max_age frames
    fn evict_stale(&mut self) {
        let max_age = self.config.max_age;
        self.tracked_objects.retain(|obj| {
            let keep = obj.age <= max_age;
            if !keep {
                debug!(
                    "evicting {} track {} after {} frames without a match",
                    obj.class_name, obj.track_id, obj.age
                );
            }
            keep
        });
    }
}
