//! Python wrapper for Tracker.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::{IdGeneration, MatchingStrategy, Tracker, TrackerConfig};

use super::detection::{bbox_to_numpy, PyDetection};

/// IoU object tracker.
///
/// Example:
///     >>> from custody_rs import Tracker, Detection
///     >>>
///     >>> tracker = Tracker(iou_threshold=0.5, max_age=30)
///     >>> tracked = tracker.track([Detection("backpack", 0.9, [100, 80, 140, 120])])
///     >>> tracked[0].tracking_id is not None
///     True
#[pyclass(name = "Tracker")]
pub struct PyTracker {
    inner: Tracker,
}

#[pymethods]
impl PyTracker {
    /// Create a new Tracker.
    ///
    /// Args:
    ///     iou_threshold: A match needs IoU strictly above this. Default: 0.5.
    ///     max_age: Frames a track survives without a match. Default: 30.
    ///     matching: "permissive", "exclusive" or "global". Default: "permissive".
    ///     sequential_ids: Issue counter based ids instead of random UUIDs.
    #[new]
    #[pyo3(signature = (iou_threshold=0.5, max_age=30, matching="permissive", sequential_ids=false))]
    fn new(
        iou_threshold: f64,
        max_age: u32,
        matching: &str,
        sequential_ids: bool,
    ) -> PyResult<Self> {
        let mut config = TrackerConfig::new(iou_threshold, max_age);
        config.matching = parse_matching(matching)?;
        if sequential_ids {
            config.id_generation = IdGeneration::Sequential;
        }
        Ok(Self {
            inner: Tracker::new(config)?,
        })
    }

    /// Process one frame of detections.
    ///
    /// Args:
    ///     detections: Detections of the current frame.
    ///
    /// Returns:
    ///     The same detections, in order, with tracking_id set.
    fn track(&mut self, detections: Vec<PyDetection>) -> Vec<PyDetection> {
        let detections = detections.into_iter().map(|d| d.inner).collect();
        self.inner
            .track(detections)
            .into_iter()
            .map(PyDetection::from_detection)
            .collect()
    }

    /// Live tracks as a list of dicts.
    fn tracked_objects<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyDict>>> {
        self.inner
            .tracked_objects()
            .iter()
            .map(|obj| {
                let dict = PyDict::new_bound(py);
                dict.set_item("tracking_id", obj.track_id.to_string())?;
                dict.set_item("class_name", &obj.class_name)?;
                dict.set_item("bbox", bbox_to_numpy(py, &obj.bbox))?;
                dict.set_item("confidence", obj.confidence)?;
                dict.set_item("age", obj.age)?;
                dict.set_item("frames_tracked", obj.frames_tracked)?;
                Ok(dict)
            })
            .collect()
    }

    #[getter]
    fn iou_threshold(&self) -> f64 {
        self.inner.config.iou_threshold
    }

    #[getter]
    fn max_age(&self) -> u32 {
        self.inner.config.max_age
    }

    /// Number of live tracks.
    #[getter]
    fn current_object_count(&self) -> usize {
        self.inner.current_object_count()
    }

    /// Number of tracks ever created.
    #[getter]
    fn total_object_count(&self) -> u64 {
        self.inner.total_object_count()
    }

    #[getter]
    fn frame_count(&self) -> u64 {
        self.inner.frame_count()
    }

    fn __repr__(&self) -> String {
        format!(
            "Tracker(iou_threshold={}, max_age={}, tracks={})",
            self.inner.config.iou_threshold,
            self.inner.config.max_age,
            self.inner.current_object_count()
        )
    }
}

fn parse_matching(name: &str) -> PyResult<MatchingStrategy> {
    match name {
        "permissive" => Ok(MatchingStrategy::Permissive),
        "exclusive" => Ok(MatchingStrategy::Exclusive),
        "global" => Ok(MatchingStrategy::Global),
        other => Err(PyValueError::new_err(format!(
            "unknown matching strategy '{}', expected permissive, exclusive or global",
            other
        ))),
    }
}
