//! Python wrapper for Detection.

use numpy::ndarray::Array1;
use numpy::{IntoPyArray, PyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::distances;
use crate::{BoundingBox, Detection};

/// A detection of one object in one frame.
///
/// Example:
///     >>> from custody_rs import Detection
///     >>> det = Detection("backpack", 0.9, [100, 80, 140, 120])
///     >>> det.tracking_id is None
///     True
#[pyclass(name = "Detection")]
#[derive(Clone)]
pub struct PyDetection {
    pub(crate) inner: Detection,
}

impl PyDetection {
    pub fn from_detection(det: Detection) -> Self {
        Self { inner: det }
    }
}

#[pymethods]
impl PyDetection {
    /// Create a new Detection.
    ///
    /// Args:
    ///     class_name: Detector class label, e.g. "backpack".
    ///     confidence: Detector confidence in [0, 1].
    ///     bbox: Box corners (x1, y1, x2, y2) as a sequence or numpy array.
    #[new]
    #[pyo3(signature = (class_name, confidence, bbox))]
    fn new(class_name: String, confidence: f64, bbox: Vec<f64>) -> PyResult<Self> {
        let bbox = extract_bbox(&bbox)?;
        Ok(Self::from_detection(Detection::new(class_name, confidence, bbox)))
    }

    #[getter]
    fn class_name(&self) -> String {
        self.inner.class_name.clone()
    }

    #[getter]
    fn confidence(&self) -> f64 {
        self.inner.confidence
    }

    /// Box corners as a numpy array of shape (4,).
    #[getter]
    fn bbox<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        bbox_to_numpy(py, &self.inner.bbox)
    }

    /// Tracking id assigned by a Tracker, or None.
    #[getter]
    fn tracking_id(&self) -> Option<String> {
        self.inner.tracking_id.map(|id| id.to_string())
    }

    fn __repr__(&self) -> String {
        let [x1, y1, x2, y2] = self.inner.bbox.to_xyxy();
        format!(
            "Detection(class_name={:?}, confidence={:.3}, bbox=({}, {}, {}, {}), tracking_id={:?})",
            self.inner.class_name,
            self.inner.confidence,
            x1,
            y1,
            x2,
            y2,
            self.tracking_id()
        )
    }
}

/// Intersection over union of two boxes.
#[pyfunction]
pub fn iou(a: Vec<f64>, b: Vec<f64>) -> PyResult<f64> {
    Ok(distances::iou(&extract_bbox(&a)?, &extract_bbox(&b)?))
}

/// Euclidean distance between the centers of two boxes.
#[pyfunction]
pub fn center_distance(a: Vec<f64>, b: Vec<f64>) -> PyResult<f64> {
    Ok(distances::center_distance(
        &extract_bbox(&a)?,
        &extract_bbox(&b)?,
    ))
}

/// Helper to convert a 4-element sequence to a BoundingBox
pub fn extract_bbox(values: &[f64]) -> PyResult<BoundingBox> {
    match values {
        [x1, y1, x2, y2] => Ok(BoundingBox::new(*x1, *y1, *x2, *y2)),
        _ => Err(PyValueError::new_err(format!(
            "bbox must have 4 values (x1, y1, x2, y2), got {}",
            values.len()
        ))),
    }
}

/// Helper to convert a BoundingBox to a 1D numpy array
pub fn bbox_to_numpy<'py>(py: Python<'py>, bbox: &BoundingBox) -> Bound<'py, PyArray1<f64>> {
    Array1::from_vec(bbox.to_xyxy().to_vec()).into_pyarray_bound(py)
}
