//! Python wrapper for FaceMatcher.

use nalgebra::DVector;
use numpy::PyReadonlyArray1;
use pyo3::prelude::*;

use crate::{FaceId, FaceMatcher, FaceMatcherConfig, KnownFace};

/// Identifies faces by nearest known embedding.
///
/// Example:
///     >>> import numpy as np
///     >>> from custody_rs import FaceMatcher
///     >>>
///     >>> matcher = FaceMatcher(tolerance=0.6)
///     >>> matcher.load([("alice", np.zeros(128))])
///     1
///     >>> matcher.recognize(np.full(128, 0.01))
///     'alice'
#[pyclass(name = "FaceMatcher")]
pub struct PyFaceMatcher {
    inner: FaceMatcher,
}

#[pymethods]
impl PyFaceMatcher {
    /// Create a new FaceMatcher.
    ///
    /// Args:
    ///     tolerance: A known face matches when its distance is strictly below
    ///         this. Default: 0.6.
    #[new]
    #[pyo3(signature = (tolerance=0.6))]
    fn new(tolerance: f64) -> PyResult<Self> {
        Ok(Self {
            inner: FaceMatcher::new(FaceMatcherConfig::new(tolerance))?,
        })
    }

    /// Bulk-load known faces.
    ///
    /// Args:
    ///     faces: Iterable of (face_id, embedding) pairs.
    ///
    /// Returns:
    ///     Number of faces added. Already known ids are skipped.
    fn load(&mut self, faces: Vec<(String, PyReadonlyArray1<f64>)>) -> PyResult<usize> {
        let known: Vec<KnownFace> = faces
            .into_iter()
            .map(|(id, embedding)| KnownFace {
                face_id: FaceId::new(id),
                embedding: numpy_to_dvector(&embedding),
            })
            .collect();
        Ok(self.inner.load(known)?)
    }

    /// Add one known face. Returns False if the id is already known.
    fn add(&mut self, face_id: String, embedding: PyReadonlyArray1<f64>) -> PyResult<bool> {
        Ok(self.inner.add(KnownFace {
            face_id: FaceId::new(face_id),
            embedding: numpy_to_dvector(&embedding),
        })?)
    }

    /// Add a face under a freshly generated id and return the id.
    fn enroll(&mut self, embedding: PyReadonlyArray1<f64>) -> PyResult<String> {
        let face_id = self.inner.enroll(numpy_to_dvector(&embedding))?;
        Ok(face_id.to_string())
    }

    /// Identity of the face, or None when it is unknown.
    fn recognize(&self, embedding: PyReadonlyArray1<f64>) -> Option<String> {
        self.inner
            .recognize(&numpy_to_dvector(&embedding))
            .map(|id| id.to_string())
    }

    /// Closest known face and its distance, ignoring the tolerance.
    fn best_match(&self, embedding: PyReadonlyArray1<f64>) -> Option<(String, f64)> {
        self.inner
            .best_match(&numpy_to_dvector(&embedding))
            .map(|m| (m.face_id.to_string(), m.distance))
    }

    fn __contains__(&self, face_id: String) -> bool {
        self.inner.contains(&FaceId::new(face_id))
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    #[getter]
    fn tolerance(&self) -> f64 {
        self.inner.config.tolerance
    }

    #[getter]
    fn face_ids(&self) -> Vec<String> {
        self.inner.face_ids().iter().map(|id| id.to_string()).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "FaceMatcher(tolerance={}, faces={})",
            self.inner.config.tolerance,
            self.inner.len()
        )
    }
}

/// Helper to convert a numpy array to DVector
pub fn numpy_to_dvector(arr: &PyReadonlyArray1<f64>) -> DVector<f64> {
    let view = arr.as_array();
    DVector::from_iterator(view.len(), view.iter().copied())
}
