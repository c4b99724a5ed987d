//! Python bindings for custody-rs using PyO3.
//!
//! Exposes the tracker, face matcher and association resolver. Boxes are
//! `(x1, y1, x2, y2)` sequences or numpy arrays, embeddings are 1D numpy
//! arrays, and track/face ids are strings.

use pyo3::exceptions::{PyIOError, PyKeyError, PyValueError};
use pyo3::prelude::*;

use crate::Error;

mod association;
mod detection;
mod face_matcher;
mod tracker;

pub use association::PyAssociationResolver;
pub use detection::PyDetection;
pub use face_matcher::PyFaceMatcher;
pub use tracker::PyTracker;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        match err {
            Error::IoError(_) => PyIOError::new_err(err.to_string()),
            Error::UnknownTrack(_) => PyKeyError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Python module for custody-rs.
///
/// The function is named `_custody_rs` with underscore prefix for mixed Python/Rust projects.
#[pymodule]
fn _custody_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core classes
    m.add_class::<PyDetection>()?;
    m.add_class::<PyTracker>()?;
    m.add_class::<PyFaceMatcher>()?;
    m.add_class::<PyAssociationResolver>()?;

    // Distance functions
    m.add_function(wrap_pyfunction!(detection::iou, m)?)?;
    m.add_function(wrap_pyfunction!(detection::center_distance, m)?)?;

    // Version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
