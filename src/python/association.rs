//! Python wrapper for AssociationResolver.

use std::collections::HashMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::{
    AssociationConfig, AssociationResolver, FaceId, OwnershipEvent, RecognizedFace, TrackId,
};

use super::detection::{extract_bbox, PyDetection};

/// Decides which person owns each tracked object.
///
/// Example:
///     >>> from custody_rs import AssociationResolver
///     >>>
///     >>> resolver = AssociationResolver(distance_threshold=200.0)
///     >>> events = resolver.resolve(tracked, [([60, 40, 140, 160], "alice")], {})
///     >>> events[0]["type"]
///     'create'
#[pyclass(name = "AssociationResolver")]
pub struct PyAssociationResolver {
    inner: AssociationResolver,
}

#[pymethods]
impl PyAssociationResolver {
    /// Create a new AssociationResolver.
    ///
    /// Args:
    ///     distance_threshold: Maximum center distance, exclusive, between an
    ///         object and a person. Default: 200.0.
    #[new]
    #[pyo3(signature = (distance_threshold=200.0))]
    fn new(distance_threshold: f64) -> PyResult<Self> {
        Ok(Self {
            inner: AssociationResolver::new(AssociationConfig::new(distance_threshold))?,
        })
    }

    /// Ownership events for one frame.
    ///
    /// Args:
    ///     objects: Tracked detections (tracking_id set) of the frame.
    ///     faces: List of (person_bbox, face_id or None).
    ///     owners: Current persisted ownership, tracking_id -> owner_id or None.
    ///         Objects absent from the dict are not persisted yet.
    ///
    /// Returns:
    ///     List of event dicts with keys type, tracking_id, owner_id, seen_at
    ///     and, for "create", class_name.
    fn resolve<'py>(
        &self,
        py: Python<'py>,
        objects: Vec<PyDetection>,
        faces: Vec<(Vec<f64>, Option<String>)>,
        owners: HashMap<String, Option<String>>,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let objects: Vec<_> = objects.into_iter().map(|d| d.inner).collect();

        let mut recognized = Vec::with_capacity(faces.len());
        for (bbox, face_id) in faces {
            let mut face = RecognizedFace::new(extract_bbox(&bbox)?, 1.0);
            face.face_id = face_id.map(FaceId::new);
            recognized.push(face);
        }

        let mut store: HashMap<TrackId, Option<FaceId>> = HashMap::with_capacity(owners.len());
        for (tracking_id, owner_id) in owners {
            let tracking_id = tracking_id.parse::<TrackId>().map_err(|e| {
                PyValueError::new_err(format!("invalid tracking id '{}': {}", tracking_id, e))
            })?;
            store.insert(tracking_id, owner_id.map(FaceId::new));
        }

        let events = self.inner.resolve(&objects, &recognized, &store)?;
        events.iter().map(|e| event_to_dict(py, e)).collect()
    }

    #[getter]
    fn distance_threshold(&self) -> f64 {
        self.inner.config.distance_threshold
    }

    fn __repr__(&self) -> String {
        format!(
            "AssociationResolver(distance_threshold={})",
            self.inner.config.distance_threshold
        )
    }
}

fn event_to_dict<'py>(py: Python<'py>, event: &OwnershipEvent) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    match event {
        OwnershipEvent::Create {
            tracking_id,
            class_name,
            owner_id,
            seen_at,
        } => {
            dict.set_item("type", "create")?;
            dict.set_item("tracking_id", tracking_id.to_string())?;
            dict.set_item("class_name", class_name)?;
            dict.set_item("owner_id", owner_id.as_str())?;
            dict.set_item("seen_at", seen_at.to_rfc3339())?;
        }
        OwnershipEvent::Update {
            tracking_id,
            owner_id,
            seen_at,
        } => {
            dict.set_item("type", "update")?;
            dict.set_item("tracking_id", tracking_id.to_string())?;
            dict.set_item("owner_id", owner_id.as_str())?;
            dict.set_item("seen_at", seen_at.to_rfc3339())?;
        }
    }
    Ok(dict)
}
