//! Linking tracked objects to the people who carry them.
//!
//! Each frame, every tracked object is paired with the nearest recognized
//! person (by bounding-box center distance). The pairing is turned into an
//! ownership decision by comparing it with what the object store already
//! holds: a new object is created, a changed owner is updated, and an
//! unchanged owner produces nothing.
//!
//! Ownership only ever moves from one face to another; nothing here clears
//! an owner.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::detection::{BoundingBox, Detection};
use crate::distances::center_distance;
use crate::face_matcher::FaceId;
use crate::store::ObjectStore;
use crate::tracked_object::TrackId;
use crate::{Error, Result};

/// A person detection, possibly with a recognized face.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedFace {
    /// Person bounding box; association distances are measured from its center.
    pub bbox: BoundingBox,

    /// Person detector confidence.
    pub confidence: f64,

    /// Identity, if the face was recognized.
    pub face_id: Option<FaceId>,

    /// Face rectangle in frame coordinates, if a face was found.
    pub face_location: Option<BoundingBox>,

    /// Face embedding, if a face was found.
    pub embedding: Option<DVector<f64>>,
}

impl RecognizedFace {
    /// A person detection with no face information yet.
    pub fn new(bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            bbox,
            confidence,
            face_id: None,
            face_location: None,
            embedding: None,
        }
    }

    /// A recognized person, as used by association.
    pub fn identified(face_id: impl Into<FaceId>, bbox: BoundingBox) -> Self {
        Self {
            face_id: Some(face_id.into()),
            ..Self::new(bbox, 1.0)
        }
    }
}

/// Nearest qualifying face for one tracked object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub tracking_id: TrackId,
    pub class_name: String,
    pub face_id: FaceId,
    /// Center-to-center distance in pixels.
    pub distance: f64,
}

/// Ownership change to be applied by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OwnershipEvent {
    /// First sighting of an owned object: persist it with `first_seen` and
    /// `last_seen` both set to `seen_at`.
    Create {
        tracking_id: TrackId,
        class_name: String,
        owner_id: FaceId,
        seen_at: DateTime<Utc>,
    },
    /// The object changed hands: set the owner and refresh `last_seen`.
    Update {
        tracking_id: TrackId,
        owner_id: FaceId,
        seen_at: DateTime<Utc>,
    },
}

impl OwnershipEvent {
    pub fn tracking_id(&self) -> &TrackId {
        match self {
            Self::Create { tracking_id, .. } | Self::Update { tracking_id, .. } => tracking_id,
        }
    }

    pub fn owner_id(&self) -> &FaceId {
        match self {
            Self::Create { owner_id, .. } | Self::Update { owner_id, .. } => owner_id,
        }
    }
}

/// Configuration for ownership association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// A face qualifies when its center is strictly closer than this, in
    /// bounding-box pixel units.
    pub distance_threshold: f64,
}

impl AssociationConfig {
    pub fn new(distance_threshold: f64) -> Self {
        Self { distance_threshold }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "distance_threshold must be finite and positive, got {}",
                self.distance_threshold
            )));
        }
        Ok(())
    }
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 200.0,
        }
    }
}

/// Decides which person owns each tracked object.
#[derive(Debug, Clone)]
pub struct AssociationResolver {
    pub config: AssociationConfig,
}

impl AssociationResolver {
    pub fn new(config: AssociationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Nearest identified face to `object`, strictly within the threshold.
    ///
    /// Faces without a `face_id` are ignored. The first face wins on ties.
    pub fn nearest_face<'a>(
        &self,
        object: &BoundingBox,
        faces: &'a [RecognizedFace],
    ) -> Option<(&'a FaceId, f64)> {
        let mut closest: Option<(&FaceId, f64)> = None;
        let mut min_distance = self.config.distance_threshold;

        for face in faces {
            let Some(face_id) = face.face_id.as_ref() else {
                continue;
            };
            let distance = center_distance(object, &face.bbox);
            if distance < min_distance {
                min_distance = distance;
                closest = Some((face_id, distance));
            }
        }

        closest
    }

    /// Pair every tracked object with its nearest qualifying face.
    ///
    /// Objects without a `tracking_id` and objects with no face in range are
    /// left out.
    pub fn associate(&self, objects: &[Detection], faces: &[RecognizedFace]) -> Vec<Association> {
        objects
            .iter()
            .filter_map(|obj| {
                let tracking_id = obj.tracking_id?;
                let (face_id, distance) = self.nearest_face(&obj.bbox, faces)?;
                Some(Association {
                    tracking_id,
                    class_name: obj.class_name.clone(),
                    face_id: face_id.clone(),
                    distance,
                })
            })
            .collect()
    }

    /// Turn this frame's associations into ownership events, timestamped now.
    pub fn resolve<S: ObjectStore + ?Sized>(
        &self,
        objects: &[Detection],
        faces: &[RecognizedFace],
        store: &S,
    ) -> Result<Vec<OwnershipEvent>> {
        self.resolve_at(objects, faces, store, Utc::now())
    }

    /// Turn this frame's associations into ownership events.
    ///
    /// # Arguments
    /// * `objects` - Tracked object detections of the current frame
    /// * `faces` - Person detections of the current frame
    /// * `store` - Current persisted ownership, read-only
    /// * `now` - Timestamp written into the events
    ///
    /// # Returns
    /// At most one event per tracked object. Objects sharing a tracking id
    /// within the frame see the owners decided earlier in the same call, so a
    /// tracking id is created at most once. Store errors are propagated.
    pub fn resolve_at<S: ObjectStore + ?Sized>(
        &self,
        objects: &[Detection],
        faces: &[RecognizedFace],
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<Vec<OwnershipEvent>> {
        let mut events = Vec::new();
        // Owners decided earlier in this call take precedence over the store
        let mut decided: HashMap<TrackId, FaceId> = HashMap::new();

        for association in self.associate(objects, faces) {
            let Association {
                tracking_id,
                class_name,
                face_id,
                distance,
            } = association;

            let current = match decided.get(&tracking_id) {
                Some(owner) => Some(Some(owner.clone())),
                None => store.get_object(&tracking_id)?.map(|o| o.owner_id),
            };
            decided.insert(tracking_id, face_id.clone());

            match current {
                None => {
                    debug!(
                        "{} {} first owned by {} (distance {:.1})",
                        class_name, tracking_id, face_id, distance
                    );
                    events.push(OwnershipEvent::Create {
                        tracking_id,
                        class_name,
                        owner_id: face_id,
                        seen_at: now,
                    });
                }
                Some(owner) if owner.as_ref() != Some(&face_id) => {
                    debug!(
                        "{} {} changes owner {:?} -> {} (distance {:.1})",
                        class_name, tracking_id, owner, face_id, distance
                    );
                    events.push(OwnershipEvent::Update {
                        tracking_id,
                        owner_id: face_id,
                        seen_at: now,
                    });
                }
                Some(_) => {
                    trace!("{} {} still owned by {}", class_name, tracking_id, face_id);
                }
            }
        }

        Ok(events)
    }
}
