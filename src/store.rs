//! Persistence capabilities consumed by the core, and an in-memory store.
//!
//! The core only ever reads from persistence: known faces once at start up
//! ([`FaceStore`]) and the current owner of an object before deciding between
//! create and update ([`ObjectStore`]). Writing the resulting
//! [`OwnershipEvent`]s is left to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::association::OwnershipEvent;
use crate::face_matcher::{FaceId, KnownFace};
use crate::tracked_object::TrackId;
use crate::{Error, Result};

/// An object as held by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedObject {
    pub tracking_id: TrackId,
    pub class_name: String,
    pub owner_id: Option<FaceId>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Source of known faces.
pub trait FaceStore {
    /// Every stored face with an embedding.
    fn load_known_faces(&self) -> Result<Vec<KnownFace>>;
}

/// Read access to persisted objects.
pub trait ObjectStore {
    /// The persisted object with this tracking id, if any.
    fn get_object(&self, tracking_id: &TrackId) -> Result<Option<PersistedObject>>;

    /// Current owner of an object; `None` when the object is unknown or unowned.
    fn get_owner(&self, tracking_id: &TrackId) -> Result<Option<FaceId>> {
        Ok(self
            .get_object(tracking_id)?
            .and_then(|object| object.owner_id))
    }
}

/// Process-local store of faces and objects.
///
/// Useful for tests, replays, and as a write-through cache in front of a real
/// database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    faces: Vec<KnownFace>,
    objects: HashMap<TrackId, PersistedObject>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a face. Faces with an id already present are replaced.
    pub fn add_face(&mut self, face: KnownFace) {
        match self.faces.iter_mut().find(|f| f.face_id == face.face_id) {
            Some(existing) => *existing = face,
            None => self.faces.push(face),
        }
    }

    /// Persist an object that has no owner yet.
    pub fn insert_unowned(
        &mut self,
        tracking_id: TrackId,
        class_name: impl Into<String>,
        seen_at: DateTime<Utc>,
    ) {
        self.objects.insert(
            tracking_id,
            PersistedObject {
                tracking_id,
                class_name: class_name.into(),
                owner_id: None,
                first_seen: seen_at,
                last_seen: seen_at,
            },
        );
    }

    /// Apply ownership events in order.
    ///
    /// A `Create` for an object that already exists keeps its `first_seen`
    /// and class, and only sets the owner and `last_seen`. An `Update` for an
    /// object that does not exist fails with [`Error::UnknownTrack`]; events
    /// before it stay applied.
    pub fn apply(&mut self, events: &[OwnershipEvent]) -> Result<()> {
        for event in events {
            self.apply_one(event)?;
        }
        Ok(())
    }

    fn apply_one(&mut self, event: &OwnershipEvent) -> Result<()> {
        match event {
            OwnershipEvent::Create {
                tracking_id,
                class_name,
                owner_id,
                seen_at,
            } => {
                debug!("persisting {} {} owned by {}", class_name, tracking_id, owner_id);
                let object = self
                    .objects
                    .entry(*tracking_id)
                    .or_insert_with(|| PersistedObject {
                        tracking_id: *tracking_id,
                        class_name: class_name.clone(),
                        owner_id: None,
                        first_seen: *seen_at,
                        last_seen: *seen_at,
                    });
                object.owner_id = Some(owner_id.clone());
                object.last_seen = *seen_at;
            }
            OwnershipEvent::Update {
                tracking_id,
                owner_id,
                seen_at,
            } => {
                let object = self
                    .objects
                    .get_mut(tracking_id)
                    .ok_or_else(|| Error::UnknownTrack(tracking_id.to_string()))?;
                object.owner_id = Some(owner_id.clone());
                object.last_seen = *seen_at;
            }
        }
        Ok(())
    }

    /// Objects currently owned by a face, sorted by first sighting.
    pub fn objects_owned_by(&self, face_id: &FaceId) -> Vec<&PersistedObject> {
        let mut owned: Vec<_> = self
            .objects
            .values()
            .filter(|o| o.owner_id.as_ref() == Some(face_id))
            .collect();
        owned.sort_by_key(|o| (o.first_seen, o.tracking_id));
        owned
    }

    pub fn objects(&self) -> impl Iterator<Item = &PersistedObject> {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

impl FaceStore for InMemoryStore {
    fn load_known_faces(&self) -> Result<Vec<KnownFace>> {
        Ok(self.faces.clone())
    }
}

impl ObjectStore for InMemoryStore {
    fn get_object(&self, tracking_id: &TrackId) -> Result<Option<PersistedObject>> {
        Ok(self.objects.get(tracking_id).cloned())
    }
}

/// Read-only owner table, e.g. a snapshot handed over from another process.
///
/// A key mapped to `None` is a persisted but unowned object.
impl ObjectStore for HashMap<TrackId, Option<FaceId>> {
    fn get_object(&self, tracking_id: &TrackId) -> Result<Option<PersistedObject>> {
        Ok(self.get(tracking_id).map(|owner_id| PersistedObject {
            tracking_id: *tracking_id,
            class_name: String::new(),
            owner_id: owner_id.clone(),
            first_seen: DateTime::<Utc>::default(),
            last_seen: DateTime::<Utc>::default(),
        }))
    }
}
