//! TrackedObject struct for objects maintained by the tracker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detection::{BoundingBox, Detection};

/// Opaque, process-unique track identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TrackId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How a [`TrackIdFactory`] mints identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdGeneration {
    /// Random v4 UUIDs.
    #[default]
    Random,
    /// UUIDs built from a counter (`00000000-0000-0000-0000-000000000001`, ...).
    /// Reproducible across runs; only unique within one factory.
    Sequential,
}

/// Factory for creating track identities.
///
/// Every id a factory hands out is distinct from every other id it has handed
/// out; ids are never recycled after their track is evicted.
#[derive(Debug, Clone, Default)]
pub struct TrackIdFactory {
    generation: IdGeneration,
    issued: u64,
}

impl TrackIdFactory {
    pub fn new(generation: IdGeneration) -> Self {
        Self {
            generation,
            issued: 0,
        }
    }

    /// Factory producing random v4 UUIDs.
    pub fn random() -> Self {
        Self::new(IdGeneration::Random)
    }

    /// Factory producing counter-based UUIDs starting at 1.
    pub fn sequential() -> Self {
        Self::new(IdGeneration::Sequential)
    }

    /// Mint the next identity.
    pub fn next_id(&mut self) -> TrackId {
        self.issued += 1;
        match self.generation {
            IdGeneration::Random => TrackId(Uuid::new_v4()),
            IdGeneration::Sequential => TrackId(Uuid::from_u128(u128::from(self.issued))),
        }
    }

    /// Number of identities issued so far.
    pub fn issued_count(&self) -> u64 {
        self.issued
    }

    pub fn generation(&self) -> IdGeneration {
        self.generation
    }
}

/// A tracked object maintained by the tracker.
///
/// Owned exclusively by the [`Tracker`](crate::Tracker). Created on the first
/// unmatched detection of its class, refreshed on every match, removed once
/// `age` exceeds the tracker's `max_age`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    /// Identity, fixed for the lifetime of the track.
    pub track_id: TrackId,

    /// Class label; only detections of the same class can match.
    pub class_name: String,

    /// Box of the most recent matched detection.
    pub bbox: BoundingBox,

    /// Confidence of the most recent matched detection.
    pub confidence: f64,

    /// Frames since the last match (0 in a frame where it matched).
    pub age: u32,

    /// Number of frames in which this track was matched, including creation.
    pub frames_tracked: u32,
}

impl TrackedObject {
    /// Start a new track from an unmatched detection.
    pub(crate) fn from_detection(track_id: TrackId, detection: &Detection) -> Self {
        Self {
            track_id,
            class_name: detection.class_name.clone(),
            bbox: detection.bbox,
            confidence: detection.confidence,
            age: 0,
            frames_tracked: 1,
        }
    }

    /// Refresh the track from a matched detection.
    pub(crate) fn hit(&mut self, detection: &Detection) {
        self.bbox = detection.bbox;
        self.confidence = detection.confidence;
        self.age = 0;
        self.frames_tracked = self.frames_tracked.saturating_add(1);
    }
}

impl fmt::Display for TrackedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackedObject(id={}, class={}, age={}, frames_tracked={})",
            self.track_id, self.class_name, self.age, self.frames_tracked
        )
    }
}
