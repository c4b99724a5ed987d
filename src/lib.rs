//! # Custody - Object Ownership Tracking Library
//!
//! Assigns persistent identities to objects seen across video frames,
//! recognizes people from face embeddings, and decides which known person
//! owns each tracked object.
//!
//! Neural inference, storage and transport stay outside the crate: detectors
//! and face embedders plug in through the [`pipeline`] capability traits, and
//! persistence through the [`store`] traits.
//!
//! ## Features
//!
//! - Greedy IoU tracking with age based eviction
//! - Face recognition by nearest Euclidean embedding
//! - Proximity based object/person association with create/update events
//! - In-memory store for tests and replays
//! - Python bindings behind the `python` feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use custody_rs::{
//!     AssociationConfig, AssociationResolver, Detection, InMemoryStore, RecognizedFace,
//!     Tracker, TrackerConfig,
//! };
//!
//! let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
//! let resolver = AssociationResolver::new(AssociationConfig::default()).unwrap();
//! let mut store = InMemoryStore::new();
//!
//! let objects = tracker.track(vec![Detection::from_xyxy("backpack", 0.9, [100.0, 80.0, 140.0, 120.0])]);
//! let faces = vec![RecognizedFace::identified("alice", custody_rs::BoundingBox::new(60.0, 40.0, 140.0, 160.0))];
//! let events = resolver.resolve(&objects, &faces, &store).unwrap();
//! store.apply(&events).unwrap();
//! ```

// Public modules
pub mod association;
pub mod config;
pub mod detection;
pub mod distances;
pub mod face_matcher;
pub mod matching;
pub mod pipeline;
pub mod store;
pub mod tracked_object;
pub mod tracker;
pub mod utils;

// Optional modules
#[cfg(feature = "python")]
pub mod python;

// Re-exports for convenience
pub use association::{
    Association, AssociationConfig, AssociationResolver, OwnershipEvent, RecognizedFace,
};
pub use config::{Config, DetectionConfig};
pub use detection::{BoundingBox, Detection};
pub use face_matcher::{FaceId, FaceMatch, FaceMatcher, FaceMatcherConfig, KnownFace};
pub use matching::MatchingStrategy;
pub use pipeline::{FaceEmbedder, FaceEmbedding, FrameOutput, ObjectDetector, Pipeline};
pub use store::{FaceStore, InMemoryStore, ObjectStore, PersistedObject};
pub use tracked_object::{IdGeneration, TrackId, TrackIdFactory, TrackedObject};
pub use tracker::{Tracker, TrackerConfig};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the custody library
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid bounding box: {0}")]
        InvalidBoundingBox(String),

        #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
        EmbeddingDimension { expected: usize, got: usize },

        #[error("Unknown tracking id: {0}")]
        UnknownTrack(String),

        #[error("Store error: {0}")]
        Store(String),

        #[error("Capability error: {0}")]
        Capability(String),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),

        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),
    }

    /// Result type for custody operations
    pub type Result<T> = std::result::Result<T, Error>;
}
