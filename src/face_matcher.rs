//! Face re-identification against a set of known embeddings.

use std::collections::HashSet;
use std::fmt;

use log::{debug, trace};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::distances::{argmin, embedding_distances};
use crate::utils::warn_once;
use crate::{Error, Result};

/// Opaque identifier of a known face.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceId(String);

impl FaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier (hyphenated v4 UUID).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FaceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A face whose identity is already known.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownFace {
    pub face_id: FaceId,
    pub embedding: DVector<f64>,
}

impl KnownFace {
    pub fn new(face_id: impl Into<FaceId>, embedding: Vec<f64>) -> Self {
        Self {
            face_id: face_id.into(),
            embedding: DVector::from_vec(embedding),
        }
    }
}

/// Closest known face to a probe embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub face_id: FaceId,
    pub distance: f64,
}

/// Configuration for the face matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceMatcherConfig {
    /// Embedding distance a known face must stay strictly below to count as
    /// the same person. Lower is stricter.
    pub tolerance: f64,
}

impl FaceMatcherConfig {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "face tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

impl Default for FaceMatcherConfig {
    fn default() -> Self {
        Self { tolerance: 0.6 }
    }
}

/// Resolves face embeddings to known identities.
///
/// The set of known faces is append-only: faces are loaded in bulk at start
/// up and added one by one as new people are enrolled. A known face never
/// changes or disappears within a run. All embeddings share one
/// dimensionality, fixed by the first face added.
#[derive(Debug, Clone)]
pub struct FaceMatcher {
    pub config: FaceMatcherConfig,
    face_ids: Vec<FaceId>,
    embeddings: Vec<DVector<f64>>,
    known_ids: HashSet<FaceId>,
}

impl FaceMatcher {
    pub fn new(config: FaceMatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            face_ids: Vec::new(),
            embeddings: Vec::new(),
            known_ids: HashSet::new(),
        })
    }

    /// Bulk-load known faces.
    ///
    /// Faces whose id is already known and faces with an empty embedding are
    /// skipped. The whole batch is rejected, leaving the matcher unchanged,
    /// if any embedding has the wrong dimensionality.
    ///
    /// # Returns
    /// Number of faces actually added
    pub fn load(&mut self, known: impl IntoIterator<Item = KnownFace>) -> Result<usize> {
        let mut dimension = self.dimension();
        let mut batch: Vec<KnownFace> = Vec::new();
        let mut batch_ids: HashSet<FaceId> = HashSet::new();

        for face in known {
            if face.embedding.is_empty() {
                debug!("skipping face {} without an embedding", face.face_id);
                continue;
            }
            if self.known_ids.contains(&face.face_id) || batch_ids.contains(&face.face_id) {
                trace!("face {} already known", face.face_id);
                continue;
            }
            match dimension {
                Some(expected) if expected != face.embedding.len() => {
                    return Err(Error::EmbeddingDimension {
                        expected,
                        got: face.embedding.len(),
                    });
                }
                Some(_) => {}
                None => dimension = Some(face.embedding.len()),
            }
            batch_ids.insert(face.face_id.clone());
            batch.push(face);
        }

        let added = batch.len();
        for face in batch {
            self.push(face);
        }

        debug!("loaded {} known faces ({} total)", added, self.len());
        Ok(added)
    }

    /// Add a single known face.
    ///
    /// # Returns
    /// `false` when a face with that id is already known (nothing changes)
    pub fn add(&mut self, face: KnownFace) -> Result<bool> {
        if face.embedding.is_empty() {
            return Err(Error::EmbeddingDimension {
                expected: self.dimension().unwrap_or(0),
                got: 0,
            });
        }
        if let Some(expected) = self.dimension() {
            if expected != face.embedding.len() {
                return Err(Error::EmbeddingDimension {
                    expected,
                    got: face.embedding.len(),
                });
            }
        }
        if self.known_ids.contains(&face.face_id) {
            return Ok(false);
        }
        self.push(face);
        Ok(true)
    }

    /// Register a previously unseen face under a fresh id.
    pub fn enroll(&mut self, embedding: DVector<f64>) -> Result<FaceId> {
        let face_id = FaceId::generate();
        self.add(KnownFace {
            face_id: face_id.clone(),
            embedding,
        })?;
        debug!("enrolled new face {}", face_id);
        Ok(face_id)
    }

    /// Closest known face to `embedding`, regardless of tolerance.
    ///
    /// Returns `None` when no faces are known or the dimensionality differs.
    pub fn best_match(&self, embedding: &DVector<f64>) -> Option<FaceMatch> {
        if self.embeddings.is_empty() || Some(embedding.len()) != self.dimension() {
            return None;
        }
        let distances = embedding_distances(&self.embeddings, embedding);
        argmin(&distances).map(|(idx, distance)| FaceMatch {
            face_id: self.face_ids[idx].clone(),
            distance,
        })
    }

    /// Identify a face embedding.
    ///
    /// A known face matches when its distance is strictly below the tolerance.
    /// If at least one face matches, the globally closest known face is
    /// returned provided it is itself a match.
    ///
    /// # Returns
    /// The identity, or `None` for an unknown face. Never fails: an empty
    /// known set or a probe of the wrong dimensionality is simply unknown.
    pub fn recognize(&self, embedding: &DVector<f64>) -> Option<FaceId> {
        if self.embeddings.is_empty() {
            return None;
        }
        if let Some(expected) = self.dimension() {
            if expected != embedding.len() {
                warn_once(&format!(
                    "face embedding has {} dimensions, known faces have {}",
                    embedding.len(),
                    expected
                ));
                return None;
            }
        }

        let distances = embedding_distances(&self.embeddings, embedding);
        let tolerance = self.config.tolerance;
        let matches: Vec<bool> = distances.iter().map(|&d| d < tolerance).collect();

        if !matches.iter().any(|&m| m) {
            return None;
        }

        let (best_idx, best_distance) = argmin(&distances)?;
        if matches[best_idx] {
            trace!(
                "recognized face {} at distance {:.4}",
                self.face_ids[best_idx],
                best_distance
            );
            Some(self.face_ids[best_idx].clone())
        } else {
            None
        }
    }

    /// Embedding of a known face.
    pub fn embedding(&self, face_id: &FaceId) -> Option<&DVector<f64>> {
        self.face_ids
            .iter()
            .position(|id| id == face_id)
            .map(|idx| &self.embeddings[idx])
    }

    pub fn contains(&self, face_id: &FaceId) -> bool {
        self.known_ids.contains(face_id)
    }

    /// Known face ids in insertion order.
    pub fn face_ids(&self) -> &[FaceId] {
        &self.face_ids
    }

    /// Dimensionality shared by all known embeddings.
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(|e| e.len())
    }

    pub fn len(&self) -> usize {
        self.face_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_ids.is_empty()
    }

    fn push(&mut self, face: KnownFace) {
        self.known_ids.insert(face.face_id.clone());
        self.face_ids.push(face.face_id);
        self.embeddings.push(face.embedding);
    }
}
