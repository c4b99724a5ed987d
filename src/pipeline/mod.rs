//! Per-frame orchestration of detection, tracking, recognition and
//! association.

mod traits;

pub use traits::{FaceEmbedder, FaceEmbedding, ObjectDetector};

use log::{debug, info};

use crate::association::{AssociationResolver, OwnershipEvent, RecognizedFace};
use crate::config::{Config, DetectionConfig};
use crate::detection::Detection;
use crate::face_matcher::FaceMatcher;
use crate::store::{FaceStore, ObjectStore};
use crate::tracker::Tracker;
use crate::utils::filter_detections;

/// Everything the pipeline learned from one frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// 1-based index of the frame within this pipeline.
    pub frame_index: u64,

    /// Target-class detections with their tracking ids.
    pub objects: Vec<Detection>,

    /// Person detections with recognized identities where available.
    pub faces: Vec<RecognizedFace>,

    /// Ownership changes the caller should persist, in object order.
    pub events: Vec<OwnershipEvent>,
}

/// Detector, embedder and the three core components wired together.
///
/// The pipeline never writes to persistence; events in [`FrameOutput`] are
/// applied by the caller.
pub struct Pipeline<D, E> {
    pub detection: DetectionConfig,
    detector: D,
    embedder: E,
    tracker: Tracker,
    matcher: FaceMatcher,
    resolver: AssociationResolver,
    frame_count: u64,
}

impl<D, E> Pipeline<D, E> {
    /// Build a pipeline and load known faces.
    ///
    /// # Arguments
    /// * `config` - Validated before anything else is built
    /// * `detector` - Object detection backend
    /// * `embedder` - Face embedding backend
    /// * `faces` - Source of known faces, read once
    pub fn new<S: FaceStore + ?Sized>(
        config: Config,
        detector: D,
        embedder: E,
        faces: &S,
    ) -> crate::Result<Self> {
        config.validate()?;
        let tracker = Tracker::new(config.tracker)?;
        let mut matcher = FaceMatcher::new(config.face_matcher)?;
        let resolver = AssociationResolver::new(config.association)?;

        let loaded = matcher.load(faces.load_known_faces()?)?;
        info!("Loaded {} known faces", loaded);

        Ok(Self {
            detection: config.detection,
            detector,
            embedder,
            tracker,
            matcher,
            resolver,
            frame_count: 0,
        })
    }

    /// Run one frame through the whole pipeline.
    ///
    /// Detects once, routes person detections to face recognition and
    /// target-class detections to the tracker, then resolves ownership
    /// against `store`.
    ///
    /// # Returns
    /// The frame's tracked objects, recognized faces and ownership events.
    /// Detector, embedder and store failures are propagated; tracker state
    /// is left untouched when detection fails.
    pub fn process_frame<F, S>(&mut self, frame: &F, store: &S) -> crate::Result<FrameOutput>
    where
        F: ?Sized,
        D: ObjectDetector<F>,
        E: FaceEmbedder<F>,
        S: ObjectStore + ?Sized,
    {
        let raw = self.detector.detect(frame)?;
        let threshold = self.detection.confidence_threshold;

        let persons: Vec<Detection> = raw
            .iter()
            .filter(|d| d.class_name == self.detection.person_class && d.confidence > threshold)
            .cloned()
            .collect();
        let objects = filter_detections(raw, threshold, Some(&self.detection.target_classes[..]));

        let mut faces = Vec::with_capacity(persons.len());
        for person in persons {
            faces.push(self.recognize_person(frame, person)?);
        }

        self.frame_count += 1;
        let objects = self.tracker.track(objects);
        let events = self.resolver.resolve(&objects, &faces, store)?;

        debug!(
            "frame {}: {} objects, {} persons ({} identified), {} events",
            self.frame_count,
            objects.len(),
            faces.len(),
            faces.iter().filter(|f| f.face_id.is_some()).count(),
            events.len()
        );

        Ok(FrameOutput {
            frame_index: self.frame_count,
            objects,
            faces,
            events,
        })
    }

    fn recognize_person<F>(&self, frame: &F, person: Detection) -> crate::Result<RecognizedFace>
    where
        F: ?Sized,
        E: FaceEmbedder<F>,
    {
        let mut face = RecognizedFace::new(person.bbox, person.confidence);
        // Nothing to crop
        if !person.bbox.is_valid() {
            return Ok(face);
        }
        if let Some(found) = self.embedder.embed(frame, &person.bbox)? {
            face.face_id = self.matcher.recognize(&found.embedding);
            face.face_location = Some(found.face_location);
            face.embedding = Some(found.embedding);
        }
        Ok(face)
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn matcher(&self) -> &FaceMatcher {
        &self.matcher
    }

    /// Mutable matcher, for enrolling faces between frames.
    pub fn matcher_mut(&mut self) -> &mut FaceMatcher {
        &mut self.matcher
    }

    pub fn resolver(&self) -> &AssociationResolver {
        &self.resolver
    }

    /// Number of frames processed successfully.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
