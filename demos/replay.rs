//! Replay a recorded session through the full pipeline.
//!
//! A recording holds known faces and, per frame, the raw detector output and
//! the face found inside each person box. Ownership events are printed as JSON
//! lines and applied to an in-memory store.
//!
//! Run with: cargo run --example replay -- demos/scenario.json
//! Thresholds can be overridden with IOU_THRESHOLD, MAX_AGE, etc.

use std::env;

use log::info;
use nalgebra::DVector;
use serde::Deserialize;

use custody_rs::{
    BoundingBox, Config, Detection, FaceEmbedding, InMemoryStore, KnownFace, Pipeline,
};

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    config: Config,
    known_faces: Vec<RecordedFace>,
    frames: Vec<RecordedFrame>,
}

#[derive(Debug, Deserialize)]
struct RecordedFace {
    face_id: String,
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    #[serde(default)]
    detections: Vec<Detection>,
    #[serde(default)]
    faces: Vec<RecordedEmbedding>,
}

/// Embedder output for one person box.
#[derive(Debug, Deserialize)]
struct RecordedEmbedding {
    region: [f64; 4],
    face_location: [f64; 4],
    embedding: Vec<f64>,
}

fn detect(frame: &RecordedFrame) -> custody_rs::Result<Vec<Detection>> {
    Ok(frame.detections.clone())
}

fn embed(frame: &RecordedFrame, region: &BoundingBox) -> custody_rs::Result<Option<FaceEmbedding>> {
    Ok(frame
        .faces
        .iter()
        .find(|f| BoundingBox::from_xyxy(f.region) == *region)
        .map(|f| FaceEmbedding {
            embedding: DVector::from_vec(f.embedding.clone()),
            face_location: BoundingBox::from_xyxy(f.face_location),
        }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/scenario.json".to_string());
    let recording: Recording = serde_json::from_str(&std::fs::read_to_string(&path)?)?;

    let mut config = recording.config;
    config.apply_env()?;

    let mut faces = InMemoryStore::new();
    for face in recording.known_faces {
        faces.add_face(KnownFace::new(face.face_id, face.embedding));
    }

    let mut pipeline = Pipeline::new(config, detect, embed, &faces)?;
    let mut store = InMemoryStore::new();

    for frame in &recording.frames {
        let output = pipeline.process_frame(frame, &store)?;
        for event in &output.events {
            println!("{}", serde_json::to_string(event)?);
        }
        store.apply(&output.events)?;
    }

    info!(
        "Replayed {} frames: {} tracks created, {} objects persisted",
        pipeline.frame_count(),
        pipeline.tracker().total_object_count(),
        store.object_count()
    );
    for face_id in pipeline.matcher().face_ids() {
        let owned: Vec<String> = store
            .objects_owned_by(face_id)
            .iter()
            .map(|o| format!("{} {}", o.class_name, o.tracking_id))
            .collect();
        if !owned.is_empty() {
            info!("{} owns: {}", face_id, owned.join(", "));
        }
    }

    Ok(())
}
