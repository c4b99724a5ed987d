//! Integration tests for custody-rs.
//!
//! These tests verify complete workflows across tracker, face matcher,
//! association resolver and store.

use approx::assert_relative_eq;
use nalgebra::DVector;

use custody_rs::{
    distances::iou, AssociationConfig, AssociationResolver, BoundingBox, Config, Detection,
    FaceEmbedding, FaceId, FaceMatcher, FaceMatcherConfig, IdGeneration, InMemoryStore, KnownFace,
    ObjectStore, OwnershipEvent, Pipeline, RecognizedFace, TrackId, Tracker, TrackerConfig,
};

fn sequential_tracker(iou_threshold: f64, max_age: u32) -> Tracker {
    let mut config = TrackerConfig::new(iou_threshold, max_age);
    config.id_generation = IdGeneration::Sequential;
    Tracker::new(config).expect("valid tracker config")
}

fn resolver() -> AssociationResolver {
    AssociationResolver::new(AssociationConfig::default()).expect("valid association config")
}

/// Square box of side `size` centred on `(cx, cy)`.
fn centred(cx: f64, cy: f64, size: f64) -> BoundingBox {
    let half = size / 2.0;
    BoundingBox::new(cx - half, cy - half, cx + half, cy + half)
}

fn face(face_id: &str, cx: f64, cy: f64) -> RecognizedFace {
    RecognizedFace::identified(face_id, centred(cx, cy, 80.0))
}

// =============================================================================
// Test 1: End-to-end ownership scenario
// =============================================================================

#[test]
fn test_integration_end_to_end_scenario() {
    let mut tracker = sequential_tracker(0.5, 30);
    let resolver = resolver();
    let mut store = InMemoryStore::new();

    // Frame 1: F1 at (100, 100), backpack at (120, 100)
    let objects = tracker.track(vec![Detection::new("backpack", 0.9, centred(120.0, 100.0, 40.0))]);
    let t1 = objects[0].tracking_id.expect("tracked");
    let events = resolver
        .resolve(&objects, &[face("F1", 100.0, 100.0)], &store)
        .unwrap();

    assert_eq!(events.len(), 1);
    match &events[0] {
        OwnershipEvent::Create {
            tracking_id,
            class_name,
            owner_id,
            ..
        } => {
            assert_eq!(*tracking_id, t1);
            assert_eq!(class_name, "backpack");
            assert_eq!(owner_id, &FaceId::from("F1"));
        }
        other => panic!("expected Create, got {:?}", other),
    }
    store.apply(&events).unwrap();

    // Frame 2: backpack drifts to (125, 105), F1 is 500px away
    let objects = tracker.track(vec![Detection::new("backpack", 0.9, centred(125.0, 105.0, 40.0))]);
    assert_eq!(objects[0].tracking_id, Some(t1));
    let events = resolver
        .resolve(&objects, &[face("F1", 625.0, 105.0)], &store)
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(store.get_owner(&t1).unwrap(), Some(FaceId::from("F1")));
}

// =============================================================================
// Test 2: Tracker identity, eviction and class isolation
// =============================================================================

#[test]
fn test_integration_identity_stable_under_small_motion() {
    let mut tracker = sequential_tracker(0.5, 30);
    let mut ids = Vec::new();

    for frame in 0..50 {
        let x = 100.0 + frame as f64 * 2.0;
        let out = tracker.track(vec![Detection::new("suitcase", 0.8, centred(x, 200.0, 60.0))]);
        ids.push(out[0].tracking_id.expect("tracked"));
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(tracker.total_object_count(), 1);
    assert_eq!(tracker.tracked_objects()[0].frames_tracked, 50);
}

#[test]
fn test_integration_eviction_and_new_identity() {
    let max_age = 3;
    let mut tracker = sequential_tracker(0.5, max_age);
    let bbox = centred(100.0, 100.0, 50.0);

    let first = tracker.track(vec![Detection::new("laptop", 0.9, bbox)])[0]
        .tracking_id
        .expect("tracked");

    // Alive through max_age empty frames, gone after max_age + 1
    for _ in 0..max_age {
        tracker.track(Vec::new());
        assert_eq!(tracker.current_object_count(), 1);
    }
    tracker.track(Vec::new());
    assert_eq!(tracker.current_object_count(), 0);

    let second = tracker.track(vec![Detection::new("laptop", 0.9, bbox)])[0]
        .tracking_id
        .expect("tracked");
    assert_ne!(first, second);
}

#[test]
fn test_integration_class_isolation() {
    let mut tracker = sequential_tracker(0.5, 30);
    let bbox = centred(100.0, 100.0, 50.0);

    let a = tracker.track(vec![Detection::new("backpack", 0.9, bbox)]);
    let b = tracker.track(vec![Detection::new("handbag", 0.9, bbox)]);

    assert_relative_eq!(iou(&bbox, &bbox), 1.0);
    assert_ne!(a[0].tracking_id, b[0].tracking_id);
    assert_eq!(tracker.current_object_count(), 2);
}

// =============================================================================
// Test 3: Face matching feeding association
// =============================================================================

#[test]
fn test_integration_recognized_faces_drive_ownership() {
    let mut matcher = FaceMatcher::new(FaceMatcherConfig::default()).unwrap();
    matcher
        .load(vec![
            KnownFace::new("alice", vec![0.0, 0.0, 0.0]),
            KnownFace::new("bob", vec![1.0, 1.0, 1.0]),
        ])
        .unwrap();

    let mut tracker = sequential_tracker(0.5, 30);
    let resolver = resolver();
    let mut store = InMemoryStore::new();

    let mut person = RecognizedFace::new(centred(100.0, 100.0, 80.0), 0.95);
    person.face_id = matcher.recognize(&DVector::from_vec(vec![0.9, 1.0, 1.1]));
    assert_eq!(person.face_id, Some(FaceId::from("bob")));

    let objects = tracker.track(vec![Detection::new("umbrella", 0.7, centred(150.0, 100.0, 30.0))]);
    let events = resolver.resolve(&objects, &[person], &store).unwrap();
    store.apply(&events).unwrap();

    let owned = store.objects_owned_by(&FaceId::from("bob"));
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].class_name, "umbrella");
}

#[test]
fn test_integration_face_tolerance_boundary() {
    // 3-4-5 triangle keeps the boundary distance exact
    let mut matcher = FaceMatcher::new(FaceMatcherConfig::new(5.0)).unwrap();
    matcher.add(KnownFace::new("A", vec![0.0, 0.0])).unwrap();

    assert_eq!(matcher.recognize(&DVector::from_vec(vec![3.0, 4.0])), None);
    assert_eq!(
        matcher.recognize(&DVector::from_vec(vec![3.0, 4.0 - 1e-9])),
        Some(FaceId::from("A"))
    );
}

// =============================================================================
// Test 4: Ownership idempotence, monotonicity and transfer
// =============================================================================

#[test]
fn test_integration_resolve_is_idempotent() {
    let mut tracker = sequential_tracker(0.5, 30);
    let resolver = resolver();
    let mut store = InMemoryStore::new();
    let faces = [face("A", 100.0, 100.0)];

    let objects = tracker.track(vec![Detection::new("backpack", 0.9, centred(110.0, 100.0, 40.0))]);
    let first = resolver.resolve(&objects, &faces, &store).unwrap();
    assert_eq!(first.len(), 1);
    store.apply(&first).unwrap();

    let second = resolver.resolve(&objects, &faces, &store).unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_integration_ownership_is_monotonic_then_transfers() {
    let mut tracker = sequential_tracker(0.5, 30);
    let resolver = resolver();
    let mut store = InMemoryStore::new();
    let bbox = centred(300.0, 300.0, 40.0);

    let objects = tracker.track(vec![Detection::new("suitcase", 0.9, bbox)]);
    let id = objects[0].tracking_id.expect("tracked");
    store
        .apply(&resolver.resolve(&objects, &[face("A", 300.0, 320.0)], &store).unwrap())
        .unwrap();

    // Nobody nearby for a while: ownership stays with A
    for _ in 0..5 {
        let objects = tracker.track(vec![Detection::new("suitcase", 0.9, bbox)]);
        let events = resolver.resolve(&objects, &[], &store).unwrap();
        assert!(events.is_empty());
    }
    assert_eq!(store.get_owner(&id).unwrap(), Some(FaceId::from("A")));

    // B is now the closest face within range
    let objects = tracker.track(vec![Detection::new("suitcase", 0.9, bbox)]);
    let events = resolver
        .resolve(&objects, &[face("A", 300.0, 450.0), face("B", 310.0, 300.0)], &store)
        .unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], OwnershipEvent::Update { .. }));
    store.apply(&events).unwrap();

    let object = store.get_object(&id).unwrap().expect("persisted");
    assert_eq!(object.owner_id, Some(FaceId::from("B")));
    assert!(object.last_seen >= object.first_seen);
}

#[test]
fn test_integration_unknown_track_update_is_reported() {
    let mut store = InMemoryStore::new();
    let id: TrackId = "00000000-0000-0000-0000-00000000002a".parse().unwrap();
    let event = OwnershipEvent::Update {
        tracking_id: id,
        owner_id: FaceId::from("A"),
        seen_at: chrono::Utc::now(),
    };

    let err = store.apply(&[event]).unwrap_err();
    assert!(matches!(err, custody_rs::Error::UnknownTrack(_)));
}

// =============================================================================
// Test 5: Full pipeline with closure backends
// =============================================================================

struct Frame {
    detections: Vec<Detection>,
    face: Option<(BoundingBox, Vec<f64>)>,
}

#[test]
fn test_integration_pipeline_over_frames() {
    let mut faces = InMemoryStore::new();
    faces.add_face(KnownFace::new("F1", vec![0.2, 0.2]));

    let mut config = Config::default();
    config.tracker.id_generation = IdGeneration::Sequential;

    let detector = |frame: &Frame| -> custody_rs::Result<Vec<Detection>> { Ok(frame.detections.clone()) };
    let embedder = |frame: &Frame, region: &BoundingBox| -> custody_rs::Result<Option<FaceEmbedding>> {
        Ok(frame
            .face
            .as_ref()
            .filter(|(bbox, _)| bbox == region)
            .map(|(bbox, e)| FaceEmbedding {
                embedding: DVector::from_vec(e.clone()),
                face_location: *bbox,
            }))
    };
    let mut pipeline = Pipeline::new(config, detector, embedder, &faces).unwrap();
    let mut store = InMemoryStore::new();

    let person = centred(100.0, 100.0, 100.0);
    let frames = vec![
        Frame {
            detections: vec![
                Detection::new("person", 0.9, person),
                Detection::new("backpack", 0.9, centred(120.0, 100.0, 40.0)),
            ],
            face: Some((person, vec![0.25, 0.2])),
        },
        Frame {
            detections: vec![Detection::new("backpack", 0.9, centred(125.0, 105.0, 40.0))],
            face: None,
        },
    ];

    let mut event_counts = Vec::new();
    for frame in &frames {
        let output = pipeline.process_frame(frame, &store).unwrap();
        store.apply(&output.events).unwrap();
        event_counts.push(output.events.len());
    }

    assert_eq!(event_counts, vec![1, 0]);
    assert_eq!(pipeline.frame_count(), 2);
    assert_eq!(store.objects_owned_by(&FaceId::from("F1")).len(), 1);
}
