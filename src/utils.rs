//! Utility functions.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use crate::Detection;

/// Global set of warned messages (for warn_once).
static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Log a warning message only once per process.
///
/// Subsequent calls with the same message are ignored.
pub fn warn_once(message: &str) {
    let warned = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));
    // A poisoned set only means another thread panicked mid-insert
    let mut guard = match warned.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.insert(message.to_string()) {
        log::warn!("{}", message);
    }
}

/// Keep detections above a confidence threshold, optionally restricted to a
/// set of classes.
///
/// Confidence must be strictly greater than `confidence_threshold`. Input
/// order is preserved.
///
/// # Arguments
/// * `detections` - Raw detector output
/// * `confidence_threshold` - Exclusive lower bound on confidence
/// * `classes` - Class names to keep; `None` keeps every class
pub fn filter_detections<S: AsRef<str>>(
    detections: Vec<Detection>,
    confidence_threshold: f64,
    classes: Option<&[S]>,
) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|det| det.confidence > confidence_threshold)
        .filter(|det| match classes {
            Some(classes) => classes.iter().any(|c| c.as_ref() == det.class_name),
            None => true,
        })
        .collect()
}
