//! Aggregate configuration with JSON and environment loading.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::association::AssociationConfig;
use crate::face_matcher::FaceMatcherConfig;
use crate::tracker::TrackerConfig;
use crate::{Error, Result};

/// Environment variable names read by [`Config::apply_env`].
pub const ENV_CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";
pub const ENV_FACE_RECOGNITION_TOLERANCE: &str = "FACE_RECOGNITION_TOLERANCE";
pub const ENV_IOU_THRESHOLD: &str = "IOU_THRESHOLD";
pub const ENV_MAX_AGE: &str = "MAX_AGE";
pub const ENV_DISTANCE_THRESHOLD: &str = "DISTANCE_THRESHOLD";

/// Which raw detections reach the tracker and the face stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detections must score strictly above this to be kept.
    pub confidence_threshold: f64,

    /// Class routed to face recognition instead of the tracker.
    pub person_class: String,

    /// Classes the tracker follows.
    pub target_classes: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            person_class: "person".to_string(),
            target_classes: ["backpack", "umbrella", "handbag", "suitcase", "laptop"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::InvalidConfig(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.target_classes.contains(&self.person_class) {
            return Err(Error::InvalidConfig(format!(
                "person class '{}' cannot also be a target class",
                self.person_class
            )));
        }
        Ok(())
    }

    /// Whether `class_name` is one of the tracked classes.
    pub fn is_target(&self, class_name: &str) -> bool {
        self.target_classes.iter().any(|c| c == class_name)
    }
}

/// Configuration for every component of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub tracker: TrackerConfig,
    pub face_matcher: FaceMatcherConfig,
    pub association: AssociationConfig,
}

impl Config {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        self.tracker.validate()?;
        self.face_matcher.validate()?;
        self.association.validate()?;
        Ok(())
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from the process environment.
    ///
    /// Unset variables leave the field untouched. A variable that is set but
    /// does not parse is an error.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, or `None` if unset
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, ENV_CONFIDENCE_THRESHOLD)? {
            self.detection.confidence_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_FACE_RECOGNITION_TOLERANCE)? {
            self.face_matcher.tolerance = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_IOU_THRESHOLD)? {
            self.tracker.iou_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_AGE)? {
            self.tracker.max_age = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_DISTANCE_THRESHOLD)? {
            self.association.distance_threshold = v;
        }
        self.validate()
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("{}={:?}: {}", name, raw, e))),
    }
}
