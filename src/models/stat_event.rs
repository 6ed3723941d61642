//! Stat event envelope
//!
//! One envelope per broker message. Only the tag is typed; the attribute
//! payload stays dynamic until the coercer reads it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Untyped attribute payload of a stat event
pub type Attributes = Map<String, Value>;

/// Stat event categories published by the detection pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatEventType {
    /// One detected object in one frame
    ObjectDetection,
    /// Tracker output for an already detected object
    ObjectTracking,
    /// Clip-level event classification
    VideoClassification,
}

impl StatEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatEventType::ObjectDetection => "OBJECT_DETECTION",
            StatEventType::ObjectTracking => "OBJECT_TRACKING",
            StatEventType::VideoClassification => "VIDEO_CLASSIFICATION",
        }
    }
}

impl std::fmt::Display for StatEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEvent {
    #[serde(rename = "type")]
    pub event_type: StatEventType,
    #[serde(default, deserialize_with = "nullable_attributes")]
    pub attributes: Attributes,
}

impl StatEvent {
    pub fn new(event_type: StatEventType) -> Self {
        Self {
            event_type,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

// `"attributes": null` reads as an empty payload
fn nullable_attributes<'de, D>(deserializer: D) -> Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Attributes>::deserialize(deserializer)?.unwrap_or_default())
}
