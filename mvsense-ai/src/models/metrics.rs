//! Published metric unit and the dashboard topic namespace

use std::fmt;

/// Flat topic namespace consumed by the dashboard
pub mod topics {
    pub const AGE: &str = "Age";
    pub const EMOTIONAL_STATE: &str = "EmotionalState";
    pub const GENDER: &str = "Gender";
    pub const WORD_CLOUD_URL: &str = "wordcloudurl";
    pub const AVERAGE_AGE: &str = "averageage";
    pub const FACE_COUNT: &str = "facecount";
    pub const SNAP: &str = "Snap";
    pub const ABOUT: &str = "About";
    pub const LABEL_PREFIX: &str = "Label";
    pub const DETECTED_TEXT_PREFIX: &str = "DetectedText";

    /// Trigger topic for a camera's motion stream
    pub fn trigger(serial: &str) -> String {
        format!("/merakimv/{}/0", serial)
    }
}

/// Value written to unused list slots
pub const SLOT_PLACEHOLDER: &str = " - ";

/// Slot count the dashboard layout assumes for label and text lists
pub const MIN_SLOTS: usize = 6;

/// Scalar or string payload of one publish
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Int(value)
    }
}

/// One topic/value pair sent to the bus
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMetric {
    pub topic: String,
    pub value: MetricValue,
}

impl PublishedMetric {
    pub fn new(topic: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
        }
    }

    /// Wire payload
    pub fn payload(&self) -> String {
        self.value.to_string()
    }
}
