//! Recognition result types
//!
//! Field names follow the recognition service's wire shapes (PascalCase),
//! so these types deserialize straight from response bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotion reported for a face
///
/// Only the first six take part in word-cloud encoding; the rest still count
/// toward the histogram so that bucket totals match the face count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprised,
    Calm,
    Fear,
    Disgusted,
    Confused,
    #[serde(other)]
    Unknown,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "HAPPY",
            Emotion::Sad => "SAD",
            Emotion::Angry => "ANGRY",
            Emotion::Surprised => "SURPRISED",
            Emotion::Calm => "CALM",
            Emotion::Fear => "FEAR",
            Emotion::Disgusted => "DISGUSTED",
            Emotion::Confused => "CONFUSED",
            Emotion::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgeRange {
    pub low: u32,
    pub high: u32,
}

impl AgeRange {
    pub fn midpoint(&self) -> f64 {
        (f64::from(self.low) + f64::from(self.high)) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmotionScore {
    #[serde(rename = "Type")]
    pub kind: Emotion,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Gender {
    pub value: String,
    #[serde(default)]
    pub confidence: f64,
}

/// One detected face with full attributes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceDetail {
    pub age_range: AgeRange,
    pub emotions: Vec<EmotionScore>,
    pub gender: Gender,
    /// Confidence that the bounding box contains a face
    #[serde(default)]
    pub confidence: f64,
}

impl FaceDetail {
    /// Emotion with the highest confidence; the first one wins ties
    pub fn dominant_emotion(&self) -> Option<Emotion> {
        self.emotions
            .iter()
            .fold(None::<&EmotionScore>, |best, score| match best {
                Some(b) if b.confidence >= score.confidence => Some(b),
                _ => Some(score),
            })
            .map(|score| score.kind)
    }
}

/// Outcome of face detection for one run
///
/// Detection failures do not abort a run. `Unavailable` keeps the failure
/// visible to callers while `faces()` still yields an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceDetection {
    Detected(Vec<FaceDetail>),
    Unavailable { reason: String },
}

impl FaceDetection {
    pub fn faces(&self) -> &[FaceDetail] {
        match self {
            FaceDetection::Detected(faces) => faces,
            FaceDetection::Unavailable { .. } => &[],
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FaceDetection::Unavailable { .. })
    }
}

/// Scene label (e.g. "Person", "Car")
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    pub name: String,
    pub confidence: f64,
}

/// Text found in the image (a line or a word)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextDetection {
    pub detected_text: String,
    pub confidence: f64,
}

/// A detection that occupies one indexed dashboard slot
pub trait SlotEntry {
    fn slot_text(&self) -> &str;
    fn slot_confidence(&self) -> f64;

    /// `"<text> - <confidence to 3 decimals> %"`
    fn slot_value(&self) -> String {
        format!("{} - {:.3} %", self.slot_text(), self.slot_confidence())
    }
}

impl SlotEntry for Label {
    fn slot_text(&self) -> &str {
        &self.name
    }

    fn slot_confidence(&self) -> f64 {
        self.confidence
    }
}

impl SlotEntry for TextDetection {
    fn slot_text(&self) -> &str {
        &self.detected_text
    }

    fn slot_confidence(&self) -> f64 {
        self.confidence
    }
}
