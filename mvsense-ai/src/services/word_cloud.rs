//! Word-cloud text encoding
//!
//! The word-cloud renderer misbehaves when a single word repeats more than
//! six times, so counts are compressed: one token per emotion present, plus
//! one extra token per complete multiple of six.
//!
//! HAPPY is clamped to 24 before the division; no other emotion is clamped.
//! SAD is rendered with the CALM token.

use crate::models::{Emotion, EmotionHistogram};

/// Count step that earns one extra repeat
pub const REPEAT_STEP: u32 = 6;

/// Clamp applied to the HAPPY bucket only
pub const HAPPY_CAP: u32 = 24;

/// Emission order, token and optional clamp for each rendered emotion
const RENDERED: [(Emotion, &str, Option<u32>); 6] = [
    (Emotion::Happy, "HAPPY", Some(HAPPY_CAP)),
    (Emotion::Sad, "CALM", None),
    (Emotion::Surprised, "SURPRISED", None),
    (Emotion::Calm, "CALM", None),
    (Emotion::Angry, "ANGRY", None),
    (Emotion::Fear, "FEAR", None),
];

/// Builds word-cloud text and the renderer URL
#[derive(Debug, Clone)]
pub struct WordCloudEncoder {
    base_url: String,
}

impl WordCloudEncoder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Space-separated token blob for one histogram
    pub fn encode(histogram: &EmotionHistogram) -> String {
        let mut tokens: Vec<&str> = Vec::new();

        for (emotion, token, cap) in RENDERED {
            let count = histogram.count(emotion);
            if count == 0 {
                continue;
            }

            let capped = cap.map_or(count, |c| count.min(c));
            let repeats = 1 + capped / REPEAT_STEP;
            tokens.extend(std::iter::repeat(token).take(repeats as usize));
        }

        tokens.join(" ")
    }

    /// Renderer URL with the blob embedded verbatim
    pub fn url(&self, blob: &str) -> String {
        format!(
            "{}?text={}&backgroundColor=black&case=upper&rotation=0",
            self.base_url, blob
        )
    }

    /// URL shown before any analysis has run
    pub fn blank_url(&self) -> String {
        self.url(" ")
    }
}
