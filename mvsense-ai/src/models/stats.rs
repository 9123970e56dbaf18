//! Per-run face statistics

use super::detection::Emotion;
use serde::Serialize;
use std::collections::BTreeMap;

/// Count of dominant emotions within one run
///
/// Bucket totals always equal the number of faces folded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmotionHistogram {
    buckets: BTreeMap<Emotion, u32>,
}

impl EmotionHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, emotion: Emotion) {
        *self.buckets.entry(emotion).or_insert(0) += 1;
    }

    pub fn count(&self, emotion: Emotion) -> u32 {
        self.buckets.get(&emotion).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.buckets.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, u32)> + '_ {
        self.buckets.iter().map(|(emotion, count)| (*emotion, *count))
    }
}

impl FromIterator<(Emotion, u32)> for EmotionHistogram {
    fn from_iter<I: IntoIterator<Item = (Emotion, u32)>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for (emotion, count) in iter {
            if count > 0 {
                *histogram.buckets.entry(emotion).or_insert(0) += count;
            }
        }
        histogram
    }
}

/// Running sum and count of face ages for the current run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AgeAccumulator {
    sum: f64,
    count: u32,
}

impl AgeAccumulator {
    pub fn add(&mut self, age: f64) {
        self.sum += age;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Mean age, 0 when nothing was added
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Attributes of one face as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceSummary {
    pub age: f64,
    pub emotion: Emotion,
    pub gender: String,
}

/// Aggregate of all faces in one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FaceStats {
    pub histogram: EmotionHistogram,
    pub average_age: f64,
    pub face_count: u32,
    pub faces: Vec<FaceSummary>,
}

impl FaceStats {
    /// Average age rounded to two decimals for publishing
    pub fn rounded_average_age(&self) -> f64 {
        (self.average_age * 100.0).round() / 100.0
    }
}
