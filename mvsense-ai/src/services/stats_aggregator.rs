//! Face statistics aggregation
//!
//! Folds one run's face detections into an emotion histogram, mean age and
//! face count. All state lives in a `FaceAccumulation` created per run, so
//! nothing carries over from a previous trigger.

use crate::models::{
    AgeAccumulator, Emotion, EmotionHistogram, FaceDetail, FaceStats, FaceSummary,
};

/// Per-run aggregation context
#[derive(Debug, Default)]
pub struct FaceAccumulation {
    histogram: EmotionHistogram,
    ages: AgeAccumulator,
    faces: Vec<FaceSummary>,
}

impl FaceAccumulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one face: dominant emotion bucket, age midpoint, face count
    pub fn fold(&mut self, face: &FaceDetail) {
        // A face without emotion scores still counts, so bucket totals stay
        // equal to the face count.
        let emotion = face.dominant_emotion().unwrap_or(Emotion::Unknown);
        let age = face.age_range.midpoint();

        self.histogram.record(emotion);
        self.ages.add(age);
        self.faces.push(FaceSummary {
            age,
            emotion,
            gender: face.gender.value.clone(),
        });
    }

    pub fn finish(self) -> FaceStats {
        FaceStats {
            average_age: self.ages.average(),
            face_count: self.ages.count(),
            histogram: self.histogram,
            faces: self.faces,
        }
    }
}

pub struct StatsAggregator;

impl StatsAggregator {
    /// Aggregate a batch of faces from a single run
    pub fn aggregate(faces: &[FaceDetail]) -> FaceStats {
        let mut accumulation = FaceAccumulation::new();
        for face in faces {
            accumulation.fold(face);
            tracing::info!(
                age_low = face.age_range.low,
                age_high = face.age_range.high,
                emotion = %face.dominant_emotion().unwrap_or(Emotion::Unknown),
                gender = %face.gender.value,
                "Facial analysis"
            );
        }

        let stats = accumulation.finish();
        tracing::debug!(
            faces = stats.face_count,
            average_age = stats.average_age,
            "Face statistics aggregated"
        );
        stats
    }
}
