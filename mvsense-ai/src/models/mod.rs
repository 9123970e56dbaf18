//! Data model for one analysis run
//!
//! Nothing here outlives a run: snapshot references, detections and
//! aggregates are created per trigger and dropped once published.

pub mod detection;
pub mod metrics;
pub mod snapshot;
pub mod stats;

pub use detection::{
    AgeRange, Emotion, EmotionScore, FaceDetail, FaceDetection, Gender, Label, SlotEntry,
    TextDetection,
};
pub use metrics::{topics, MetricValue, PublishedMetric, MIN_SLOTS, SLOT_PLACEHOLDER};
pub use snapshot::{ProbeResponse, Retrievability, SnapshotReference};
pub use stats::{AgeAccumulator, EmotionHistogram, FaceStats, FaceSummary};
