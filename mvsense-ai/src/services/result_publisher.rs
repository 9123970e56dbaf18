//! Dashboard metric publishing
//!
//! Builders in this module are pure: they turn one run's results into an
//! ordered list of `PublishedMetric`s. `ResultPublisher` only pushes those
//! lists onto the bus, one publish per metric.
//!
//! # Slot padding
//! Label and detected-text lists are published as `Label0..` and
//! `DetectedText0..`. At least six slots are always written; unused ones carry
//! `" - "`. Longer lists are published in full.

use super::mqtt_bus::MessageBus;
use crate::error::PipelineResult;
use crate::models::{
    topics, FaceStats, MetricValue, PublishedMetric, SlotEntry, MIN_SLOTS, SLOT_PLACEHOLDER,
};
use std::sync::Arc;

/// Image shown in the `Snap` and `About` tiles before any analysis
pub const PLACEHOLDER_IMAGE_URL: &str = "https://lh6.googleusercontent.com/EKfcRcl5hbL3T3bdf-cnIMPIkphMv77g3fh8ubAIjPD0Kjpj7LweVMUm-WT9gEZbXOUTCHnKZEgH9CHaN4GmAVODcXiBYZlq80_Pd-AFTpIiBuELd4c1cYN2TzWzx7hQpQ=w1280";

/// Text shown in the per-face tiles before any analysis
pub const WAITING_TEXT: &str = "Waiting for Analysis";

pub struct ResultPublisher {
    bus: Arc<dyn MessageBus>,
}

impl ResultPublisher {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    pub async fn publish(&self, topic: &str, value: impl Into<MetricValue>) -> PipelineResult<()> {
        self.publish_metric(&PublishedMetric::new(topic, value)).await
    }

    pub async fn publish_metric(&self, metric: &PublishedMetric) -> PipelineResult<()> {
        let payload = metric.payload();
        tracing::debug!(topic = %metric.topic, payload = %payload, "Publishing metric");
        self.bus.publish(&metric.topic, payload).await
    }

    /// Publish in order, stopping at the first failure
    pub async fn publish_all(&self, metrics: &[PublishedMetric]) -> PipelineResult<usize> {
        for metric in metrics {
            self.publish_metric(metric).await?;
        }
        Ok(metrics.len())
    }
}

/// `{prefix}{i}` slots for every item, padded to `MIN_SLOTS`
pub fn slot_metrics<T: SlotEntry>(prefix: &str, items: &[T]) -> Vec<PublishedMetric> {
    let slots = items.len().max(MIN_SLOTS);
    (0..slots)
        .map(|i| {
            let value = items
                .get(i)
                .map(|item| item.slot_value())
                .unwrap_or_else(|| SLOT_PLACEHOLDER.to_string());
            PublishedMetric::new(format!("{}{}", prefix, i), value)
        })
        .collect()
}

/// `MIN_SLOTS` placeholder slots, used when a list never arrived
pub fn placeholder_slots(prefix: &str) -> Vec<PublishedMetric> {
    (0..MIN_SLOTS)
        .map(|i| PublishedMetric::new(format!("{}{}", prefix, i), SLOT_PLACEHOLDER))
        .collect()
}

/// `Age`, `EmotionalState` and `Gender` for each face in detection order
pub fn face_metrics(stats: &FaceStats) -> Vec<PublishedMetric> {
    stats
        .faces
        .iter()
        .flat_map(|face| {
            [
                PublishedMetric::new(topics::AGE, face.age),
                PublishedMetric::new(topics::EMOTIONAL_STATE, face.emotion.as_str()),
                PublishedMetric::new(topics::GENDER, face.gender.clone()),
            ]
        })
        .collect()
}

/// Word-cloud URL, rounded mean age and face count
pub fn summary_metrics(stats: &FaceStats, word_cloud_url: &str) -> Vec<PublishedMetric> {
    vec![
        PublishedMetric::new(topics::WORD_CLOUD_URL, word_cloud_url),
        PublishedMetric::new(topics::AVERAGE_AGE, stats.rounded_average_age()),
        PublishedMetric::new(topics::FACE_COUNT, i64::from(stats.face_count)),
    ]
}

/// Summary values for a run that produced no face statistics
pub fn empty_summary_metrics(blank_word_cloud_url: &str) -> Vec<PublishedMetric> {
    summary_metrics(&FaceStats::default(), blank_word_cloud_url)
}

/// Startup state of every tile
pub fn reset_metrics(blank_word_cloud_url: &str) -> Vec<PublishedMetric> {
    vec![
        PublishedMetric::new(topics::WORD_CLOUD_URL, blank_word_cloud_url),
        PublishedMetric::new(topics::SNAP, PLACEHOLDER_IMAGE_URL),
        PublishedMetric::new(topics::AVERAGE_AGE, 0i64),
        PublishedMetric::new(topics::FACE_COUNT, 0i64),
        PublishedMetric::new(topics::AGE, 0i64),
        PublishedMetric::new(topics::EMOTIONAL_STATE, WAITING_TEXT),
        PublishedMetric::new(topics::GENDER, WAITING_TEXT),
        PublishedMetric::new(topics::ABOUT, PLACEHOLDER_IMAGE_URL),
    ]
}
