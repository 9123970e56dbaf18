//! mvsense-ai library interface
//!
//! Exposes the pipeline components for the binary and for integration tests.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::error::{PipelineError, PipelineResult};

use crate::config::Settings;
use crate::services::{
    HttpImageFetcher, MerakiClient, MessageBus, RecognitionClient, RekognitionClient,
    ResultPublisher, SnapshotAcquirer, WordCloudEncoder,
};
use crate::workflow::PipelineOrchestrator;
use std::sync::Arc;

/// Wire the production upstream clients into an orchestrator
pub fn build_pipeline(
    settings: &Settings,
    bus: Arc<dyn MessageBus>,
) -> PipelineResult<PipelineOrchestrator> {
    let meraki = Arc::new(MerakiClient::new(&settings.meraki)?);
    let rekognition = Arc::new(RekognitionClient::new(&settings.aws)?);
    let fetcher = Arc::new(HttpImageFetcher::new()?);

    Ok(PipelineOrchestrator::new(
        settings.serial.clone(),
        SnapshotAcquirer::from_settings(meraki, &settings.pipeline),
        RecognitionClient::new(fetcher, rekognition, &settings.pipeline),
        WordCloudEncoder::new(settings.pipeline.word_cloud_base_url.clone()),
        ResultPublisher::new(bus),
    ))
}
