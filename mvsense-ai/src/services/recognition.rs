//! Recognition client used by the pipeline
//!
//! Each detection downloads the snapshot once and hands the bytes to the
//! recognition service. Nothing is cached between the three calls of a run.
//!
//! Face detection never aborts a run: service failures come back as
//! `FaceDetection::Unavailable`. Label and text failures propagate.

use super::rekognition_client::RecognitionService;
use crate::config::PipelineSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{FaceDetection, Label, TextDetection};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Downloads image bytes from a URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>>;
}

/// Plain HTTP GET fetcher
pub struct HttpImageFetcher {
    http_client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::upstream("snapshot", e))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::upstream("snapshot", e))?;

        let status = response.status();
        // An error page must never reach the recognition service as image bytes
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::upstream(
                "snapshot",
                format!("download returned HTTP {}: {}", status.as_u16(), error_text),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::upstream("snapshot", e))?;
        Ok(bytes.to_vec())
    }
}

pub struct RecognitionClient {
    fetcher: Arc<dyn ImageFetcher>,
    service: Arc<dyn RecognitionService>,
    call_timeout: Duration,
    max_labels: u32,
    min_label_confidence: f64,
}

impl RecognitionClient {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        service: Arc<dyn RecognitionService>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            service,
            call_timeout: settings.recognition_timeout,
            max_labels: settings.max_labels,
            min_label_confidence: settings.min_label_confidence,
        }
    }

    /// Detect faces; service errors and timeouts are reported, not raised
    ///
    /// Only a failed image download is an error here, since without the
    /// image no later stage can run either.
    pub async fn detect_faces(&self, url: &str) -> PipelineResult<FaceDetection> {
        let image = self.fetcher.fetch(url).await?;

        let result = self
            .deadline("DetectFaces", self.service.detect_faces(&image))
            .await;

        match result {
            Ok(faces) => Ok(FaceDetection::Detected(faces)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kind = e.kind(),
                    "Face detection failed, continuing with no faces"
                );
                Ok(FaceDetection::Unavailable {
                    reason: e.to_string(),
                })
            }
        }
    }

    pub async fn detect_labels(&self, url: &str) -> PipelineResult<Vec<Label>> {
        let image = self.fetcher.fetch(url).await?;
        self.deadline(
            "DetectLabels",
            self.service
                .detect_labels(&image, self.max_labels, self.min_label_confidence),
        )
        .await
    }

    pub async fn detect_text(&self, url: &str) -> PipelineResult<Vec<TextDetection>> {
        let image = self.fetcher.fetch(url).await?;
        self.deadline("DetectText", self.service.detect_text(&image))
            .await
    }

    async fn deadline<T, F>(&self, operation: &'static str, call: F) -> PipelineResult<T>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::RecognitionTimeout {
                operation,
                timeout_ms: self.call_timeout.as_millis(),
            }),
        }
    }
}
