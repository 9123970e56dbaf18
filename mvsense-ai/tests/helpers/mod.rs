//! Scripted collaborators for pipeline integration tests
//!
//! Each fake counts its calls so tests can assert on how often upstreams
//! were touched.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mvsense_ai::config::PipelineSettings;
use mvsense_ai::error::{PipelineError, PipelineResult};
use mvsense_ai::models::{
    AgeRange, Emotion, EmotionScore, FaceDetail, Gender, Label, ProbeResponse, TextDetection,
};
use mvsense_ai::services::{
    ImageFetcher, MessageBus, RecognitionClient, RecognitionService, ResultPublisher,
    SnapshotAcquirer, SnapshotApi, WordCloudEncoder,
};
use mvsense_ai::workflow::PipelineOrchestrator;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SERIAL: &str = "Q2GV-TEST-0001";
pub const SNAPSHOT_URL: &str = "https://snapshots.example/frame.jpg";
pub const WORD_CLOUD_BASE: &str = "https://quickchart.io/wordcloud";

/// Bus that records every publish in order
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingBus {
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published().into_iter().map(|(topic, _)| topic).collect()
    }

    /// Last value written to `topic`
    pub fn last(&self, topic: &str) -> Option<String> {
        self.published()
            .into_iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, value)| value)
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish(&self, topic: &str, payload: String) -> PipelineResult<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

/// Camera API serving `pending_probes` unavailable probes before the image
pub struct ScriptedSnapshotApi {
    pub serials: Vec<String>,
    pub pending_probes: u32,
    pub probes: AtomicU32,
    pub requests: AtomicU32,
    pub last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl ScriptedSnapshotApi {
    pub fn new(pending_probes: u32) -> Self {
        Self {
            serials: vec!["Q2GV-OTHER".to_string(), SERIAL.to_string()],
            pending_probes,
            probes: AtomicU32::new(0),
            requests: AtomicU32::new(0),
            last_timestamp: Mutex::new(None),
        }
    }

    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotApi for ScriptedSnapshotApi {
    async fn camera_serials(&self) -> PipelineResult<Vec<String>> {
        Ok(self.serials.clone())
    }

    async fn request_snapshot(
        &self,
        _serial: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> PipelineResult<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_timestamp.lock().unwrap() = timestamp;
        Ok(SNAPSHOT_URL.to_string())
    }

    async fn probe(&self, _url: &str) -> PipelineResult<ProbeResponse> {
        let n = self.probes.fetch_add(1, Ordering::SeqCst);
        if n < self.pending_probes {
            Ok(ProbeResponse::text(
                200,
                r#"<Error><Code>400</Code><Message>Snapshot not ready</Message></Error>"#,
            ))
        } else {
            Ok(ProbeResponse::image(200))
        }
    }
}

/// Fetcher returning fixed bytes, or failing every call
#[derive(Default)]
pub struct CountingFetcher {
    pub fetches: AtomicU32,
    pub fail: bool,
}

impl CountingFetcher {
    pub fn failing() -> Self {
        Self {
            fetches: AtomicU32::new(0),
            fail: true,
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for CountingFetcher {
    async fn fetch(&self, _url: &str) -> PipelineResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PipelineError::UpstreamUnavailable {
                service: "snapshot",
                reason: "connection reset".to_string(),
            });
        }
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

/// Recognition service with canned results and optional failures
#[derive(Default)]
pub struct ScriptedRecognition {
    pub faces: Vec<FaceDetail>,
    pub labels: Vec<Label>,
    pub texts: Vec<TextDetection>,
    pub fail_faces: bool,
    pub fail_labels: bool,
    pub fail_texts: bool,
    /// Delay applied to every call
    pub latency: Duration,
    pub label_request: Mutex<Option<(u32, f64)>>,
}

impl ScriptedRecognition {
    fn failure(operation: &'static str) -> PipelineError {
        PipelineError::Recognition {
            operation,
            reason: "HTTP 400 InvalidImageFormatException: bad image".to_string(),
        }
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl RecognitionService for ScriptedRecognition {
    async fn detect_faces(&self, _image: &[u8]) -> PipelineResult<Vec<FaceDetail>> {
        self.wait().await;
        if self.fail_faces {
            return Err(Self::failure("DetectFaces"));
        }
        Ok(self.faces.clone())
    }

    async fn detect_labels(
        &self,
        _image: &[u8],
        max_labels: u32,
        min_confidence: f64,
    ) -> PipelineResult<Vec<Label>> {
        self.wait().await;
        *self.label_request.lock().unwrap() = Some((max_labels, min_confidence));
        if self.fail_labels {
            return Err(Self::failure("DetectLabels"));
        }
        Ok(self.labels.clone())
    }

    async fn detect_text(&self, _image: &[u8]) -> PipelineResult<Vec<TextDetection>> {
        self.wait().await;
        if self.fail_texts {
            return Err(Self::failure("DetectText"));
        }
        Ok(self.texts.clone())
    }
}

pub fn face(low: u32, high: u32, emotion: Emotion, gender: &str) -> FaceDetail {
    FaceDetail {
        age_range: AgeRange { low, high },
        emotions: vec![
            EmotionScore {
                kind: emotion,
                confidence: 92.5,
            },
            EmotionScore {
                kind: Emotion::Confused,
                confidence: 3.0,
            },
        ],
        gender: Gender {
            value: gender.to_string(),
            confidence: 99.0,
        },
        confidence: 99.9,
    }
}

/// Faces [HAPPY, HAPPY, SAD] with ages (20,30), (40,50), (25,35)
pub fn three_faces() -> Vec<FaceDetail> {
    vec![
        face(20, 30, Emotion::Happy, "Female"),
        face(40, 50, Emotion::Happy, "Male"),
        face(25, 35, Emotion::Sad, "Female"),
    ]
}

pub fn labels(names: &[&str]) -> Vec<Label> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Label {
            name: name.to_string(),
            confidence: 99.0 - i as f64,
        })
        .collect()
}

pub fn texts(lines: &[&str]) -> Vec<TextDetection> {
    lines
        .iter()
        .map(|line| TextDetection {
            detected_text: line.to_string(),
            confidence: 97.25,
        })
        .collect()
}

pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        probe_max_attempts: 5,
        probe_delay: Duration::ZERO,
        recognition_timeout: Duration::from_secs(5),
        ..PipelineSettings::default()
    }
}

/// Everything a pipeline test needs to inspect after a run
pub struct Harness {
    pub orchestrator: PipelineOrchestrator,
    pub bus: Arc<RecordingBus>,
    pub api: Arc<ScriptedSnapshotApi>,
    pub fetcher: Arc<CountingFetcher>,
    pub recognition: Arc<ScriptedRecognition>,
}

pub fn harness(
    api: ScriptedSnapshotApi,
    fetcher: CountingFetcher,
    recognition: ScriptedRecognition,
    settings: &PipelineSettings,
) -> Harness {
    let bus = Arc::new(RecordingBus::default());
    let api = Arc::new(api);
    let fetcher = Arc::new(fetcher);
    let recognition = Arc::new(recognition);

    let orchestrator = PipelineOrchestrator::new(
        SERIAL,
        SnapshotAcquirer::from_settings(api.clone(), settings),
        RecognitionClient::new(fetcher.clone(), recognition.clone(), settings),
        WordCloudEncoder::new(WORD_CLOUD_BASE),
        ResultPublisher::new(bus.clone()),
    );

    Harness {
        orchestrator,
        bus,
        api,
        fetcher,
        recognition,
    }
}
