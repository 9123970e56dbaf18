//! Pipeline Orchestrator
//!
//! Sequences one analysis run: snapshot → faces → statistics → labels →
//! text, publishing each stage's metrics as soon as they are known.
//!
//! # Run order on the bus
//! 1. `Age` / `EmotionalState` / `Gender` per face
//! 2. `wordcloudurl`, `averageage`, `facecount`
//! 3. `Label0..` (at least six slots)
//! 4. `Snap`
//! 5. `DetectedText0..` (at least six slots)
//! 6. `Snap` again as the end-of-run barrier
//!
//! # Error Handling
//! - Face detection failures are absorbed by `RecognitionClient`
//! - Any other failure aborts the run; if a snapshot URL was already obtained
//!   the stages not yet published get placeholders and the barrier `Snap` is
//!   still sent
//! - The orchestrator always returns to `Idle`

use crate::error::PipelineResult;
use crate::models::topics;
use crate::services::result_publisher::{
    empty_summary_metrics, face_metrics, placeholder_slots, reset_metrics, slot_metrics,
    summary_metrics,
};
use crate::services::{
    RecognitionClient, ResultPublisher, SnapshotAcquirer, StatsAggregator, WordCloudEncoder,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Running,
}

/// Summary of one successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run: u64,
    pub snapshot_url: String,
    pub probe_attempts: u32,
    pub face_count: u32,
    pub faces_unavailable: bool,
    pub label_count: usize,
    pub text_count: usize,
    pub metrics_published: usize,
    pub elapsed_ms: u128,
}

/// Which stages reached the bus before a failure
#[derive(Debug, Default)]
struct RunProgress {
    snapshot_url: Option<String>,
    summary_published: bool,
    labels_published: bool,
    texts_published: bool,
}

pub struct PipelineOrchestrator {
    serial: String,
    acquirer: SnapshotAcquirer,
    recognition: RecognitionClient,
    word_cloud: WordCloudEncoder,
    publisher: ResultPublisher,
    /// Held for the whole run so runs never overlap
    run_lock: Mutex<()>,
    running: AtomicBool,
    runs: AtomicU64,
}

impl PipelineOrchestrator {
    pub fn new(
        serial: impl Into<String>,
        acquirer: SnapshotAcquirer,
        recognition: RecognitionClient,
        word_cloud: WordCloudEncoder,
        publisher: ResultPublisher,
    ) -> Self {
        Self {
            serial: serial.into(),
            acquirer,
            recognition,
            word_cloud,
            publisher,
            run_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            runs: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> RunState {
        if self.running.load(Ordering::SeqCst) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// Number of runs started so far
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Put every dashboard tile into its waiting state
    pub async fn reset_dashboard(&self) -> PipelineResult<()> {
        let metrics = reset_metrics(&self.word_cloud.blank_url());
        self.publisher.publish_all(&metrics).await?;
        info!(metrics = metrics.len(), "Dashboard reset");
        Ok(())
    }

    /// Execute one complete run
    ///
    /// `timestamp` requests a historical snapshot instead of the live one.
    pub async fn run_once(&self, timestamp: Option<DateTime<Utc>>) -> PipelineResult<RunReport> {
        let _guard = self.run_lock.lock().await;
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);

        let started = Instant::now();
        info!(run, camera = %self.serial, "Pipeline run started");

        let mut progress = RunProgress::default();
        let result = self.execute(run, timestamp, &mut progress, started).await;

        match &result {
            Ok(report) => info!(
                run,
                faces = report.face_count,
                labels = report.label_count,
                texts = report.text_count,
                elapsed_ms = report.elapsed_ms,
                "Pipeline run complete"
            ),
            Err(e) => {
                error!(
                    run,
                    error = %e,
                    kind = e.kind(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Pipeline run failed"
                );
                if let Some(url) = progress.snapshot_url.as_deref() {
                    self.publish_degraded(run, &progress, url).await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn execute(
        &self,
        run: u64,
        timestamp: Option<DateTime<Utc>>,
        progress: &mut RunProgress,
        started: Instant,
    ) -> PipelineResult<RunReport> {
        let mut published = 0;

        let snapshot = self.acquirer.acquire(&self.serial, timestamp).await?;
        progress.snapshot_url = Some(snapshot.url.clone());
        info!(run, url = %snapshot.url, attempts = snapshot.probe_attempts, "Snapshot ready");

        let detection = self.recognition.detect_faces(&snapshot.url).await?;
        let stats = StatsAggregator::aggregate(detection.faces());
        published += self.publisher.publish_all(&face_metrics(&stats)).await?;

        let blob = WordCloudEncoder::encode(&stats.histogram);
        let word_cloud_url = self.word_cloud.url(&blob);
        published += self
            .publisher
            .publish_all(&summary_metrics(&stats, &word_cloud_url))
            .await?;
        progress.summary_published = true;

        let labels = self.recognition.detect_labels(&snapshot.url).await?;
        info!(run, labels = labels.len(), "Labels detected");
        published += self
            .publisher
            .publish_all(&slot_metrics(topics::LABEL_PREFIX, &labels))
            .await?;
        progress.labels_published = true;

        self.publisher.publish(topics::SNAP, snapshot.url.as_str()).await?;
        published += 1;

        let texts = self.recognition.detect_text(&snapshot.url).await?;
        info!(run, texts = texts.len(), "Text detected");
        published += self
            .publisher
            .publish_all(&slot_metrics(topics::DETECTED_TEXT_PREFIX, &texts))
            .await?;
        progress.texts_published = true;

        self.publisher.publish(topics::SNAP, snapshot.url.as_str()).await?;
        published += 1;

        Ok(RunReport {
            run,
            snapshot_url: snapshot.url,
            probe_attempts: snapshot.probe_attempts,
            face_count: stats.face_count,
            faces_unavailable: detection.is_unavailable(),
            label_count: labels.len(),
            text_count: texts.len(),
            metrics_published: published,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Fill the stages a failed run never published, then send the barrier
    async fn publish_degraded(&self, run: u64, progress: &RunProgress, snapshot_url: &str) {
        let mut metrics = Vec::new();
        if !progress.summary_published {
            metrics.extend(empty_summary_metrics(&self.word_cloud.blank_url()));
        }
        if !progress.labels_published {
            metrics.extend(placeholder_slots(topics::LABEL_PREFIX));
        }
        if !progress.texts_published {
            metrics.extend(placeholder_slots(topics::DETECTED_TEXT_PREFIX));
        }

        for metric in &metrics {
            if let Err(e) = self.publisher.publish_metric(metric).await {
                warn!(run, error = %e, "Degraded output incomplete");
                return;
            }
        }

        match self.publisher.publish(topics::SNAP, snapshot_url).await {
            Ok(()) => warn!(run, placeholders = metrics.len(), "Published degraded output"),
            Err(e) => warn!(run, error = %e, "Failed to publish end-of-run snapshot"),
        }
    }
}
