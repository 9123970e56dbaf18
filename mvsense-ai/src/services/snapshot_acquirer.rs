//! Snapshot acquisition with bounded availability polling
//!
//! A fresh snapshot link is not downloadable until the camera has rendered
//! the still. The link is probed until the "not yet available" marker goes
//! away.
//!
//! **Algorithm:**
//! 1. Confirm the camera belongs to the network
//! 2. Request one snapshot link (never re-requested within a run)
//! 3. Probe the link
//! 4. If the marker is present:
//!    a. If attempts < max: log, sleep `probe_delay`, probe again
//!    b. Otherwise: fail with `PollTimeout`
//! 5. Transport failures propagate immediately (no retry)

use super::meraki_client::SnapshotApi;
use crate::config::PipelineSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Retrievability, SnapshotReference};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Substring that marks a snapshot as still rendering
pub const UNAVAILABLE_MARKER: &str = "400";

pub struct SnapshotAcquirer {
    api: Arc<dyn SnapshotApi>,
    max_attempts: u32,
    probe_delay: Duration,
}

impl SnapshotAcquirer {
    pub fn new(api: Arc<dyn SnapshotApi>, max_attempts: u32, probe_delay: Duration) -> Self {
        Self {
            api,
            max_attempts: max_attempts.max(1),
            probe_delay,
        }
    }

    pub fn from_settings(api: Arc<dyn SnapshotApi>, settings: &PipelineSettings) -> Self {
        Self::new(api, settings.probe_max_attempts, settings.probe_delay)
    }

    /// Obtain a snapshot reference that is ready to download
    pub async fn acquire(
        &self,
        serial: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> PipelineResult<SnapshotReference> {
        let cameras = self.api.camera_serials().await?;
        if !cameras.iter().any(|s| s == serial) {
            return Err(PipelineError::upstream(
                "meraki",
                format!("camera {} not found in network", serial),
            ));
        }

        tracing::info!(camera = %serial, "Requesting snapshot URL");
        let url = self.api.request_snapshot(serial, timestamp).await?;
        let mut snapshot = SnapshotReference::pending(url, timestamp);

        self.wait_until_retrievable(&mut snapshot).await?;
        Ok(snapshot)
    }

    /// Probe until the marker disappears or the attempt budget runs out
    pub async fn wait_until_retrievable(
        &self,
        snapshot: &mut SnapshotReference,
    ) -> PipelineResult<()> {
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            snapshot.probe_attempts = attempt;

            let probe = self.api.probe(&snapshot.url).await?;

            if !probe.is_unavailable(UNAVAILABLE_MARKER) {
                snapshot.status = Retrievability::Retrievable;
                let elapsed_ms = start_time.elapsed().as_millis();
                if attempt > 1 {
                    tracing::info!(
                        attempt,
                        elapsed_ms = elapsed_ms,
                        "Snapshot became retrievable after retry"
                    );
                } else {
                    tracing::debug!(status = probe.status, "Snapshot retrievable on first probe");
                }
                return Ok(());
            }

            let elapsed = start_time.elapsed();

            if attempt >= self.max_attempts {
                tracing::error!(
                    attempt,
                    elapsed_ms = elapsed.as_millis(),
                    max_attempts = self.max_attempts,
                    "Snapshot polling failed: max probe attempts exceeded"
                );
                return Err(PipelineError::PollTimeout {
                    attempts: attempt,
                    elapsed_ms: elapsed.as_millis(),
                });
            }

            tracing::debug!(
                attempt,
                status = probe.status,
                delay_ms = self.probe_delay.as_millis(),
                "Snapshot not yet available, will probe again"
            );

            tokio::time::sleep(self.probe_delay).await;
        }
    }
}
