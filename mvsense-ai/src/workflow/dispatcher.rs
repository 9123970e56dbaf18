//! Trigger hand-off between the bus and the pipeline worker
//!
//! The channel holds a single pending trigger. With one run in flight and one
//! queued, further triggers are coalesced into the queued one: the next run
//! takes a fresh snapshot anyway, so nothing is lost by dropping them.

use super::orchestrator::PipelineOrchestrator;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pending triggers the worker accepts while a run is in flight
pub const PENDING_TRIGGERS: usize = 1;

/// One inbound trigger message
#[derive(Debug, Clone)]
pub struct Trigger {
    pub topic: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    /// A trigger was already pending; this one was dropped
    Coalesced,
    /// The worker is gone
    Closed,
}

/// Sending half, held by the bus listener
#[derive(Debug, Clone)]
pub struct TriggerDispatcher {
    tx: mpsc::Sender<Trigger>,
}

impl TriggerDispatcher {
    /// Create a dispatcher and the receiver the worker drains
    pub fn channel() -> (Self, mpsc::Receiver<Trigger>) {
        let (tx, rx) = mpsc::channel(PENDING_TRIGGERS);
        (Self { tx }, rx)
    }

    /// Non-blocking: never stalls the bus event loop
    pub fn dispatch(&self, trigger: Trigger) -> DispatchOutcome {
        match self.tx.try_send(trigger) {
            Ok(()) => DispatchOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => DispatchOutcome::Coalesced,
            Err(mpsc::error::TrySendError::Closed(_)) => DispatchOutcome::Closed,
        }
    }
}

/// Run the pipeline once per received trigger until cancelled
///
/// Runs are strictly sequential. A failed run is logged by the orchestrator
/// and the worker goes straight back to waiting.
pub async fn run_worker(
    orchestrator: Arc<PipelineOrchestrator>,
    mut rx: mpsc::Receiver<Trigger>,
    cancel: CancellationToken,
) {
    info!("Pipeline worker started");

    loop {
        let trigger = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            trigger = rx.recv() => trigger,
        };

        let Some(trigger) = trigger else {
            warn!("Trigger channel closed");
            break;
        };

        let queued_ms = (Utc::now() - trigger.received_at).num_milliseconds();
        debug!(topic = %trigger.topic, queued_ms, "Trigger received");

        // Errors are already logged with their run number.
        let _ = orchestrator.run_once(None).await;
    }

    info!("Pipeline worker stopped");
}
