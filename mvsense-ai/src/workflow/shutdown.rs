//! Ordered shutdown of the pipeline worker and the bus listener
//!
//! The listener drives the connection the worker publishes through, so it
//! has to outlive the worker: an in-flight run gets its grace period with
//! the connection still up, and only then is the listener stopped.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Background tasks of the long-running service, each with its own token
pub struct ServiceTasks {
    worker: JoinHandle<()>,
    worker_cancel: CancellationToken,
    listener: JoinHandle<()>,
    listener_cancel: CancellationToken,
}

impl ServiceTasks {
    pub fn new(
        worker: JoinHandle<()>,
        worker_cancel: CancellationToken,
        listener: JoinHandle<()>,
        listener_cancel: CancellationToken,
    ) -> Self {
        Self {
            worker,
            worker_cancel,
            listener,
            listener_cancel,
        }
    }

    /// Stop the worker, run `flush`, then stop the listener
    ///
    /// Each task gets up to `grace` to finish. `flush` typically queues a
    /// clean disconnect behind the last publishes, which lets the listener
    /// end on its own; otherwise it is cancelled once the grace runs out.
    pub async fn shutdown<F>(self, grace: Duration, flush: F)
    where
        F: Future<Output = ()>,
    {
        let Self {
            mut worker,
            worker_cancel,
            mut listener,
            listener_cancel,
        } = self;

        worker_cancel.cancel();
        match tokio::time::timeout(grace, &mut worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Pipeline worker task failed"),
            Err(_) => {
                warn!("Pipeline worker did not stop in time");
                worker.abort();
            }
        }

        flush.await;

        match tokio::time::timeout(grace, &mut listener).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Trigger listener task failed"),
            Err(_) => {
                warn!("Timed out waiting for the broker connection to close");
                listener_cancel.cancel();
                if let Err(e) = listener.await {
                    warn!(error = %e, "Trigger listener task failed");
                }
            }
        }

        info!("Background tasks stopped");
    }
}
