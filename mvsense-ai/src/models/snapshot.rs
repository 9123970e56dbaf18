//! Snapshot reference and probe response

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Whether the image behind a snapshot URL can be downloaded yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Retrievability {
    /// Camera is still rendering the still image
    Pending,
    /// Image can be fetched
    Retrievable,
}

/// Time-bounded URL of one camera still
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReference {
    pub url: String,
    /// Requested historical instant; `None` means "now"
    pub timestamp: Option<DateTime<Utc>>,
    pub status: Retrievability,
    /// Probes performed before the image became retrievable
    pub probe_attempts: u32,
}

impl SnapshotReference {
    pub fn pending(url: String, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            url,
            timestamp,
            status: Retrievability::Pending,
            probe_attempts: 0,
        }
    }

    pub fn is_retrievable(&self) -> bool {
        self.status == Retrievability::Retrievable
    }
}

/// Raw outcome of fetching a snapshot URL once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Body decoded as text, only kept for non-image responses
    pub body_text: Option<String>,
}

impl ProbeResponse {
    /// Image bytes were served
    pub fn image(status: u16) -> Self {
        Self {
            status,
            content_type: Some("image/jpeg".to_string()),
            body_text: None,
        }
    }

    /// A textual (error or placeholder) body was served
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/plain".to_string()),
            body_text: Some(body.into()),
        }
    }

    /// True while the upstream still reports the image as not yet available
    pub fn is_unavailable(&self, marker: &str) -> bool {
        if self.status == 400 {
            return true;
        }
        self.body_text
            .as_deref()
            .map(|body| body.contains(marker))
            .unwrap_or(false)
    }
}
