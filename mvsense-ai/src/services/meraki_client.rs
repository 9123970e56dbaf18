//! Meraki camera API client
//!
//! Lists the network's devices, requests snapshot links and probes them.

use crate::config::MerakiSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::models::ProbeResponse;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "meraki";
const API_KEY_HEADER: &str = "X-Cisco-Meraki-API-Key";
const USER_AGENT: &str = concat!("mvsense-ai/", env!("CARGO_PKG_VERSION"));
/// Model prefix shared by all MV cameras
const CAMERA_MODEL_PREFIX: &str = "MV";

/// Camera snapshot API seam
#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Serials of all cameras in the configured network
    async fn camera_serials(&self) -> PipelineResult<Vec<String>>;

    /// Ask the camera for a snapshot link, optionally for a past instant
    async fn request_snapshot(
        &self,
        serial: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> PipelineResult<String>;

    /// Fetch the snapshot link once and report what came back
    async fn probe(&self, url: &str) -> PipelineResult<ProbeResponse>;
}

#[derive(Debug, Clone, Deserialize)]
struct Device {
    serial: String,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Serialize)]
struct SnapshotRequest {
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    url: Option<String>,
}

/// Serials of the devices whose model marks them as cameras
fn camera_serials_of(devices: Vec<Device>) -> Vec<String> {
    devices
        .into_iter()
        .filter(|d| d.model.starts_with(CAMERA_MODEL_PREFIX))
        .map(|d| d.serial)
        .collect()
}

/// Meraki Dashboard API client
pub struct MerakiClient {
    http_client: reqwest::Client,
    api_key: String,
    network_id: String,
    base_url: String,
}

impl MerakiClient {
    pub fn new(settings: &MerakiSettings) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            network_id: settings.network_id.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SnapshotApi for MerakiClient {
    async fn camera_serials(&self) -> PipelineResult<Vec<String>> {
        let url = format!("{}/networks/{}/devices", self.base_url, self.network_id);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::upstream(
                SERVICE,
                format!("device list returned HTTP {}: {}", status.as_u16(), error_text),
            ));
        }

        let devices: Vec<Device> = response
            .json()
            .await
            .map_err(|e| PipelineError::malformed(SERVICE, e))?;

        let serials = camera_serials_of(devices);

        tracing::debug!(cameras = serials.len(), "Listed network cameras");
        Ok(serials)
    }

    async fn request_snapshot(
        &self,
        serial: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> PipelineResult<String> {
        let url = format!(
            "{}/networks/{}/cameras/{}/snapshot",
            self.base_url, self.network_id, serial
        );

        let mut request = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key);

        // Content-Type is only sent when there is a body
        if let Some(ts) = timestamp {
            request = request.json(&SnapshotRequest {
                timestamp: ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            });
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::upstream(
                SERVICE,
                format!("snapshot request returned HTTP {}: {}", status.as_u16(), error_text),
            ));
        }

        let body: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::malformed(SERVICE, e))?;

        body.url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| PipelineError::malformed(SERVICE, "snapshot response has no url"))
    }

    async fn probe(&self, url: &str) -> PipelineResult<ProbeResponse> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let is_image = content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);

        let body_text = if is_image {
            None
        } else {
            Some(response.text().await.unwrap_or_default())
        };

        Ok(ProbeResponse {
            status,
            content_type,
            body_text,
        })
    }
}
