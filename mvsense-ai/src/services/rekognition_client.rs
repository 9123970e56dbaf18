//! AWS Rekognition client
//!
//! Speaks the JSON 1.1 protocol directly: one signed POST per detection,
//! image bytes inlined as base64.

use crate::config::AwsSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{FaceDetail, Label, TextDetection};
use crate::utils::sigv4::SigV4Signer;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "rekognition";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "RekognitionService";

/// Image recognition seam
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Faces with all attributes (age range, emotions, gender, ...)
    async fn detect_faces(&self, image: &[u8]) -> PipelineResult<Vec<FaceDetail>>;

    async fn detect_labels(
        &self,
        image: &[u8],
        max_labels: u32,
        min_confidence: f64,
    ) -> PipelineResult<Vec<Label>>;

    async fn detect_text(&self, image: &[u8]) -> PipelineResult<Vec<TextDetection>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImagePayload {
    bytes: String,
}

impl ImagePayload {
    fn new(image: &[u8]) -> Self {
        Self {
            bytes: BASE64.encode(image),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesRequest {
    image: ImagePayload,
    attributes: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsRequest {
    image: ImagePayload,
    max_labels: u32,
    min_confidence: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectTextRequest {
    image: ImagePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesResponse {
    face_details: Vec<FaceDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectTextResponse {
    text_detections: Vec<TextDetection>,
}

/// Error body returned with non-2xx status
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Rekognition API client
pub struct RekognitionClient {
    http_client: reqwest::Client,
    signer: SigV4Signer,
    endpoint: String,
    host: String,
}

impl RekognitionClient {
    pub fn new(settings: &AwsSettings) -> PipelineResult<Self> {
        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rekognition.{}.amazonaws.com", settings.region));

        let parsed = reqwest::Url::parse(&endpoint)
            .map_err(|e| PipelineError::ConfigurationMissing(format!("aws.endpoint: {}", e)))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(PipelineError::ConfigurationMissing(format!(
                    "aws.endpoint has no host: {}",
                    endpoint
                )))
            }
        };

        // Per-call deadlines are enforced by the caller; this only bounds a
        // stuck connection.
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        Ok(Self {
            http_client,
            signer: SigV4Signer::new(settings.credentials.clone(), settings.region.clone(), SERVICE),
            endpoint,
            host,
        })
    }

    async fn invoke<Req, Resp>(&self, operation: &'static str, request: &Req) -> PipelineResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)
            .map_err(|e| PipelineError::Common(mvsense_common::Error::Internal(e.to_string())))?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        let signed = self
            .signer
            .sign(&self.host, CONTENT_TYPE, &target, &payload, Utc::now())?;

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("x-amz-target", &target);
        for (name, value) in signed {
            builder = builder.header(name, value);
        }

        tracing::debug!(operation, bytes = payload.len(), "Calling recognition service");

        let response = builder
            .body(payload)
            .send()
            .await
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::upstream(SERVICE, e))?;

        if !status.is_success() {
            return Err(PipelineError::Recognition {
                operation,
                reason: describe_error(status.as_u16(), &body),
            });
        }

        serde_json::from_slice(&body).map_err(|e| PipelineError::malformed(SERVICE, e))
    }
}

fn describe_error(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<ServiceErrorBody>(body) {
        Ok(ServiceErrorBody {
            error_type,
            message,
        }) if error_type.is_some() || message.is_some() => format!(
            "HTTP {} {}: {}",
            status,
            error_type.unwrap_or_default(),
            message.unwrap_or_default()
        ),
        _ => format!("HTTP {}: {}", status, String::from_utf8_lossy(body)),
    }
}

#[async_trait]
impl RecognitionService for RekognitionClient {
    async fn detect_faces(&self, image: &[u8]) -> PipelineResult<Vec<FaceDetail>> {
        let request = DetectFacesRequest {
            image: ImagePayload::new(image),
            attributes: vec!["ALL"],
        };
        let response: DetectFacesResponse = self.invoke("DetectFaces", &request).await?;
        Ok(response.face_details)
    }

    async fn detect_labels(
        &self,
        image: &[u8],
        max_labels: u32,
        min_confidence: f64,
    ) -> PipelineResult<Vec<Label>> {
        let request = DetectLabelsRequest {
            image: ImagePayload::new(image),
            max_labels,
            min_confidence,
        };
        let response: DetectLabelsResponse = self.invoke("DetectLabels", &request).await?;
        Ok(response.labels)
    }

    async fn detect_text(&self, image: &[u8]) -> PipelineResult<Vec<TextDetection>> {
        let request = DetectTextRequest {
            image: ImagePayload::new(image),
        };
        let response: DetectTextResponse = self.invoke("DetectText", &request).await?;
        Ok(response.text_detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sigv4::AwsCredentials;

    fn settings(endpoint: Option<&str>) -> AwsSettings {
        AwsSettings {
            region: "eu-west-1".to_string(),
            credentials: AwsCredentials {
                access_key_id: "AKID".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[test]
    fn test_default_endpoint_uses_region() {
        let client = RekognitionClient::new(&settings(None)).unwrap();
        assert_eq!(client.endpoint, "https://rekognition.eu-west-1.amazonaws.com");
        assert_eq!(client.host, "rekognition.eu-west-1.amazonaws.com");
    }

    #[test]
    fn test_endpoint_override_keeps_port_in_host() {
        let client = RekognitionClient::new(&settings(Some("http://localhost:4566"))).unwrap();
        assert_eq!(client.host, "localhost:4566");
    }

    #[test]
    fn test_invalid_endpoint_is_configuration_error() {
        let result = RekognitionClient::new(&settings(Some("not a url")));
        assert!(matches!(result, Err(PipelineError::ConfigurationMissing(_))));
    }

    #[test]
    fn test_request_wire_shapes() {
        let faces = serde_json::to_value(DetectFacesRequest {
            image: ImagePayload::new(b"abc"),
            attributes: vec!["ALL"],
        })
        .unwrap();
        assert_eq!(faces["Image"]["Bytes"], "YWJj");
        assert_eq!(faces["Attributes"][0], "ALL");

        let labels = serde_json::to_value(DetectLabelsRequest {
            image: ImagePayload::new(b""),
            max_labels: 10,
            min_confidence: 90.0,
        })
        .unwrap();
        assert_eq!(labels["MaxLabels"], 10);
        assert_eq!(labels["MinConfidence"], 90.0);
    }

    #[test]
    fn test_response_wire_shapes() {
        let labels: DetectLabelsResponse = serde_json::from_str(
            r#"{"Labels": [{"Name": "Person", "Confidence": 99.5, "Instances": []}],
                "LabelModelVersion": "3.0"}"#,
        )
        .unwrap();
        assert_eq!(labels.labels[0].name, "Person");

        let text: DetectTextResponse = serde_json::from_str(
            r#"{"TextDetections": [{"DetectedText": "EXIT", "Type": "LINE", "Id": 0, "Confidence": 97.2}]}"#,
        )
        .unwrap();
        assert_eq!(text.text_detections[0].detected_text, "EXIT");
    }

    #[test]
    fn test_describe_error_prefers_structured_body() {
        let body = br#"{"__type": "InvalidImageFormatException", "Message": "Request has invalid image format"}"#;
        assert_eq!(
            describe_error(400, body),
            "HTTP 400 InvalidImageFormatException: Request has invalid image format"
        );
        assert_eq!(describe_error(503, b"busy"), "HTTP 503: busy");
    }
}
