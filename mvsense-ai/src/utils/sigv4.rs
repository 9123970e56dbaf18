//! AWS Signature Version 4 for JSON-protocol POST requests
//!
//! Only what the recognition client needs: POST to `/`, no query string,
//! a fixed small header set.

use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static access key credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Request signer bound to one region and service
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Headers to attach to a signed JSON-protocol POST, including `authorization`
    ///
    /// `host`, `content-type` and `x-amz-target` are signed but not returned
    /// since the HTTP client sets them itself.
    pub fn sign(
        &self,
        host: &str,
        content_type: &str,
        target: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> PipelineResult<Vec<(&'static str, String)>> {
        self.sign_post(
            &[
                ("content-type", content_type),
                ("host", host),
                ("x-amz-target", target),
            ],
            payload,
            now,
        )
    }

    /// Sign a POST to `/` over the given lowercase headers
    ///
    /// `x-amz-date` (and the session token, if any) are added to the signed
    /// set here and returned along with `authorization`.
    pub fn sign_post(
        &self,
        headers: &[(&str, &str)],
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> PipelineResult<Vec<(&'static str, String)>> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = format!("{:x}", Sha256::digest(payload));

        let mut canonical: Vec<(&str, &str)> = headers.to_vec();
        canonical.push(("x-amz-date", amz_date.as_str()));
        if let Some(token) = &self.credentials.session_token {
            canonical.push(("x-amz-security-token", token.as_str()));
        }
        canonical.sort_by(|a, b| a.0.cmp(b.0));

        let canonical_headers: String = canonical
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        let signed_headers = canonical
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "POST\n/\n\n{}\n{}\n{}",
            canonical_headers, signed_headers, payload_hash
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{:x}",
            ALGORITHM,
            amz_date,
            scope,
            Sha256::digest(canonical_request.as_bytes())
        );

        let key = self.signing_key(&date)?;
        let signature = hex(&hmac(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
        );

        let mut headers = vec![("x-amz-date", amz_date.clone()), ("authorization", authorization)];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }
        Ok(headers)
    }

    fn signing_key(&self, date: &str) -> PipelineResult<Vec<u8>> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, self.service.as_bytes())?;
        hmac(&k_service, b"aws4_request")
    }
}

fn hmac(key: &[u8], data: &[u8]) -> PipelineResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| PipelineError::Common(mvsense_common::Error::Internal(e.to_string())))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
