//! Tencent Cloud Hunyuan 3D provider
//!
//! Calls the international Hunyuan endpoint with TC3-signed JSON requests
//! over a blocking `ureq` agent. Job queries and downloads are retried on
//! transient failures; submissions are not, so a flaky network can never
//! create the same job twice.

use super::signing::{sign_request, SignedRequest, SERVICE};
use crate::config::{Credentials, Hy3dConfig};
use crate::provider::{ApiStatus, RemoteApi, SUBMIT_ACTION};
use hy3d_core::{Hy3dError, Result};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;
const MAX_RETRIES: usize = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Hunyuan 3D Global API over HTTPS
pub struct TencentApi {
    credentials: Credentials,
    endpoint: String,
}

impl TencentApi {
    pub fn new(credentials: Credentials, endpoint: impl Into<String>) -> Self {
        Self {
            credentials,
            endpoint: endpoint.into(),
        }
    }

    /// Create a TencentApi from config
    pub fn from_config(config: &Hy3dConfig) -> Result<Self> {
        Ok(Self::new(config.credentials()?, config.endpoint()))
    }

    pub fn region(&self) -> &str {
        &self.credentials.region
    }

    fn post_signed(
        &self,
        signed: &SignedRequest,
        body: &str,
    ) -> std::result::Result<serde_json::Value, ureq::Error> {
        let url = format!("https://{}/", self.endpoint);
        let mut request = build_agent(REQUEST_TIMEOUT_SECS).post(&url);
        for (name, value) in &signed.headers {
            request = request.header(*name, value);
        }
        let mut response = request.send(body.as_bytes())?;
        response.body_mut().read_json()
    }
}

impl RemoteApi for TencentApi {
    fn name(&self) -> &str {
        "tencent"
    }

    fn health_check(&self) -> ApiStatus {
        if self.credentials.secret_id.is_empty() || self.credentials.secret_key.is_empty() {
            return ApiStatus::NoCredentials;
        }
        ApiStatus::Available
    }

    fn call(&self, action: &str, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let body = serde_json::to_string(payload)
            .map_err(|e| Hy3dError::Transport(format!("Failed to encode {} request: {}", action, e)))?;
        let attempts = if action == SUBMIT_ACTION { 1 } else { MAX_RETRIES };

        for attempt in 0..attempts {
            let timestamp = chrono::Utc::now().timestamp();
            let signed =
                sign_request(&self.credentials, SERVICE, &self.endpoint, action, &body, timestamp)?;
            match self.post_signed(&signed, &body) {
                Ok(json) => return Ok(json),
                Err(e) => {
                    if attempt + 1 < attempts && is_retryable_error(&e) {
                        debug!(action, attempt, error = %e, "retrying request");
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(Hy3dError::Transport(format!("{} request failed: {}", action, e)));
                }
            }
        }

        Err(Hy3dError::Transport(format!("{} request failed after retries", action)))
    }

    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        for attempt in 0..MAX_RETRIES {
            match build_agent(DOWNLOAD_TIMEOUT_SECS).get(url).call() {
                Ok(response) => {
                    let mut reader = response.into_body().into_reader();
                    return std::io::copy(&mut reader, sink).map_err(|e| {
                        Hy3dError::Download(format!("Failed to read model data: {}", e))
                    });
                }
                Err(ureq::Error::StatusCode(code)) if !is_retryable_status(code) => {
                    return Err(Hy3dError::Download(format!("HTTP {} for {}", code, url)));
                }
                Err(e) => {
                    if attempt + 1 < MAX_RETRIES && is_retryable_error(&e) {
                        warn!(url, attempt, error = %e, "download failed, retrying");
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(Hy3dError::Download(match e {
                        ureq::Error::StatusCode(code) => format!("HTTP {} for {}", code, url),
                        other => format!("{} ({})", other, url),
                    }));
                }
            }
        }

        Err(Hy3dError::Download(format!("Download of {} failed after retries", url)))
    }
}

fn build_agent(timeout_secs: u64) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build();
    config.into()
}

fn is_retryable_status(code: u16) -> bool {
    matches!(code, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(e: &ureq::Error) -> bool {
    match e {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => true,
        ureq::Error::StatusCode(code) => is_retryable_status(*code),
        _ => false,
    }
}

fn sleep_backoff(attempt: usize) {
    let delay_ms = RETRY_BASE_DELAY_MS.saturating_mul(1u64 << attempt);
    std::thread::sleep(Duration::from_millis(delay_ms));
}
