//! Hunyuan 3D API client
//!
//! Wraps a `RemoteApi` backend with request building, response parsing,
//! the bounded polling loop and atomic downloads. Everything here blocks
//! the calling thread; the caller decides where that thread comes from.

use crate::cancel::CancelToken;
use crate::job::Job;
use crate::options::{build_submit_payload, GenerationOptions, Payload};
use crate::progress::{ProgressEstimator, ProgressUpdate, ESTIMATED_GENERATION};
use crate::provider::{ApiStatus, JobStatus, RemoteApi, ResultFile, QUERY_ACTION, SUBMIT_ACTION};
use hy3d_core::{Hy3dError, Result};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How long and how often to poll a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up (client-side) after this long
    pub max_wait: Duration,
    pub poll_interval: Duration,
    /// Expected running time, used only for progress estimation
    pub estimated_generation: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
            estimated_generation: ESTIMATED_GENERATION,
        }
    }
}

impl WaitOptions {
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// A zero poll interval would hammer the status endpoint
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Hy3dError::Validation(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client for the asynchronous Hunyuan 3D job API
#[derive(Clone)]
pub struct ApiClient {
    api: Arc<dyn RemoteApi>,
}

impl ApiClient {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    pub fn api_name(&self) -> &str {
        self.api.name()
    }

    pub fn health_check(&self) -> ApiStatus {
        self.api.health_check()
    }

    /// Submit a generation job. Invalid input is rejected before any
    /// request is made.
    pub fn submit(&self, payload: &Payload, options: &GenerationOptions) -> Result<Job> {
        let body = build_submit_payload(payload, options)?;

        let raw = self.api.call(SUBMIT_ACTION, &body).map_err(|e| match e {
            Hy3dError::Transport(message) => Hy3dError::Submission {
                code: None,
                message,
            },
            other => other,
        })?;
        let response = unwrap_response(&raw)
            .map_err(|(code, message)| Hy3dError::Submission { code, message })?;

        let job_id = response
            .get("JobId")
            .and_then(|j| j.as_str())
            .filter(|j| !j.is_empty())
            .ok_or_else(|| Hy3dError::Submission {
                code: None,
                message: format!("Response did not include a JobId: {}", response),
            })?;

        info!(job_id, kind = %payload.kind(), api = self.api_name(), "submitted generation job");
        Ok(Job::new(job_id, payload, *options))
    }

    pub fn submit_text(&self, prompt: &str, options: &GenerationOptions) -> Result<Job> {
        self.submit(&Payload::Text(prompt.to_string()), options)
    }

    pub fn submit_image(&self, image_base64: String, options: &GenerationOptions) -> Result<Job> {
        self.submit(&Payload::ImageBase64(image_base64), options)
    }

    /// Fetch the current status of a job
    pub fn query_status(&self, job_id: &str) -> Result<JobStatus> {
        let raw = self
            .api
            .call(QUERY_ACTION, &serde_json::json!({ "JobId": job_id }))
            .map_err(|e| match e {
                Hy3dError::Transport(message) => Hy3dError::Query {
                    code: None,
                    message,
                },
                other => other,
            })?;
        let response =
            unwrap_response(&raw).map_err(|(code, message)| Hy3dError::Query { code, message })?;
        parse_status(response)
    }

    /// Poll until the job reaches a terminal state, the wait budget runs
    /// out, or `cancel` fires.
    ///
    /// The sleep before the final poll is clipped to the deadline, so this
    /// returns within `max_wait` plus one request round trip.
    pub fn wait_for_completion(
        &self,
        job_id: &str,
        wait: &WaitOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<Vec<ResultFile>> {
        wait.validate()?;
        let start = Instant::now();
        let mut estimator = ProgressEstimator::new(wait.max_wait, wait.estimated_generation);

        loop {
            if cancel.is_cancelled() {
                return Err(Hy3dError::Cancelled(job_id.to_string()));
            }

            let status = self.query_status(job_id)?;
            let elapsed = start.elapsed();
            debug!(job_id, status = %status.phase(), elapsed_secs = elapsed.as_secs(), "polled job");

            if let Some(update) = estimator.observe(status.phase(), elapsed) {
                on_progress(&update);
            }

            match status {
                JobStatus::Done { files } => {
                    info!(job_id, files = files.len(), elapsed_secs = elapsed.as_secs(), "job completed");
                    return Ok(files);
                }
                JobStatus::Failed { code, message } => {
                    error!(job_id, code = %code, message = %message, "job failed");
                    return Err(Hy3dError::JobFailed {
                        job_id: job_id.to_string(),
                        code: Some(code).filter(|c| !c.is_empty()),
                        message,
                    });
                }
                JobStatus::Waiting | JobStatus::Running => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= wait.max_wait {
                warn!(job_id, waited_secs = elapsed.as_secs(), "gave up waiting for job");
                return Err(Hy3dError::Timeout {
                    job_id: job_id.to_string(),
                    waited_secs: elapsed.as_secs(),
                });
            }

            let nap = wait.poll_interval.min(wait.max_wait - elapsed);
            if !cancel.sleep(nap) {
                return Err(Hy3dError::Cancelled(job_id.to_string()));
            }
        }
    }

    /// Download `url` to `destination`.
    ///
    /// Data is streamed into a hidden `.<name>.part` sibling that is renamed
    /// into place only after the transfer completes, so `destination` either
    /// holds a complete file or does not exist.
    pub fn download_asset(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp = part_path(destination)?;
        match self.download_to(url, &temp) {
            Ok(bytes) => {
                if let Err(e) = std::fs::rename(&temp, destination) {
                    let _ = std::fs::remove_file(&temp);
                    return Err(e.into());
                }
                info!(url, path = %destination.display(), bytes, "downloaded model");
                Ok(destination.to_path_buf())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&temp);
                Err(e)
            }
        }
    }

    fn download_to(&self, url: &str, temp: &Path) -> Result<u64> {
        let mut file = File::create(temp)?;
        let bytes = self.api.download(url, &mut file)?;
        if bytes == 0 {
            return Err(Hy3dError::Download(format!("Empty response body from {}", url)));
        }
        file.sync_all()?;
        Ok(bytes)
    }
}

/// In-flight downloads live next to their destination as `.<name>.part`
pub fn part_path(destination: &Path) -> Result<PathBuf> {
    let name = destination
        .file_name()
        .ok_or_else(|| {
            Hy3dError::Download(format!("Invalid destination path: {}", destination.display()))
        })?
        .to_string_lossy();
    Ok(destination.with_file_name(format!(".{}.part", name)))
}

/// Extract `Response` from a raw body, or the remote error it carries
fn unwrap_response(raw: &Value) -> std::result::Result<&Value, (Option<String>, String)> {
    let response = raw
        .get("Response")
        .ok_or_else(|| (None, format!("Malformed response: {}", raw)))?;

    if let Some(err) = response.get("Error") {
        let code = err
            .get("Code")
            .and_then(|c| c.as_str())
            .map(|c| c.to_string());
        let message = err
            .get("Message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err((code, message));
    }

    Ok(response)
}

fn parse_status(response: &Value) -> Result<JobStatus> {
    let status = response
        .get("Status")
        .and_then(|s| s.as_str())
        .unwrap_or_default();

    match status {
        "WAIT" => Ok(JobStatus::Waiting),
        "RUN" => Ok(JobStatus::Running),
        "FAIL" => Ok(JobStatus::Failed {
            code: str_field(response, "ErrorCode").unwrap_or_default(),
            message: str_field(response, "ErrorMessage")
                .unwrap_or_else(|| "Unknown error".to_string()),
        }),
        "DONE" => Ok(JobStatus::Done {
            files: parse_result_files(response),
        }),
        other => Err(Hy3dError::Query {
            code: None,
            message: format!("Unknown job status '{}'", other),
        }),
    }
}

fn parse_result_files(response: &Value) -> Vec<ResultFile> {
    response
        .get("ResultFile3Ds")
        .and_then(|f| f.as_array())
        .map(|files| {
            files
                .iter()
                .filter_map(|f| {
                    let url = str_field(f, "Url")?;
                    Some(ResultFile {
                        file_type: str_field(f, "Type").unwrap_or_default(),
                        url,
                        preview_url: str_field(f, "PreviewImageUrl"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A non-empty string field
fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
