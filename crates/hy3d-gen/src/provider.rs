//! Remote API trait and the status/result types it reports

use hy3d_core::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

pub const SUBMIT_ACTION: &str = "SubmitHunyuanTo3DProJob";
pub const QUERY_ACTION: &str = "QueryHunyuanTo3DProJob";

/// One downloadable file attached to a finished job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFile {
    /// Type tag reported by the service (e.g. "GLB")
    pub file_type: String,
    pub url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Status of a remote job as reported by a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Running,
    Failed { code: String, message: String },
    Done { files: Vec<ResultFile> },
}

impl JobStatus {
    pub fn phase(&self) -> JobPhase {
        match self {
            JobStatus::Waiting => JobPhase::Waiting,
            JobStatus::Running => JobPhase::Running,
            JobStatus::Failed { .. } => JobPhase::Failed,
            JobStatus::Done { .. } => JobPhase::Done,
        }
    }
}

/// Payload-free view of `JobStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Waiting,
    Running,
    Failed,
    Done,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Waiting => write!(f, "waiting"),
            JobPhase::Running => write!(f, "running"),
            JobPhase::Failed => write!(f, "failed"),
            JobPhase::Done => write!(f, "done"),
        }
    }
}

/// Connectivity/credential state of an API implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Available,
    NoCredentials,
}

/// Trait implemented by each remote API backend (Tencent Cloud, mock).
///
/// Implementations only move bytes: building request bodies and
/// interpreting responses is the job of `ApiClient`.
pub trait RemoteApi: Send + Sync {
    /// Backend name (e.g. "tencent", "mock")
    fn name(&self) -> &str;

    /// Check whether the backend can be used at all
    fn health_check(&self) -> ApiStatus;

    /// Invoke one cloud API action and return the raw JSON response body
    fn call(&self, action: &str, payload: &serde_json::Value) -> Result<serde_json::Value>;

    /// Stream the body at `url` into `sink`, returning the byte count.
    /// A non-success HTTP status is a `Download` error.
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}
