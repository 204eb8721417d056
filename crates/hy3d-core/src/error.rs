//! Error types for hy3d

use crate::hints;
use thiserror::Error;

/// The main error type for hy3d operations
#[derive(Debug, Error)]
pub enum Hy3dError {
    /// Rejected locally, before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Submission failed: {}", remote(.code, .message))]
    Submission {
        code: Option<String>,
        message: String,
    },

    #[error("Status query failed: {}", remote(.code, .message))]
    Query {
        code: Option<String>,
        message: String,
    },

    /// The client stopped waiting; the remote job may still be running
    #[error("Job {job_id} did not complete within {waited_secs} seconds")]
    Timeout { job_id: String, waited_secs: u64 },

    #[error("Job {job_id} failed: {}", remote(.code, .message))]
    JobFailed {
        job_id: String,
        code: Option<String>,
        message: String,
    },

    #[error("Job {job_id} finished without a {file_type} file in its results")]
    MissingResult { job_id: String, file_type: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Cancelled while waiting for job {0}")]
    Cancelled(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

/// Result type alias for hy3d operations
pub type Result<T> = std::result::Result<T, Hy3dError>;

fn remote(code: &Option<String>, message: &str) -> String {
    hints::describe(code.as_deref(), message)
}

impl Hy3dError {
    /// Remote error code carried by this error, if any
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Hy3dError::Submission { code, .. }
            | Hy3dError::Query { code, .. }
            | Hy3dError::JobFailed { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Hy3dError {
    fn from(err: toml::de::Error) -> Self {
        Hy3dError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for Hy3dError {
    fn from(err: toml::ser::Error) -> Self {
        Hy3dError::TomlSerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_failed_includes_code_and_hint() {
        let err = Hy3dError::JobFailed {
            job_id: "job-1".to_string(),
            code: Some("ResourceInsufficient".to_string()),
            message: "quota exhausted".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("job-1"));
        assert!(text.contains("[ResourceInsufficient] quota exhausted"));
        assert!(text.contains(hints::hint_for("ResourceInsufficient").unwrap().title));
    }

    #[test]
    fn test_submission_without_code() {
        let err = Hy3dError::Submission {
            code: None,
            message: "no JobId in response".to_string(),
        };
        assert_eq!(err.to_string(), "Submission failed: no JobId in response");
        assert_eq!(err.remote_code(), None);
    }

    #[test]
    fn test_remote_code_accessor() {
        let err = Hy3dError::Query {
            code: Some("AuthFailure.SignatureFailure".to_string()),
            message: "bad signature".to_string(),
        };
        assert_eq!(err.remote_code(), Some("AuthFailure.SignatureFailure"));
        assert!(Hy3dError::Download("HTTP 404".into()).remote_code().is_none());
    }
}
