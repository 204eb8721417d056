//! Submitted jobs and their on-disk tracking records
//!
//! Records are persisted as `.job.toml` files in `.hy3d/jobs/` so a job
//! that outlives a client-side timeout can still be inspected and resumed.

use crate::options::{GenerationOptions, InputKind, Payload};
use crate::provider::JobPhase;
use chrono::{DateTime, Utc};
use hy3d_core::{Hy3dError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A job accepted by the remote service. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier assigned by the service
    pub id: String,
    pub kind: InputKind,
    /// Prompt text, for text jobs only
    #[serde(default)]
    pub prompt: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub options: GenerationOptions,
}

impl Job {
    pub fn new(id: impl Into<String>, payload: &Payload, options: GenerationOptions) -> Self {
        let prompt = match payload {
            Payload::Text(p) => Some(p.trim().to_string()),
            Payload::ImageBase64(_) => None,
        };
        Self {
            id: id.into(),
            kind: payload.kind(),
            prompt,
            submitted_at: Utc::now(),
            options,
        }
    }
}

/// Client-side view of where a tracked job stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Waiting,
    Running,
    Done,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    /// Whether the remote job can still produce a result
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            JobState::Submitted
                | JobState::Waiting
                | JobState::Running
                | JobState::TimedOut
                | JobState::Cancelled
        )
    }
}

impl From<JobPhase> for JobState {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Waiting => JobState::Waiting,
            JobPhase::Running => JobState::Running,
            JobPhase::Failed => JobState::Failed,
            JobPhase::Done => JobState::Done,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Submitted => "submitted",
            JobState::Waiting => "waiting",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed out",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// A persisted job plus its mutable tracking state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub state: JobState,
    /// Last reported progress (0-100)
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error: Option<String>,
    /// Input image for image jobs
    #[serde(default)]
    pub source: Option<String>,
    /// Where the model is (or will be) written
    #[serde(default)]
    pub output_path: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub job: Job,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        Self {
            state: JobState::Submitted,
            progress: 0,
            error: None,
            source: None,
            output_path: None,
            updated_at: Utc::now(),
            job,
        }
    }

    pub fn id(&self) -> &str {
        &self.job.id
    }

    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// File-based job store in `.hy3d/jobs/`
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    /// Create a new job store at the given root directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Default job store location
    pub fn default_store() -> Self {
        Self::new(".hy3d/jobs")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save a record to disk
    pub fn save(&self, record: &JobRecord) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let wrapper = JobFile {
            record: record.clone(),
        };
        let content = toml::to_string_pretty(&wrapper)?;
        std::fs::write(self.record_path(record.id()), content)?;
        Ok(())
    }

    /// Load a record by remote job ID
    pub fn load(&self, job_id: &str) -> Result<JobRecord> {
        let path = self.record_path(job_id);
        if !path.exists() {
            return Err(Hy3dError::JobNotFound(job_id.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        let file: JobFile = toml::from_str(&content)?;
        Ok(file.record)
    }

    /// List all tracked jobs, oldest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        let mut records = Vec::new();

        if !self.root.exists() {
            return Ok(records);
        }

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".job.toml"))
                .unwrap_or(false);
            if !is_record {
                continue;
            }
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable job file");
                    continue;
                }
            };
            match toml::from_str::<JobFile>(&content) {
                Ok(file) => records.push(file.record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable job file"),
            }
        }

        records.sort_by_key(|r| r.job.submitted_at);
        Ok(records)
    }

    /// Update a record's state and progress and save it
    pub fn update_state(&self, job_id: &str, state: JobState, progress: u8) -> Result<JobRecord> {
        let mut record = self.load(job_id)?;
        record.set_state(state);
        record.progress = progress;
        self.save(&record)?;
        Ok(record)
    }

    fn record_path(&self, job_id: &str) -> PathBuf {
        let safe: String = job_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.job.toml", safe))
    }
}

#[derive(Serialize, Deserialize)]
struct JobFile {
    record: JobRecord,
}
