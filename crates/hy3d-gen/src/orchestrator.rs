//! End-to-end generation of one model
//!
//! submit -> wait -> pick the GLB result -> download. When a `JobStore` is
//! attached, every state transition is written to disk so an interrupted
//! or timed-out job can be resumed later.

use crate::cancel::CancelToken;
use crate::client::{ApiClient, WaitOptions};
use crate::job::{Job, JobRecord, JobState, JobStore};
use crate::options::{GenerationOptions, Payload};
use crate::progress::ProgressUpdate;
use crate::provider::{JobPhase, ResultFile};
use hy3d_core::{ContentHash, Hy3dError, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Type tag of the result file that is downloaded
pub const MODEL_FILE_TYPE: &str = "GLB";

/// Pick the model file from a job's results: the first entry tagged
/// exactly `GLB`.
pub fn select_model_file(files: &[ResultFile]) -> Option<&ResultFile> {
    let mut glb = files.iter().filter(|f| f.file_type == MODEL_FILE_TYPE);
    let first = glb.next();
    if first.is_some() && glb.next().is_some() {
        debug!("multiple GLB results, using the first");
    }
    first
}

/// Result of a completed generation
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub job: Job,
    pub files: Vec<ResultFile>,
    pub model_path: PathBuf,
    pub elapsed_secs: f64,
    pub content_hash: ContentHash,
}

impl GenerationOutcome {
    pub fn summary(&self) -> String {
        format!(
            "Model saved: {}\nJob ID: {}\nTime: {:.1}s\nSHA-256: {}",
            self.model_path.display(),
            self.job.id,
            self.elapsed_secs,
            self.content_hash.short_hex(16)
        )
    }
}

/// Drives one job through its full lifecycle
pub struct Orchestrator<'a> {
    client: ApiClient,
    store: Option<&'a JobStore>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            store: None,
        }
    }

    /// Persist job records to `store` as they change
    pub fn with_store(mut self, store: &'a JobStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Submit a job and see it through to a downloaded model at `destination`
    pub fn generate(
        &self,
        payload: &Payload,
        options: &GenerationOptions,
        destination: &Path,
        wait: &WaitOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<GenerationOutcome> {
        self.generate_tracked(payload, options, destination, None, wait, cancel, on_progress)
    }

    /// Like `generate`, recording `source` (e.g. the input image path) in
    /// the job record
    #[allow(clippy::too_many_arguments)]
    pub fn generate_tracked(
        &self,
        payload: &Payload,
        options: &GenerationOptions,
        destination: &Path,
        source: Option<&Path>,
        wait: &WaitOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<GenerationOutcome> {
        wait.validate()?;
        let start = Instant::now();
        let job = self.client.submit(payload, options)?;

        let mut record = JobRecord::new(job);
        record.source = source.map(|p| p.display().to_string());
        record.output_path = Some(destination.display().to_string());
        self.persist(&record);

        self.complete(record, destination, start, wait, cancel, on_progress)
    }

    /// Re-attach to a job that was submitted earlier and finish it
    pub fn resume(
        &self,
        record: JobRecord,
        destination: &Path,
        wait: &WaitOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<GenerationOutcome> {
        if !record.state.is_resumable() {
            return Err(Hy3dError::Validation(format!(
                "Job {} is {} and cannot be resumed",
                record.id(),
                record.state
            )));
        }
        let mut record = record;
        record.error = None;
        record.output_path = Some(destination.display().to_string());
        self.complete(record, destination, Instant::now(), wait, cancel, on_progress)
    }

    fn complete(
        &self,
        mut record: JobRecord,
        destination: &Path,
        start: Instant,
        wait: &WaitOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<GenerationOutcome> {
        let job_id = record.id().to_string();

        let mut last_phase: Option<JobPhase> = None;
        let waited = {
            let mut track = |update: &ProgressUpdate| {
                record.progress = update.percent;
                if last_phase != Some(update.phase) {
                    last_phase = Some(update.phase);
                    record.set_state(update.phase.into());
                    self.persist(&record);
                }
                on_progress(update);
            };
            self.client
                .wait_for_completion(&job_id, wait, cancel, &mut track)
        };

        let files = match waited {
            Ok(files) => files,
            Err(e) => {
                let state = match e {
                    Hy3dError::Timeout { .. } => JobState::TimedOut,
                    Hy3dError::Cancelled(_) => JobState::Cancelled,
                    Hy3dError::JobFailed { .. } => JobState::Failed,
                    // Transport trouble says nothing about the remote job
                    _ => record.state,
                };
                return Err(self.fail(&mut record, state, e));
            }
        };

        let Some(model) = select_model_file(&files) else {
            let err = Hy3dError::MissingResult {
                job_id,
                file_type: MODEL_FILE_TYPE.to_string(),
            };
            return Err(self.fail(&mut record, JobState::Failed, err));
        };

        let model_path = match self.client.download_asset(&model.url, destination) {
            Ok(path) => path,
            Err(e) => return Err(self.fail(&mut record, JobState::Failed, e)),
        };
        let content_hash = ContentHash::from_file(&model_path)?;

        record.set_state(JobState::Done);
        record.progress = 100;
        record.output_path = Some(model_path.display().to_string());
        self.persist(&record);

        Ok(GenerationOutcome {
            job: record.job,
            files,
            model_path,
            elapsed_secs: start.elapsed().as_secs_f64(),
            content_hash,
        })
    }

    fn fail(&self, record: &mut JobRecord, state: JobState, err: Hy3dError) -> Hy3dError {
        record.set_state(state);
        record.error = Some(err.to_string());
        self.persist(record);
        err
    }

    fn persist(&self, record: &JobRecord) {
        if let Some(store) = self.store {
            if let Err(e) = store.save(record) {
                warn!(job_id = record.id(), error = %e, "failed to save job record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockApi, MockStatus};
    use std::sync::Arc;
    use std::time::Duration;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hy3d_orch_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fast_wait() -> WaitOptions {
        WaitOptions {
            max_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(5),
            estimated_generation: Duration::from_millis(50),
        }
    }

    fn glb(url: &str) -> ResultFile {
        ResultFile {
            file_type: "GLB".to_string(),
            url: url.to_string(),
            preview_url: None,
        }
    }

    #[test]
    fn test_select_model_file() {
        let obj = ResultFile {
            file_type: "OBJ".to_string(),
            url: "http://x/model.obj".to_string(),
            preview_url: None,
        };
        let lower = ResultFile {
            file_type: "glb".to_string(),
            ..glb("http://x/lower.glb")
        };
        let files = vec![obj.clone(), lower, glb("http://x/a.glb"), glb("http://x/b.glb")];
        assert_eq!(select_model_file(&files).unwrap().url, "http://x/a.glb");
        assert!(select_model_file(&[obj]).is_none());
        assert!(select_model_file(&[]).is_none());
    }

    #[test]
    fn test_cute_robot_toy_end_to_end() {
        let dir = temp_dir();
        let store = JobStore::new(dir.join("jobs"));
        let mock = Arc::new(
            MockApi::new()
                .with_statuses(vec![
                    MockStatus::Wait,
                    MockStatus::Run,
                    MockStatus::Run,
                    MockStatus::done_glb("http://x/model.glb"),
                ])
                .with_download("http://x/model.glb", b"glTF robot".to_vec()),
        );
        let orch = Orchestrator::new(ApiClient::new(mock.clone())).with_store(&store);
        let dest = dir.join("models").join("robot.glb");

        let mut last = 0;
        let outcome = orch
            .generate(
                &Payload::Text("A cute robot toy".to_string()),
                &GenerationOptions::default(),
                &dest,
                &fast_wait(),
                &CancelToken::new(),
                &mut |u| last = u.percent,
            )
            .unwrap();

        assert_eq!(last, 100);
        assert_eq!(outcome.model_path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"glTF robot");
        assert_eq!(outcome.content_hash, ContentHash::from_bytes(b"glTF robot"));
        assert!(outcome.summary().contains("robot.glb"));

        let record = store.load(&outcome.job.id).unwrap();
        assert_eq!(record.state, JobState::Done);
        assert_eq!(record.progress, 100);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_poll_interval_submits_nothing() {
        let dir = temp_dir();
        let mock = Arc::new(MockApi::new());
        let orch = Orchestrator::new(ApiClient::new(mock.clone()));
        let wait = WaitOptions {
            poll_interval: Duration::ZERO,
            ..fast_wait()
        };
        let err = orch
            .generate(
                &Payload::Text("a chair".into()),
                &GenerationOptions::default(),
                &dir.join("chair.glb"),
                &wait,
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, Hy3dError::Validation(_)));
        assert!(mock.calls().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_glb_is_reported() {
        let dir = temp_dir();
        let mock = Arc::new(MockApi::new().with_statuses(vec![MockStatus::Done(vec![ResultFile {
            file_type: "OBJ".to_string(),
            url: "http://x/model.obj".to_string(),
            preview_url: None,
        }])]));
        let orch = Orchestrator::new(ApiClient::new(mock));
        let err = orch
            .generate(
                &Payload::Text("a chair".into()),
                &GenerationOptions::default(),
                &dir.join("chair.glb"),
                &fast_wait(),
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, Hy3dError::MissingResult { .. }));
        assert!(!dir.join("chair.glb").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_timeout_then_resume() {
        let dir = temp_dir();
        let store = JobStore::new(dir.join("jobs"));
        let mock = Arc::new(MockApi::new().with_statuses(vec![
            MockStatus::Wait,
            MockStatus::Wait,
            MockStatus::Wait,
            MockStatus::Wait,
            MockStatus::Wait,
            MockStatus::Run,
            MockStatus::done_glb("mock://model.glb"),
        ]));
        let orch = Orchestrator::new(ApiClient::new(mock)).with_store(&store);
        let dest = dir.join("lamp.glb");
        let short = WaitOptions {
            max_wait: Duration::from_millis(1),
            ..fast_wait()
        };

        let err = orch
            .generate(
                &Payload::Text("a lamp".into()),
                &GenerationOptions::default(),
                &dest,
                &short,
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap_err();
        let Hy3dError::Timeout { job_id, .. } = err else { panic!("expected timeout") };

        let record = store.load(&job_id).unwrap();
        assert_eq!(record.state, JobState::TimedOut);
        assert!(record.error.is_some());

        let outcome = orch
            .resume(record, &dest, &fast_wait(), &CancelToken::new(), &mut |_| {})
            .unwrap();
        assert!(dest.exists());
        assert_eq!(outcome.job.id, job_id);
        assert_eq!(store.load(&job_id).unwrap().state, JobState::Done);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_job_not_resumable() {
        let dir = temp_dir();
        let store = JobStore::new(dir.join("jobs"));
        let mock = Arc::new(
            MockApi::new().with_statuses(vec![MockStatus::fail("ResourceInsufficient", "quota")]),
        );
        let orch = Orchestrator::new(ApiClient::new(mock)).with_store(&store);
        let err = orch
            .generate(
                &Payload::Text("a tree".into()),
                &GenerationOptions::default(),
                &dir.join("tree.glb"),
                &fast_wait(),
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap_err();
        let Hy3dError::JobFailed { job_id, .. } = err else { panic!("expected JobFailed") };

        let record = store.load(&job_id).unwrap();
        assert_eq!(record.state, JobState::Failed);
        let err = orch
            .resume(record, &dir.join("tree.glb"), &fast_wait(), &CancelToken::new(), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, Hy3dError::Validation(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
