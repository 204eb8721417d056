//! Batch image-to-3D processing
//!
//! Runs a folder of images through the generation pipeline one at a time.
//! A failing item is recorded and the batch moves on; the report always
//! accounts for every input.

use crate::cancel::CancelToken;
use crate::client::WaitOptions;
use crate::image_input::{encode_image_file, BATCH_MAX_DIM};
use crate::options::{GenerationOptions, Payload};
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressUpdate;
use hy3d_core::{Hy3dError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_PATTERN: &str = "*.png";
pub const DEFAULT_MAX_IMAGES: usize = 10;

/// What to process and how
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub inputs: Vec<PathBuf>,
    pub options: GenerationOptions,
    pub output_dir: PathBuf,
    pub wait: WaitOptions,
    pub max_image_dim: u32,
}

impl BatchRequest {
    pub fn new(inputs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            options: GenerationOptions::default(),
            output_dir: output_dir.into(),
            wait: WaitOptions::default(),
            max_image_dim: BATCH_MAX_DIM,
        }
    }

    /// `<output_dir>/<stem>_3d.glb`
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        self.output_dir.join(format!("{}_3d.glb", stem))
    }
}

/// Outcome for one input
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub input: PathBuf,
    pub job_id: Option<String>,
    pub output: Option<PathBuf>,
    pub success: bool,
    pub message: String,
}

impl BatchItem {
    fn failed(input: &Path, job_id: Option<String>, message: String) -> Self {
        Self {
            input: input.to_path_buf(),
            job_id,
            output: None,
            success: false,
            message,
        }
    }
}

/// Notifications emitted while a batch runs
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started {
        index: usize,
        total: usize,
        input: &'a Path,
    },
    Progress {
        index: usize,
        update: &'a ProgressUpdate,
    },
    Finished {
        index: usize,
        total: usize,
        item: &'a BatchItem,
    },
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub output_dir: PathBuf,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Paths of the successfully generated models, one per line
    pub fn model_paths(&self) -> String {
        self.items
            .iter()
            .filter_map(|i| i.output.as_ref())
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Batch processing complete\n\
             Successful: {}\n\
             Failed: {}\n\
             Total: {}\n\
             Output: {}\n\
             \n\
             Results:",
            self.succeeded(),
            self.failed(),
            self.total(),
            self.output_dir.display()
        );
        for item in &self.items {
            let name = item
                .input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let status = if item.success { "OK" } else { "FAILED" };
            out.push_str(&format!("\n[{}] {}: {}", status, name, item.message));
        }
        out
    }
}

/// Process every input in order. Never fails as a whole: per-item errors
/// end up in the item's message.
pub fn run_batch(
    orchestrator: &Orchestrator<'_>,
    request: &BatchRequest,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(BatchEvent<'_>),
) -> BatchReport {
    let total = request.inputs.len();
    info!(total, output_dir = %request.output_dir.display(), "starting batch");

    let mut items = Vec::with_capacity(total);
    for (index, input) in request.inputs.iter().enumerate() {
        if cancel.is_cancelled() {
            items.push(BatchItem::failed(
                input,
                None,
                "Cancelled before processing".to_string(),
            ));
            continue;
        }

        on_event(BatchEvent::Started {
            index,
            total,
            input,
        });
        let item = process_item(orchestrator, request, input, cancel, &mut |update| {
            on_event(BatchEvent::Progress { index, update })
        });
        if !item.success {
            warn!(input = %input.display(), message = %item.message, "batch item failed");
        }
        on_event(BatchEvent::Finished {
            index,
            total,
            item: &item,
        });
        items.push(item);
    }

    let report = BatchReport {
        items,
        output_dir: request.output_dir.clone(),
    };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    report
}

fn process_item(
    orchestrator: &Orchestrator<'_>,
    request: &BatchRequest,
    input: &Path,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(&ProgressUpdate),
) -> BatchItem {
    let image = match encode_image_file(input, request.max_image_dim) {
        Ok(image) => image,
        Err(e) => return BatchItem::failed(input, None, e.to_string()),
    };

    let destination = request.output_path_for(input);
    match orchestrator.generate_tracked(
        &Payload::ImageBase64(image),
        &request.options,
        &destination,
        Some(input),
        &request.wait,
        cancel,
        on_progress,
    ) {
        Ok(outcome) => BatchItem {
            input: input.to_path_buf(),
            job_id: Some(outcome.job.id.clone()),
            message: format!("Saved to {}", outcome.model_path.display()),
            output: Some(outcome.model_path),
            success: true,
        },
        Err(e) => BatchItem::failed(input, error_job_id(&e), e.to_string()),
    }
}

fn error_job_id(err: &Hy3dError) -> Option<String> {
    match err {
        Hy3dError::Timeout { job_id, .. }
        | Hy3dError::JobFailed { job_id, .. }
        | Hy3dError::MissingResult { job_id, .. } => Some(job_id.clone()),
        Hy3dError::Cancelled(job_id) => Some(job_id.clone()),
        _ => None,
    }
}

/// Files in `dir` whose names match `pattern`, sorted by path and capped
/// at `max`
pub fn collect_inputs(dir: &Path, pattern: &str, max: usize) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Hy3dError::Validation(format!(
            "Input folder not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| wildcard_match(pattern, n))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files.truncate(max);
    Ok(files)
}

/// Shell-style match supporting `*` (any run) and `?` (any one char)
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((star_pi, star_ni)) = star {
            pi = star_pi + 1;
            ni = star_ni + 1;
            star = Some((star_pi, star_ni + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::provider::SUBMIT_ACTION;
    use crate::providers::mock::MockApi;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;
    use std::time::Duration;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hy3d_batch_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path) {
        RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 255]))
            .save(path)
            .unwrap();
    }

    fn request(inputs: Vec<PathBuf>, output_dir: PathBuf) -> BatchRequest {
        let mut req = BatchRequest::new(inputs, output_dir);
        req.wait = WaitOptions {
            max_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(2),
            estimated_generation: Duration::from_millis(20),
        };
        req
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.png", "cat.png"));
        assert!(!wildcard_match("*.png", "cat.jpg"));
        assert!(wildcard_match("img_??.png", "img_01.png"));
        assert!(!wildcard_match("img_??.png", "img_1.png"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
        assert!(wildcard_match("**.glb", "x.glb"));
    }

    #[test]
    fn test_collect_inputs_sorted_and_capped() {
        let dir = temp_dir();
        for name in ["c.png", "a.png", "b.png", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        std::fs::create_dir_all(dir.join("sub.png")).unwrap();

        let files = collect_inputs(&dir, "*.png", 2).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, ["a.png", "b.png"]);

        assert!(collect_inputs(&dir.join("missing"), "*.png", 10).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_one_failing_submission_does_not_stop_batch() {
        let dir = temp_dir();
        let inputs: Vec<PathBuf> = ["a.png", "b.png", "c.png"].iter().map(|n| dir.join(n)).collect();
        inputs.iter().for_each(|p| write_png(p));

        let mock = Arc::new(MockApi::new().fail_submission(1, "LimitExceeded", "slow down"));
        let orch = Orchestrator::new(ApiClient::new(mock.clone()));
        let out = dir.join("out");

        let mut finished = 0;
        let report = run_batch(&orch, &request(inputs, out.clone()), &CancelToken::new(), &mut |e| {
            if let BatchEvent::Finished { .. } = e {
                finished += 1;
            }
        });

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(finished, 3);
        assert!(!report.items[1].success);
        assert!(report.items[1].message.contains("LimitExceeded"));
        assert!(report.items[2].success);
        assert_eq!(mock.count_calls(SUBMIT_ACTION), 3);

        assert!(out.join("a_3d.glb").exists());
        assert!(!out.join("b_3d.glb").exists());
        assert!(out.join("c_3d.glb").exists());
        assert_eq!(report.model_paths().lines().count(), 2);
        assert!(report.summary().contains("Successful: 2"));
        assert!(report.summary().contains("[FAILED] b.png"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unreadable_image_is_item_failure() {
        let dir = temp_dir();
        let bogus = dir.join("broken.png");
        std::fs::write(&bogus, b"not an image").unwrap();

        let mock = Arc::new(MockApi::new());
        let orch = Orchestrator::new(ApiClient::new(mock.clone()));
        let report = run_batch(&orch, &request(vec![bogus], dir.join("out")), &CancelToken::new(), &mut |_| {});

        assert_eq!(report.failed(), 1);
        assert!(mock.calls().is_empty());
        assert_eq!(report.model_paths(), "");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_cancelled_batch_records_every_item() {
        let dir = temp_dir();
        let inputs: Vec<PathBuf> = ["a.png", "b.png"].iter().map(|n| dir.join(n)).collect();
        inputs.iter().for_each(|p| write_png(p));

        let mock = Arc::new(MockApi::new());
        let orch = Orchestrator::new(ApiClient::new(mock.clone()));
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = run_batch(&orch, &request(inputs, dir.join("out")), &cancel, &mut |_| {});

        assert_eq!(report.total(), 2);
        assert_eq!(report.failed(), 2);
        assert!(report.items.iter().all(|i| i.message.contains("Cancelled")));
        assert!(mock.calls().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_output_path_uses_stem() {
        let req = BatchRequest::new(vec![], "batch_output");
        assert_eq!(
            req.output_path_for(Path::new("in/photo.final.jpg")),
            PathBuf::from("batch_output/photo.final_3d.glb")
        );
    }
}
