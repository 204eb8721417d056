//! Host-facing node adapters
//!
//! Each node takes typed, validated parameters and returns a
//! `NodeOutput`: a human-readable status text plus the typed payload. A
//! host that can only show strings passes the result through
//! `render_output`.

use crate::batch::{collect_inputs, run_batch, BatchEvent, BatchReport, BatchRequest, DEFAULT_MAX_IMAGES, DEFAULT_PATTERN};
use crate::cancel::CancelToken;
use crate::client::{ApiClient, WaitOptions};
use crate::config::{Credentials, DEFAULT_ENDPOINT};
use crate::files::FileManager;
use crate::image_input::{encode_image_jpeg, JPEG_QUALITY, NODE_MAX_DIM};
use crate::options::{GenerateType, GenerationOptions, Payload, PolygonType, DEFAULT_FACE_COUNT};
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressUpdate;
use crate::providers::tencent::TencentApi;
use hy3d_core::{Hy3dError, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const MIN_WAIT_SECS: u64 = 60;
pub const MAX_WAIT_SECS: u64 = 3600;
pub const DEFAULT_WAIT_SECS: u64 = 600;
pub const MAX_IMAGES_LIMIT: usize = 100;
pub const DEFAULT_PROMPT: &str = "A cute robot toy";
pub const DEFAULT_OUTPUT_FOLDER: &str = "batch_output";
const ERROR_MARKER: &str = "Error: ";
const VIEWER_URL: &str = "https://gltf-viewer.donmccurdy.com/";

/// Status text for display plus the typed result
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput<T> {
    pub display_text: String,
    pub payload: T,
}

/// Flatten a node result into a single string, marking failures
pub fn render_output<T>(result: &Result<NodeOutput<T>>) -> String {
    match result {
        Ok(output) => output.display_text.clone(),
        Err(e) => format!("{}{}", ERROR_MARKER, e),
    }
}

/// Builds credentials from user-entered strings
pub struct ConfigNode;

impl ConfigNode {
    pub fn create(secret_id: &str, secret_key: &str, region: &str) -> Result<Credentials> {
        Credentials::new(secret_id, secret_key, region)
    }
}

/// Parameters shared by the generation nodes
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub enable_pbr: bool,
    pub face_count: u32,
    pub generate_type: GenerateType,
    pub polygon_type: PolygonType,
    pub max_wait_secs: u64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            enable_pbr: false,
            face_count: DEFAULT_FACE_COUNT,
            generate_type: GenerateType::Normal,
            polygon_type: PolygonType::Triangle,
            max_wait_secs: DEFAULT_WAIT_SECS,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WAIT_SECS..=MAX_WAIT_SECS).contains(&self.max_wait_secs) {
            return Err(Hy3dError::Validation(format!(
                "max_wait_secs must be between {} and {}, got {}",
                MIN_WAIT_SECS, MAX_WAIT_SECS, self.max_wait_secs
            )));
        }
        self.options().validate()
    }

    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            enable_pbr: self.enable_pbr,
            face_count: self.face_count,
            generate_type: self.generate_type,
            polygon_type: self.polygon_type,
        }
    }

    fn wait(&self, base: WaitOptions) -> WaitOptions {
        base.with_max_wait(Duration::from_secs(self.max_wait_secs))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextTo3dParams {
    pub prompt: String,
    pub generation: GenerationParams,
}

impl Default for TextTo3dParams {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            generation: GenerationParams::default(),
        }
    }
}

/// Text prompt to GLB in the managed models directory
pub struct TextTo3dNode {
    client: ApiClient,
    files: FileManager,
    wait: WaitOptions,
}

impl TextTo3dNode {
    pub fn new(client: ApiClient, files: FileManager) -> Self {
        Self {
            client,
            files,
            wait: WaitOptions::default(),
        }
    }

    pub fn with_credentials(credentials: Credentials, files: FileManager) -> Self {
        Self::new(tencent_client(credentials), files)
    }

    /// Override polling cadence; `max_wait` still comes from the parameters
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn run(
        &self,
        params: &TextTo3dParams,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<NodeOutput<PathBuf>> {
        params.generation.validate()?;
        let payload = Payload::Text(params.prompt.clone());
        payload.validate()?;

        let destination = self.files.output_path_for_prompt(&params.prompt);
        let outcome = Orchestrator::new(self.client.clone()).generate(
            &payload,
            &params.generation.options(),
            &destination,
            &params.generation.wait(self.wait),
            cancel,
            on_progress,
        )?;

        Ok(NodeOutput {
            display_text: outcome.summary(),
            payload: outcome.model_path,
        })
    }
}

/// In-memory image to GLB in the managed models directory
pub struct ImageTo3dNode {
    client: ApiClient,
    files: FileManager,
    wait: WaitOptions,
}

impl ImageTo3dNode {
    pub fn new(client: ApiClient, files: FileManager) -> Self {
        Self {
            client,
            files,
            wait: WaitOptions::default(),
        }
    }

    pub fn with_credentials(credentials: Credentials, files: FileManager) -> Self {
        Self::new(tencent_client(credentials), files)
    }

    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn run(
        &self,
        image: &DynamicImage,
        params: &GenerationParams,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<NodeOutput<PathBuf>> {
        params.validate()?;
        let encoded = encode_image_jpeg(image, NODE_MAX_DIM, JPEG_QUALITY)?;

        let destination = self.files.output_path_for_prompt("image_to_3d");
        let outcome = Orchestrator::new(self.client.clone()).generate(
            &Payload::ImageBase64(encoded),
            &params.options(),
            &destination,
            &params.wait(self.wait),
            cancel,
            on_progress,
        )?;

        Ok(NodeOutput {
            display_text: outcome.summary(),
            payload: outcome.model_path,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchParams {
    pub input_folder: PathBuf,
    pub file_pattern: String,
    /// Subfolder of the node's output root
    pub output_folder: String,
    pub max_images: usize,
    pub generation: GenerationParams,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("input"),
            file_pattern: DEFAULT_PATTERN.to_string(),
            output_folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            max_images: DEFAULT_MAX_IMAGES,
            generation: GenerationParams::default(),
        }
    }
}

/// A folder of images to GLBs under `<output_root>/<output_folder>`
pub struct BatchImageTo3dNode {
    client: ApiClient,
    output_root: PathBuf,
    wait: WaitOptions,
}

impl BatchImageTo3dNode {
    pub fn new(client: ApiClient, output_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_root: output_root.into(),
            wait: WaitOptions::default(),
        }
    }

    pub fn with_credentials(credentials: Credentials, output_root: impl Into<PathBuf>) -> Self {
        Self::new(tencent_client(credentials), output_root)
    }

    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Display text is the batch summary; the report's `model_paths()`
    /// gives the newline-joined outputs
    pub fn run(
        &self,
        params: &BatchParams,
        cancel: &CancelToken,
        on_event: &mut dyn FnMut(BatchEvent<'_>),
    ) -> Result<NodeOutput<BatchReport>> {
        params.generation.validate()?;
        if !(1..=MAX_IMAGES_LIMIT).contains(&params.max_images) {
            return Err(Hy3dError::Validation(format!(
                "max_images must be between 1 and {}, got {}",
                MAX_IMAGES_LIMIT, params.max_images
            )));
        }

        let inputs = collect_inputs(&params.input_folder, &params.file_pattern, params.max_images)?;
        if inputs.is_empty() {
            return Err(Hy3dError::Validation(format!(
                "No images found in '{}' matching '{}'",
                params.input_folder.display(),
                params.file_pattern
            )));
        }

        let mut request = BatchRequest::new(inputs, self.output_root.join(&params.output_folder));
        request.options = params.generation.options();
        request.wait = params.generation.wait(self.wait);

        let orchestrator = Orchestrator::new(self.client.clone());
        let report = run_batch(&orchestrator, &request, cancel, on_event);
        Ok(NodeOutput {
            display_text: report.summary(),
            payload: report,
        })
    }
}

/// Describes a single model file
pub struct PreviewNode;

impl PreviewNode {
    pub fn preview(model_path: &str) -> NodeOutput<String> {
        let path = Path::new(model_path);
        let display_text = match file_size_mb(path) {
            Some(size_mb) => format!(
                "3D model preview\n\
                 File: {}\n\
                 Path: {}\n\
                 Size: {:.2} MB\n\
                 \n\
                 Open it in Blender or {}",
                file_name(path),
                model_path,
                size_mb,
                VIEWER_URL
            ),
            None => format!("{}Model file not found: {}", ERROR_MARKER, model_path),
        };
        NodeOutput {
            display_text,
            payload: model_path.to_string(),
        }
    }
}

/// Steps through the newline-separated outputs of a batch run
pub struct BatchPreviewNode;

impl BatchPreviewNode {
    /// `index` is clamped into range
    pub fn preview(model_paths: &str, index: usize) -> NodeOutput<String> {
        let paths: Vec<&str> = model_paths
            .lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if paths.is_empty() {
            return NodeOutput {
                display_text: format!("{}No model paths provided", ERROR_MARKER),
                payload: String::new(),
            };
        }

        let index = index.min(paths.len() - 1);
        let selected = paths[index];
        let path = Path::new(selected);

        let display_text = match file_size_mb(path) {
            Some(size_mb) => format!(
                "Batch model preview ({}/{})\n\
                 File: {}\n\
                 Path: {}\n\
                 Size: {:.2} MB\n\
                 \n\
                 Index {} of 0..={}; change the index to view another model.\n\
                 Viewer: {}",
                index + 1,
                paths.len(),
                file_name(path),
                selected,
                size_mb,
                index,
                paths.len() - 1,
                VIEWER_URL
            ),
            None => format!("{}Model file not found: {}", ERROR_MARKER, selected),
        };
        NodeOutput {
            display_text,
            payload: selected.to_string(),
        }
    }
}

fn tencent_client(credentials: Credentials) -> ApiClient {
    ApiClient::new(Arc::new(TencentApi::new(credentials, DEFAULT_ENDPOINT)))
}

fn file_size_mb(path: &Path) -> Option<f64> {
    let meta = std::fs::metadata(path).ok().filter(|m| m.is_file())?;
    Some(meta.len() as f64 / (1024.0 * 1024.0))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
