//! hy3d Gen - Hunyuan 3D generation pipeline
//!
//! Submits text or image jobs to the Hunyuan 3D API, polls them to
//! completion with synthesized progress, downloads the resulting GLB into
//! managed storage, and runs folders of images as sequential batches.
//! Jobs are tracked on disk so timed-out work can be resumed.

pub mod batch;
pub mod cancel;
pub mod client;
pub mod config;
pub mod files;
pub mod image_input;
pub mod job;
pub mod nodes;
pub mod options;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod providers;

pub use batch::{collect_inputs, run_batch, BatchEvent, BatchItem, BatchReport, BatchRequest};
pub use cancel::CancelToken;
pub use client::{ApiClient, WaitOptions};
pub use config::{Credentials, Hy3dConfig};
pub use files::{DiskUsage, FileManager};
pub use job::{Job, JobRecord, JobState, JobStore};
pub use options::{GenerateType, GenerationOptions, InputKind, Payload, PolygonType};
pub use orchestrator::{select_model_file, GenerationOutcome, Orchestrator};
pub use progress::{ProgressEstimator, ProgressUpdate};
pub use provider::{ApiStatus, JobPhase, JobStatus, RemoteApi, ResultFile};
