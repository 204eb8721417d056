//! Single text or image generation

use super::{print_progress, Context};
use anyhow::Result;
use clap::Args;
use hy3d_gen::image_input::{encode_image_file, BATCH_MAX_DIM};
use hy3d_gen::{
    CancelToken, GenerateType, GenerationOptions, GenerationOutcome, Hy3dConfig, Orchestrator,
    Payload, PolygonType, WaitOptions,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Generation flags shared by `text`, `image` and `batch`. Unset flags
/// fall back to the config file, then to the built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Request PBR materials
    #[arg(long)]
    pub pbr: bool,

    /// Target face count (40000-1500000)
    #[arg(long)]
    pub face_count: Option<u32>,

    /// Normal, LowPoly, Geometry or Sketch
    #[arg(long)]
    pub generate_type: Option<GenerateType>,

    /// triangle or quadrilateral (LowPoly only)
    #[arg(long)]
    pub polygon_type: Option<PolygonType>,

    /// Seconds to wait before giving up client-side
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Seconds between status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

impl GenerationArgs {
    pub fn options(&self, config: &Hy3dConfig) -> GenerationOptions {
        let mut options = config.options();
        if self.pbr {
            options.enable_pbr = true;
        }
        if let Some(face_count) = self.face_count {
            options.face_count = face_count;
        }
        if let Some(generate_type) = self.generate_type {
            options.generate_type = generate_type;
        }
        if let Some(polygon_type) = self.polygon_type {
            options.polygon_type = polygon_type;
        }
        options
    }

    pub fn wait(&self, config: &Hy3dConfig) -> WaitOptions {
        let mut wait = config.wait_options();
        if let Some(secs) = self.max_wait {
            wait.max_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_interval {
            wait.poll_interval = Duration::from_secs(secs);
        }
        wait
    }
}

pub fn run_text(
    ctx: &Context,
    prompt: &str,
    output: Option<PathBuf>,
    args: &GenerationArgs,
) -> Result<()> {
    let files = ctx.file_manager()?;
    let destination = output.unwrap_or_else(|| files.output_path_for_prompt(prompt));
    let options = args.options(&ctx.config);

    println!(
        "Generating '{}' via {} ({}, {} faces, PBR: {})...",
        prompt.trim(),
        ctx.provider,
        options.generate_type,
        options.face_count,
        options.enable_pbr
    );

    let store = ctx.job_store();
    let orchestrator = Orchestrator::new(ctx.client()?).with_store(&store);
    let outcome = orchestrator.generate(
        &Payload::Text(prompt.to_string()),
        &options,
        &destination,
        &args.wait(&ctx.config),
        &CancelToken::new(),
        &mut print_progress,
    )?;

    print_outcome(&outcome);
    Ok(())
}

pub fn run_image(
    ctx: &Context,
    path: &Path,
    output: Option<PathBuf>,
    args: &GenerationArgs,
) -> Result<()> {
    let files = ctx.file_manager()?;
    let destination = output.unwrap_or_else(|| {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image_to_3d".to_string());
        files.output_path_for_prompt(&stem)
    });
    let options = args.options(&ctx.config);

    println!("Encoding {}...", path.display());
    let image = encode_image_file(path, BATCH_MAX_DIM)?;

    println!(
        "Generating from image via {} ({}, {} faces, PBR: {})...",
        ctx.provider, options.generate_type, options.face_count, options.enable_pbr
    );

    let store = ctx.job_store();
    let orchestrator = Orchestrator::new(ctx.client()?).with_store(&store);
    let outcome = orchestrator.generate_tracked(
        &Payload::ImageBase64(image),
        &options,
        &destination,
        Some(path),
        &args.wait(&ctx.config),
        &CancelToken::new(),
        &mut print_progress,
    )?;

    print_outcome(&outcome);
    Ok(())
}

pub fn print_outcome(outcome: &GenerationOutcome) {
    println!();
    println!("{}", outcome.summary());
}
