//! hy3d CLI - Generate 3D models with Hunyuan 3D from the command line

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, generate, job, preview, storage, Context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hy3d")]
#[command(about = "Text and image to 3D generation with Hunyuan 3D", long_about = None)]
#[command(version)]
struct Cli {
    /// Remote API backend (tencent, mock)
    #[arg(long, global = true, default_value = "tencent")]
    provider: String,

    /// Read config from this file instead of ~/.hy3d and .hy3d
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a model from a text prompt
    Text {
        /// Description of the object to generate
        prompt: String,

        /// Output path (defaults to a unique file under the models directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        generation: generate::GenerationArgs,
    },

    /// Generate a model from an image file
    Image {
        /// Path to the input image
        path: PathBuf,

        /// Output path (defaults to a unique file under the models directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        generation: generate::GenerationArgs,
    },

    /// Generate models for every matching image in a folder, one at a time
    Batch(batch::BatchArgs),

    /// Inspect and resume tracked jobs
    #[command(subcommand)]
    Job(job::JobCommands),

    /// Managed storage operations
    #[command(subcommand)]
    Storage(storage::StorageCommands),

    /// Describe one or more generated model files
    Preview {
        /// Model paths
        #[arg(required = true)]
        paths: Vec<String>,

        /// Which of several paths to show
        #[arg(long, default_value = "0")]
        index: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let ctx = || Context::load(&cli.provider, cli.config.as_deref());

    match cli.command {
        Commands::Text {
            prompt,
            output,
            generation,
        } => generate::run_text(&ctx()?, &prompt, output, &generation),
        Commands::Image {
            path,
            output,
            generation,
        } => generate::run_image(&ctx()?, &path, output, &generation),
        Commands::Batch(args) => batch::run(&ctx()?, &args),
        Commands::Job(cmd) => job::run(&ctx()?, cmd),
        Commands::Storage(cmd) => storage::run(&ctx()?, cmd),
        Commands::Preview { paths, index } => preview::run(&paths, index),
    }
}
