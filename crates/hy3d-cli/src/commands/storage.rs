//! Managed storage: usage report and cleanup

use super::Context;
use anyhow::Result;
use clap::Subcommand;
use hy3d_gen::files::{
    CACHE_MAX_AGE_HOURS, CACHE_MAX_FILES, MODELS_MAX_AGE_HOURS, MODELS_MAX_FILES,
};
use hy3d_gen::FileManager;

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// Show storage locations and disk usage
    Info,

    /// Delete old or excess files from models/ and cache/
    Cleanup {
        /// Delete files at least this many hours old
        #[arg(long)]
        max_age_hours: Option<u64>,

        /// Keep at most this many files per directory (newest first)
        #[arg(long)]
        max_files: Option<usize>,
    },
}

pub fn run(ctx: &Context, cmd: StorageCommands) -> Result<()> {
    let files = ctx.file_manager()?;
    match cmd {
        StorageCommands::Info => {
            println!("{}", files.storage_info());
        }
        StorageCommands::Cleanup {
            max_age_hours: None,
            max_files: None,
        } => {
            let models = files.cleanup_models();
            let cache = files.cleanup_cache();
            println!("Removed {} model file(s) and {} cache file(s)", models, cache);
        }
        StorageCommands::Cleanup {
            max_age_hours,
            max_files,
        } => {
            let models = FileManager::cleanup_directory(
                files.models_dir(),
                max_age_hours.unwrap_or(MODELS_MAX_AGE_HOURS),
                max_files.unwrap_or(MODELS_MAX_FILES),
            );
            let cache = FileManager::cleanup_directory(
                files.cache_dir(),
                max_age_hours.unwrap_or(CACHE_MAX_AGE_HOURS),
                max_files.unwrap_or(CACHE_MAX_FILES),
            );
            println!("Removed {} model file(s) and {} cache file(s)", models, cache);
        }
    }
    Ok(())
}
