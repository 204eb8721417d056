//! CLI command implementations

pub mod batch;
pub mod generate;
pub mod job;
pub mod preview;
pub mod storage;

use anyhow::Result;
use hy3d_gen::providers::create_api;
use hy3d_gen::{ApiClient, ApiStatus, FileManager, Hy3dConfig, JobStore, ProgressUpdate};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Resolved config plus the chosen backend, shared by all commands
pub struct Context {
    pub config: Hy3dConfig,
    pub provider: String,
}

impl Context {
    pub fn load(provider: &str, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Hy3dConfig::load_from_file(path)?,
            None => Hy3dConfig::load()?,
        };
        debug!(provider, storage = %config.storage_root().display(), "config loaded");
        Ok(Self {
            config,
            provider: provider.to_string(),
        })
    }

    pub fn client(&self) -> Result<ApiClient> {
        let api = create_api(&self.provider, &self.config)?;
        if api.health_check() == ApiStatus::NoCredentials {
            anyhow::bail!("Provider '{}' has no credentials configured", self.provider);
        }
        Ok(ApiClient::new(Arc::from(api)))
    }

    pub fn job_store(&self) -> JobStore {
        JobStore::new(self.config.jobs_dir())
    }

    pub fn file_manager(&self) -> Result<FileManager> {
        Ok(FileManager::new(self.config.storage_root())?)
    }
}

/// One line per progress tick
pub fn print_progress(update: &ProgressUpdate) {
    println!("  [{:>3}%] {}", update.percent, update.message);
}
