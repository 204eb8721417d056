//! Managed model storage
//!
//! Downloads land in `<base>/models`; `<base>/cache` holds short-lived
//! intermediates. Both are pruned by age and count.

use hy3d_core::{ContentHash, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

const SLUG_MAX_CHARS: usize = 50;
const PART_SUFFIX: &str = ".part";

pub const MODELS_MAX_AGE_HOURS: u64 = 24;
pub const MODELS_MAX_FILES: usize = 50;
pub const CACHE_MAX_AGE_HOURS: u64 = 6;
pub const CACHE_MAX_FILES: usize = 20;

/// File counts and sizes for the managed directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub models_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub models_count: usize,
    pub models_bytes: u64,
    pub cache_count: usize,
    pub cache_bytes: u64,
}

impl DiskUsage {
    pub fn total_bytes(&self) -> u64 {
        self.models_bytes + self.cache_bytes
    }
}

pub struct FileManager {
    base_dir: PathBuf,
    models_dir: PathBuf,
    cache_dir: PathBuf,
}

impl FileManager {
    /// Open (and create if needed) the managed directories under `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let models_dir = base_dir.join("models");
        let cache_dir = base_dir.join("cache");
        std::fs::create_dir_all(&models_dir)?;
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            base_dir,
            models_dir,
            cache_dir,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// A unique filename for `prompt`, stamped with the current time
    pub fn generate_filename(prompt: &str, extension: &str) -> String {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::generate_filename_at(prompt, extension, now)
    }

    /// `<slug>_<hash8>_<timestamp>.<ext>`. The slug keeps word characters,
    /// with runs of whitespace and hyphens collapsed to `_`; the hash covers
    /// the whole prompt, so long prompts sharing a prefix still differ.
    pub fn generate_filename_at(prompt: &str, extension: &str, timestamp: u64) -> String {
        let hash = ContentHash::from_str(prompt).short_hex(8);
        format!("{}_{}_{}.{}", slugify(prompt), hash, timestamp, extension)
    }

    pub fn model_path(&self, filename: &str) -> PathBuf {
        self.models_dir.join(filename)
    }

    pub fn cache_path(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Fresh GLB path under `models/` for a prompt (or a label such as
    /// `image_to_3d`)
    pub fn output_path_for_prompt(&self, prompt: &str) -> PathBuf {
        self.model_path(&Self::generate_filename(prompt, "glb"))
    }

    /// Delete files in `dir` that are at least `max_age_hours` old or that
    /// fall outside the `max_files` most recently modified. Returns how many
    /// were deleted.
    ///
    /// Subdirectories and in-flight `.part` downloads are left alone.
    /// Failures on individual files are logged and skipped.
    pub fn cleanup_directory(dir: &Path, max_age_hours: u64, max_files: usize) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %dir.display(), error = %e, "cannot read directory for cleanup");
                }
                return 0;
            }
        };

        let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if is_partial(&path) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) if meta.is_file() => {
                    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    files.push((path, modified));
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "cannot stat file"),
            }
        }

        // Newest first
        files.sort_by(|a, b| b.1.cmp(&a.1));

        let now = SystemTime::now();
        let max_age = Duration::from_secs(max_age_hours.saturating_mul(3600));
        let mut deleted = 0;

        for (index, (path, modified)) in files.iter().enumerate() {
            let age = now.duration_since(*modified).unwrap_or(Duration::ZERO);
            if age < max_age && index < max_files {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete file"),
            }
        }

        if deleted > 0 {
            info!(dir = %dir.display(), deleted, "cleaned up old files");
        }
        deleted
    }

    pub fn cleanup_models(&self) -> usize {
        Self::cleanup_directory(&self.models_dir, MODELS_MAX_AGE_HOURS, MODELS_MAX_FILES)
    }

    pub fn cleanup_cache(&self) -> usize {
        Self::cleanup_directory(&self.cache_dir, CACHE_MAX_AGE_HOURS, CACHE_MAX_FILES)
    }

    /// Count and size the files in both managed directories. Read-only.
    pub fn disk_usage(&self) -> DiskUsage {
        let (models_count, models_bytes) = dir_usage(&self.models_dir);
        let (cache_count, cache_bytes) = dir_usage(&self.cache_dir);
        DiskUsage {
            models_dir: self.models_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            models_count,
            models_bytes,
            cache_count,
            cache_bytes,
        }
    }

    pub fn storage_info(&self) -> String {
        let usage = self.disk_usage();
        format!(
            "Storage Information:\n\
             Models directory: {}\n\
             - Files: {}\n\
             - Size: {}\n\
             \n\
             Cache directory: {}\n\
             - Files: {}\n\
             - Size: {}\n\
             \n\
             Total size: {}",
            usage.models_dir.display(),
            usage.models_count,
            format_size(usage.models_bytes),
            usage.cache_dir.display(),
            usage.cache_count,
            format_size(usage.cache_bytes),
            format_size(usage.total_bytes())
        )
    }
}

/// Human-readable size with one decimal, e.g. `1.5 MB`
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

fn slugify(prompt: &str) -> String {
    let mut slug = String::new();
    let mut in_separator = false;
    for c in prompt.trim().chars() {
        if c.is_whitespace() || c == '-' {
            in_separator = true;
        } else if c.is_alphanumeric() || c == '_' {
            if in_separator {
                slug.push('_');
                in_separator = false;
            }
            slug.push(c);
        }
    }
    if in_separator {
        slug.push('_');
    }
    slug.chars().take(SLUG_MAX_CHARS).collect()
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(PART_SUFFIX))
        .unwrap_or(false)
}

fn dir_usage(dir: &Path) -> (usize, u64) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return (0, 0);
    };
    entries
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .fold((0, 0), |(count, bytes), m| (count + 1, bytes + m.len()))
}
