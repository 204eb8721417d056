//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `HY3D_SECRET_ID`, `HY3D_SECRET_KEY`, `HY3D_REGION`
//! 2. Project-local: `.hy3d/config.toml`
//! 3. Global: `~/.hy3d/config.toml`

use crate::client::WaitOptions;
use crate::options::{GenerateType, GenerationOptions, PolygonType};
use hy3d_core::{Hy3dError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REGION: &str = "ap-singapore";
pub const DEFAULT_ENDPOINT: &str = "hunyuan.intl.tencentcloudapi.com";

/// Validated API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub secret_id: String,
    pub secret_key: String,
    pub region: String,
}

impl Credentials {
    /// Build credentials from user-entered strings. Values are trimmed and
    /// must not be empty; an empty region falls back to the default.
    pub fn new(secret_id: &str, secret_key: &str, region: &str) -> Result<Self> {
        let secret_id = secret_id.trim();
        let secret_key = secret_key.trim();
        if secret_id.is_empty() {
            return Err(Hy3dError::Validation("Secret ID cannot be empty".to_string()));
        }
        if secret_key.is_empty() {
            return Err(Hy3dError::Validation("Secret Key cannot be empty".to_string()));
        }
        let region = match region.trim() {
            "" => DEFAULT_REGION,
            r => r,
        };
        Ok(Self {
            secret_id: secret_id.to_string(),
            secret_key: secret_key.to_string(),
            region: region.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub secret_id: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Generation defaults; unset fields fall back to the built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub enable_pbr: Option<bool>,
    #[serde(default)]
    pub face_count: Option<u32>,
    #[serde(default)]
    pub generate_type: Option<GenerateType>,
    #[serde(default)]
    pub polygon_type: Option<PolygonType>,
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub estimated_generation_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `models/` and `cache/`
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Where job records are kept
    #[serde(default)]
    pub jobs_dir: Option<PathBuf>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hy3dConfigFile {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct Hy3dConfig {
    pub credentials: CredentialsConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
}

impl Hy3dConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = Hy3dConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(".hy3d/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        Ok(config.into())
    }

    /// Load config from a specific file path only, still honoring env vars
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config.into())
    }

    /// Validated credentials, or a `Validation` error naming what is missing
    pub fn credentials(&self) -> Result<Credentials> {
        let id = self.credentials.secret_id.as_deref().unwrap_or_default();
        let key = self.credentials.secret_key.as_deref().unwrap_or_default();
        let region = self.credentials.region.as_deref().unwrap_or(DEFAULT_REGION);
        Credentials::new(id, key, region).map_err(|e| {
            Hy3dError::Validation(format!(
                "{}. Set HY3D_SECRET_ID / HY3D_SECRET_KEY or add them to .hy3d/config.toml",
                match e {
                    Hy3dError::Validation(msg) => msg,
                    other => other.to_string(),
                }
            ))
        })
    }

    pub fn endpoint(&self) -> &str {
        self.credentials.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Generation options with config values layered over the defaults
    pub fn options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        let g = &self.generation;
        GenerationOptions {
            enable_pbr: g.enable_pbr.unwrap_or(defaults.enable_pbr),
            face_count: g.face_count.unwrap_or(defaults.face_count),
            generate_type: g.generate_type.unwrap_or(defaults.generate_type),
            polygon_type: g.polygon_type.unwrap_or(defaults.polygon_type),
        }
    }

    pub fn wait_options(&self) -> WaitOptions {
        let defaults = WaitOptions::default();
        let g = &self.generation;
        WaitOptions {
            max_wait: g.max_wait_secs.map(Duration::from_secs).unwrap_or(defaults.max_wait),
            poll_interval: g
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            estimated_generation: g
                .estimated_generation_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.estimated_generation),
        }
    }

    /// Root of the managed `models/` and `cache/` directories
    pub fn storage_root(&self) -> PathBuf {
        self.storage.root.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("hy3d"))
                .unwrap_or_else(|| PathBuf::from(".hy3d"))
        })
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.storage
            .jobs_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".hy3d/jobs"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".hy3d").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<Hy3dConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Hy3dError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    fn merge_into(base: &mut Hy3dConfigFile, overlay: Hy3dConfigFile) {
        let c = overlay.credentials;
        merge_opt(&mut base.credentials.secret_id, c.secret_id);
        merge_opt(&mut base.credentials.secret_key, c.secret_key);
        merge_opt(&mut base.credentials.region, c.region);
        merge_opt(&mut base.credentials.endpoint, c.endpoint);

        let g = overlay.generation;
        merge_opt(&mut base.generation.enable_pbr, g.enable_pbr);
        merge_opt(&mut base.generation.face_count, g.face_count);
        merge_opt(&mut base.generation.generate_type, g.generate_type);
        merge_opt(&mut base.generation.polygon_type, g.polygon_type);
        merge_opt(&mut base.generation.max_wait_secs, g.max_wait_secs);
        merge_opt(&mut base.generation.poll_interval_secs, g.poll_interval_secs);
        merge_opt(
            &mut base.generation.estimated_generation_secs,
            g.estimated_generation_secs,
        );

        merge_opt(&mut base.storage.root, overlay.storage.root);
        merge_opt(&mut base.storage.jobs_dir, overlay.storage.jobs_dir);
    }

    fn apply_env_overrides<F>(config: &mut Hy3dConfigFile, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = env("HY3D_SECRET_ID") {
            config.credentials.secret_id = Some(id);
        }
        if let Some(key) = env("HY3D_SECRET_KEY") {
            config.credentials.secret_key = Some(key);
        }
        if let Some(region) = env("HY3D_REGION") {
            config.credentials.region = Some(region);
        }
    }
}

impl From<Hy3dConfigFile> for Hy3dConfig {
    fn from(file: Hy3dConfigFile) -> Self {
        Self {
            credentials: file.credentials,
            generation: file.generation,
            storage: file.storage,
        }
    }
}

fn merge_opt<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn temp_config(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hy3d_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn parse(content: &str) -> Hy3dConfigFile {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_credentials_trimmed() {
        let c = Credentials::new("  AKID123 ", "\tsecret\n", "").unwrap();
        assert_eq!(c.secret_id, "AKID123");
        assert_eq!(c.secret_key, "secret");
        assert_eq!(c.region, DEFAULT_REGION);
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(matches!(
            Credentials::new("   ", "key", "ap-singapore"),
            Err(Hy3dError::Validation(_))
        ));
        assert!(matches!(
            Credentials::new("id", "", "ap-singapore"),
            Err(Hy3dError::Validation(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let c = Credentials::new("id", "very-secret", "ap-singapore").unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("very-secret"));
        assert!(dbg.contains("***"));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = temp_config(
            r#"
[credentials]
secret_id = "file-id"
secret_key = "file-key"
endpoint = "hunyuan.example.com"

[generation]
face_count = 100000
generate_type = "LowPoly"
polygon_type = "quadrilateral"
max_wait_secs = 900

[storage]
root = "/tmp/hy3d-store"
"#,
        );
        let mut file = Hy3dConfig::load_file(&path).unwrap();
        Hy3dConfig::apply_env_overrides(&mut file, |_| None);
        let config: Hy3dConfig = file.into();

        let creds = config.credentials().unwrap();
        assert_eq!(creds.secret_id, "file-id");
        assert_eq!(creds.region, DEFAULT_REGION);
        assert_eq!(config.endpoint(), "hunyuan.example.com");

        let opts = config.options();
        assert_eq!(opts.face_count, 100_000);
        assert_eq!(opts.generate_type, GenerateType::LowPoly);
        assert_eq!(opts.polygon_type, PolygonType::Quadrilateral);
        assert!(!opts.enable_pbr);

        let wait = config.wait_options();
        assert_eq!(wait.max_wait, Duration::from_secs(900));
        assert_eq!(wait.poll_interval, WaitOptions::default().poll_interval);
        assert_eq!(config.storage_root(), PathBuf::from("/tmp/hy3d-store"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_env_overrides_win() {
        let mut file = parse(
            r#"
[credentials]
secret_id = "file-id"
secret_key = "file-key"
"#,
        );
        let env: HashMap<&str, &str> =
            [("HY3D_SECRET_KEY", "env-key"), ("HY3D_REGION", "ap-tokyo")].into();
        Hy3dConfig::apply_env_overrides(&mut file, |k| env.get(k).map(|v| v.to_string()));
        let config: Hy3dConfig = file.into();
        let creds = config.credentials().unwrap();
        assert_eq!(creds.secret_id, "file-id");
        assert_eq!(creds.secret_key, "env-key");
        assert_eq!(creds.region, "ap-tokyo");
    }

    #[test]
    fn test_merge_overlay_precedence() {
        let mut base = parse(
            r#"
[credentials]
secret_id = "global-id"
secret_key = "global-key"
[generation]
face_count = 60000
enable_pbr = true
"#,
        );
        let overlay = parse(
            r#"
[credentials]
secret_id = "project-id"
[generation]
face_count = 80000
"#,
        );
        Hy3dConfig::merge_into(&mut base, overlay);
        assert_eq!(base.credentials.secret_id.as_deref(), Some("project-id"));
        assert_eq!(base.credentials.secret_key.as_deref(), Some("global-key"));
        assert_eq!(base.generation.face_count, Some(80_000));
        assert_eq!(base.generation.enable_pbr, Some(true));
    }

    #[test]
    fn test_missing_credentials_error_mentions_env() {
        let config = Hy3dConfig::default();
        let err = config.credentials().unwrap_err().to_string();
        assert!(err.contains("Secret ID cannot be empty"));
        assert!(err.contains("HY3D_SECRET_ID"));
    }

    #[test]
    fn test_invalid_config_file() {
        let path = temp_config("[generation]\nface_count = \"many\"\n");
        let err = Hy3dConfig::load_file(&path).unwrap_err();
        assert!(matches!(err, Hy3dError::Config(_)));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
