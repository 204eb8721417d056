//! API registry
//!
//! Maps backend names to concrete `RemoteApi` implementations.

pub mod mock;
pub mod signing;
pub mod tencent;

use crate::config::Hy3dConfig;
use crate::provider::RemoteApi;
use hy3d_core::{Hy3dError, Result};

/// Create a remote API backend by name with configuration
pub fn create_api(name: &str, config: &Hy3dConfig) -> Result<Box<dyn RemoteApi>> {
    match name {
        "mock" => Ok(Box::new(mock::MockApi::new())),
        "tencent" => Ok(Box::new(tencent::TencentApi::from_config(config)?)),
        _ => Err(Hy3dError::Config(format!(
            "Unknown provider '{}'. Available: {}",
            name,
            available_apis().join(", ")
        ))),
    }
}

/// List all available backend names
pub fn available_apis() -> Vec<&'static str> {
    vec!["tencent", "mock"]
}
