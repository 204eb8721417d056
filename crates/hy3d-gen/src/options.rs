//! Generation options and submit payloads

use hy3d_core::{Hy3dError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_FACE_COUNT: u32 = 40_000;
pub const MAX_FACE_COUNT: u32 = 1_500_000;
pub const DEFAULT_FACE_COUNT: u32 = 500_000;

/// Generation mode understood by the remote service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerateType {
    #[default]
    Normal,
    LowPoly,
    Geometry,
    Sketch,
}

impl GenerateType {
    pub const ALL: [GenerateType; 4] = [
        GenerateType::Normal,
        GenerateType::LowPoly,
        GenerateType::Geometry,
        GenerateType::Sketch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerateType::Normal => "Normal",
            GenerateType::LowPoly => "LowPoly",
            GenerateType::Geometry => "Geometry",
            GenerateType::Sketch => "Sketch",
        }
    }
}

impl fmt::Display for GenerateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerateType {
    type Err = Hy3dError;

    fn from_str(s: &str) -> Result<Self> {
        GenerateType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Hy3dError::Validation(format!(
                    "Unknown generate type '{}'. Use: Normal, LowPoly, Geometry, Sketch",
                    s
                ))
            })
    }
}

/// Polygon layout, only meaningful for `GenerateType::LowPoly`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolygonType {
    #[default]
    Triangle,
    Quadrilateral,
}

impl PolygonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolygonType::Triangle => "triangle",
            PolygonType::Quadrilateral => "quadrilateral",
        }
    }
}

impl fmt::Display for PolygonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolygonType {
    type Err = Hy3dError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "triangle" => Ok(PolygonType::Triangle),
            "quadrilateral" => Ok(PolygonType::Quadrilateral),
            _ => Err(Hy3dError::Validation(format!(
                "Unknown polygon type '{}'. Use: triangle, quadrilateral",
                s
            ))),
        }
    }
}

/// Options shared by text and image submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub enable_pbr: bool,
    #[serde(default = "default_face_count")]
    pub face_count: u32,
    #[serde(default)]
    pub generate_type: GenerateType,
    #[serde(default)]
    pub polygon_type: PolygonType,
}

fn default_face_count() -> u32 {
    DEFAULT_FACE_COUNT
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            enable_pbr: false,
            face_count: DEFAULT_FACE_COUNT,
            generate_type: GenerateType::Normal,
            polygon_type: PolygonType::Triangle,
        }
    }
}

impl GenerationOptions {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_FACE_COUNT..=MAX_FACE_COUNT).contains(&self.face_count) {
            return Err(Hy3dError::Validation(format!(
                "face_count must be between {} and {}, got {}",
                MIN_FACE_COUNT, MAX_FACE_COUNT, self.face_count
            )));
        }
        Ok(())
    }

    /// The polygon type to transmit, if any
    pub fn transmitted_polygon_type(&self) -> Option<PolygonType> {
        (self.generate_type == GenerateType::LowPoly).then_some(self.polygon_type)
    }
}

/// What the job is generated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Base64-encoded image bytes
    ImageBase64(String),
}

impl Payload {
    pub fn kind(&self) -> InputKind {
        match self {
            Payload::Text(_) => InputKind::Text,
            Payload::ImageBase64(_) => InputKind::Image,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Payload::Text(prompt) if prompt.trim().is_empty() => {
                Err(Hy3dError::Validation("Prompt cannot be empty".to_string()))
            }
            Payload::ImageBase64(data) if data.is_empty() => {
                Err(Hy3dError::Validation("Image data cannot be empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Image,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Image => write!(f, "image"),
        }
    }
}

/// Build the `SubmitHunyuanTo3DProJob` request body.
///
/// Validates the payload and options first, so nothing invalid ever
/// reaches the network.
pub fn build_submit_payload(
    payload: &Payload,
    options: &GenerationOptions,
) -> Result<serde_json::Value> {
    payload.validate()?;
    options.validate()?;

    let mut body = serde_json::json!({
        "EnablePBR": options.enable_pbr,
        "FaceCount": options.face_count,
        "GenerateType": options.generate_type.as_str(),
    });

    match payload {
        Payload::Text(prompt) => body["Prompt"] = serde_json::json!(prompt.trim()),
        Payload::ImageBase64(data) => body["ImageBase64"] = serde_json::json!(data),
    }

    if let Some(polygon) = options.transmitted_polygon_type() {
        body["PolygonType"] = serde_json::json!(polygon.as_str());
    }

    Ok(body)
}
