//! Image payload preparation for image-to-3D jobs

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hy3d_core::{Hy3dError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::warn;

/// Longest side for images read from disk in batch runs
pub const BATCH_MAX_DIM: u32 = 2048;
/// Longest side for in-memory images handed over by a host
pub const NODE_MAX_DIM: u32 = 1024;
pub const JPEG_QUALITY: u8 = 85;
/// Encoded payloads above this size may be rejected by the service
pub const PAYLOAD_WARN_BYTES: usize = 4 * 1024 * 1024;

/// Extensions accepted as image inputs
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

/// Load an image file and return it as base64 PNG, downscaled so its
/// longest side is at most `max_dim`
pub fn encode_image_file(path: &Path, max_dim: u32) -> Result<String> {
    let img = image::open(path)
        .map_err(|e| Hy3dError::Image(format!("Failed to open {}: {}", path.display(), e)))?;
    let img = fit_within(img, max_dim);

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Hy3dError::Image(format!("Failed to encode {}: {}", path.display(), e)))?;
    Ok(to_base64(&buf))
}

/// Flatten any transparency onto white, downscale to `max_dim`, and return
/// the image as base64 JPEG
pub fn encode_image_jpeg(img: &DynamicImage, max_dim: u32, quality: u8) -> Result<String> {
    let rgb = fit_within(DynamicImage::ImageRgb8(flatten_on_white(img)), max_dim).to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| Hy3dError::Image(format!("Failed to encode JPEG: {}", e)))?;
    Ok(to_base64(&buf))
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn fit_within(img: DynamicImage, max_dim: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_dim {
        return img;
    }
    img.resize(max_dim, max_dim, FilterType::Lanczos3)
}

fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, image::Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

fn to_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    if encoded.len() > PAYLOAD_WARN_BYTES {
        warn!(
            size_mb = encoded.len() as f64 / (1024.0 * 1024.0),
            "image payload is larger than 4 MB and may be rejected"
        );
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("hy3d_image_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn decode(b64: &str) -> DynamicImage {
        image::load_from_memory(&STANDARD.decode(b64).unwrap()).unwrap()
    }

    #[test]
    fn test_encode_file_downscales() {
        let dir = temp_dir();
        let path = dir.join("wide.png");
        RgbaImage::from_pixel(400, 100, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let img = decode(&encode_image_file(&path, 200).unwrap());
        assert_eq!(img.dimensions(), (200, 50));

        let untouched = decode(&encode_image_file(&path, 2048).unwrap());
        assert_eq!(untouched.dimensions(), (400, 100));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_encode_missing_file() {
        let err = encode_image_file(Path::new("/nonexistent/image.png"), 100).unwrap_err();
        assert!(matches!(err, Hy3dError::Image(_)));
    }

    #[test]
    fn test_jpeg_flattens_transparency_on_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let decoded = decode(&encode_image_jpeg(&img, NODE_MAX_DIM, JPEG_QUALITY).unwrap()).to_rgb8();
        let px = decoded.get_pixel(4, 4);
        assert!(px.0.iter().all(|&c| c > 240), "{:?}", px);
    }

    #[test]
    fn test_jpeg_downscales() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 300));
        let decoded = decode(&encode_image_jpeg(&img, 30, JPEG_QUALITY).unwrap());
        assert_eq!(decoded.dimensions(), (10, 30));
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a/photo.PNG")));
        assert!(is_image_path(Path::new("shot.webp")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("noext")));
    }
}
