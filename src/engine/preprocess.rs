//! Image preprocessing for classification and detection models

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array3;

use super::decoder::BoundingBox;
use super::registry::Normalization;
use crate::error::{PipelineError, Result};

/// Number of colour channels fed to every model (R, G, B)
pub const CHANNELS: usize = 3;

fn is_base64_alphabet(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/'
}

/// Check that a string is well-formed standard base64
pub fn validate(encoded: &str) -> bool {
    let encoded = encoded.trim();
    if encoded.is_empty() || encoded.len() % 4 != 0 {
        return false;
    }

    let body = encoded.trim_end_matches('=');
    if encoded.len() - body.len() > 2 || !body.chars().all(is_base64_alphabet) {
        return false;
    }

    STANDARD.decode(encoded).is_ok()
}

/// Decode a base64 image payload into raw bytes
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    if encoded.trim().is_empty() {
        return Err(PipelineError::InputValidation("Image data is empty".to_string()));
    }
    if !validate(encoded) {
        return Err(PipelineError::InputValidation("Invalid image data".to_string()));
    }
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| PipelineError::InputValidation(format!("Invalid image data: {}", e)))
}

/// Decode image from bytes with EXIF orientation handling
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data)
        .map_err(|e| PipelineError::InputValidation(format!("Unreadable image: {}", e)))?;

    Ok(apply_exif_orientation(data, image))
}

/// Apply EXIF orientation to correct image rotation
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // See the EXIF Orientation tag: 1 is upright, 2-8 are flips and rotations
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Resize an image to exactly `target_width` x `target_height` and convert
/// it to a channel-first tensor indexed `[channel, x, y]`.
pub fn image_to_tensor(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    normalization: Normalization,
) -> Result<Array3<f32>> {
    if target_width == 0 || target_height == 0 {
        return Err(PipelineError::Dimension {
            width: target_width,
            height: target_height,
        });
    }

    let resized = image
        .resize_exact(target_width, target_height, FilterType::CatmullRom)
        .to_rgb8();

    let scale = match normalization {
        Normalization::Raw => 1.0,
        Normalization::Unit => 1.0 / 255.0,
    };

    let mut tensor = Array3::<f32>::zeros((CHANNELS, target_width as usize, target_height as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..CHANNELS {
            tensor[[c, x as usize, y as usize]] = pixel[c] as f32 * scale;
        }
    }

    Ok(tensor)
}

/// Validate, decode and convert a base64 image for a model input
pub fn preprocess(
    encoded: &str,
    target_width: u32,
    target_height: u32,
    normalization: Normalization,
) -> Result<Array3<f32>> {
    let image = decode_image(&decode_base64(encoded)?)?;
    image_to_tensor(&image, target_width, target_height, normalization)
}

/// Pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamp a box to `[0, image_width) x [0, image_height)`.
///
/// The result is never empty: a box lying entirely outside the image
/// collapses onto the nearest edge pixel.
pub fn clamp_region(bbox: &BoundingBox, image_width: u32, image_height: u32) -> Region {
    let (x, width) = clamp_span(bbox.x_min, bbox.x_max, image_width);
    let (y, height) = clamp_span(bbox.y_min, bbox.y_max, image_height);
    Region { x, y, width, height }
}

fn clamp_span(a: f32, b: f32, limit: u32) -> (u32, u32) {
    let limit = limit.max(1);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

    // f32::max / min discard NaN, so a NaN edge falls back to the bound
    let start = lo.floor().max(0.0).min((limit - 1) as f32) as u32;
    let end = hi.ceil().max((start + 1) as f32).min(limit as f32) as u32;
    (start, end - start)
}

/// Crop the image to the clamped box
pub fn crop_to_box(image: &DynamicImage, bbox: &BoundingBox) -> (DynamicImage, Region) {
    let (img_w, img_h) = image.dimensions();
    let region = clamp_region(bbox, img_w, img_h);
    let cropped = image.crop_imm(region.x, region.y, region.width, region.height);
    (cropped, region)
}

#[cfg(test)]
pub(crate) fn encode_test_image(width: u32, height: u32, rgb: [u8; 3]) -> String {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb(rgb)));
    let bytes = crate::utils::image::encode_png(&image).unwrap();
    STANDARD.encode(bytes)
}
