//! Image utility functions

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::DynamicImage;

/// Encode image to PNG bytes
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Encode image as base64 PNG, the form images are stored in
pub fn encode_base64_png(image: &DynamicImage) -> Result<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_png_decodes_back() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(3, 2, image::Rgb([9, 8, 7])));
        let encoded = encode_base64_png(&image).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8(), image.to_rgb8());
    }
}
