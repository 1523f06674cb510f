//! Image encoding: `RgbImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision model APIs (Gemini, OpenAI, Anthropic) accept images as base64
//! data embedded in the JSON request body. PNG is chosen over JPEG because
//! it is lossless — the crispness of contract fine print matters far more
//! than file size for extraction accuracy. `detail: "high"` instructs
//! GPT-4-class models to use the full image tile budget; without it small
//! schedule tables are lost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised contract page as a base64 PNG ready for the model API.
pub fn encode_page(img: &RgbImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_small_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        assert!(!data.data.is_empty());
        // Verify it's valid base64 holding a PNG header
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..4], b"\x89PNG");
    }
}
