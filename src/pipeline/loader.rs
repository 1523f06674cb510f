//! Document loading: uploaded bytes → per-page text or a rasterised bitmap.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling while a contract is parsed or rendered. Image
//! decoding is CPU-bound too and takes the same route.
//!
//! ## Media-type gate
//!
//! The declared content type is validated before any bytes are parsed: a
//! `text/plain` upload is rejected without ever touching pdfium, and without
//! the model client being invoked further down the pipeline.

use crate::config::{ExtractionConfig, ExtractionMode};
use crate::error::ExtractError;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::fmt;
use tracing::{debug, info};

/// Content extracted from one uploaded document.
///
/// One capability, two variants: text mode feeds a plain language model,
/// raster mode feeds a vision model. Produced by [`load`], consumed once by
/// the prompt builder, then discarded with the request.
#[derive(Clone)]
pub enum ExtractedContent {
    /// Per-page extracted text, in page order.
    PageTexts(Vec<String>),
    /// A single page rendered to an RGB bitmap.
    PageImage(RgbImage),
}

impl fmt::Debug for ExtractedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractedContent::PageTexts(pages) => {
                write!(f, "PageTexts({} pages)", pages.len())
            }
            ExtractedContent::PageImage(img) => {
                write!(f, "PageImage({}x{} px)", img.width(), img.height())
            }
        }
    }
}

enum MediaKind {
    Pdf,
    Image,
}

/// Validate the declared media type, ignoring parameters and case.
///
/// `image/png; charset=binary` and `IMAGE/PNG` are both acceptable.
fn classify_media_type(declared: &str) -> Result<MediaKind, ExtractError> {
    let essence = declared.split(';').next().unwrap_or("").trim();
    let image_prefixed = essence
        .get(..6)
        .is_some_and(|p| p.eq_ignore_ascii_case("image/"));
    if essence.eq_ignore_ascii_case("application/pdf") {
        Ok(MediaKind::Pdf)
    } else if image_prefixed && essence.len() > 6 {
        Ok(MediaKind::Image)
    } else {
        Err(ExtractError::UnsupportedMediaType {
            declared: declared.to_string(),
        })
    }
}

/// Load an uploaded document into [`ExtractedContent`].
///
/// PDF handling follows `config.mode`: text extraction across all pages, or
/// rasterisation of `config.raster_page`. Direct image uploads are decoded
/// and normalised to RGB regardless of mode.
///
/// # Errors
/// - [`ExtractError::UnsupportedMediaType`] before any parsing
/// - [`ExtractError::CorruptDocument`] when bytes do not match the type
/// - [`ExtractError::PageOutOfRange`] when the configured raster page does
///   not exist
pub async fn load(
    bytes: Vec<u8>,
    declared_media_type: &str,
    config: &ExtractionConfig,
) -> Result<ExtractedContent, ExtractError> {
    match classify_media_type(declared_media_type)? {
        MediaKind::Pdf => {
            let mode = config.mode;
            let raster_page = config.raster_page;
            let max_pixels = config.max_rendered_pixels;
            tokio::task::spawn_blocking(move || {
                load_pdf_blocking(&bytes, mode, raster_page, max_pixels)
            })
            .await
            .map_err(|e| ExtractError::Internal(format!("Loader task panicked: {e}")))?
        }
        MediaKind::Image => {
            tokio::task::spawn_blocking(move || decode_image_blocking(&bytes))
                .await
                .map_err(|e| ExtractError::Internal(format!("Loader task panicked: {e}")))?
        }
    }
}

/// Blocking implementation of PDF loading.
fn load_pdf_blocking(
    bytes: &[u8],
    mode: ExtractionMode,
    raster_page: usize,
    max_pixels: u32,
) -> Result<ExtractedContent, ExtractError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ExtractError::CorruptDocument {
                detail: format!("not a readable PDF: {e:?}"),
            })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);

    match mode {
        ExtractionMode::Text => {
            let mut texts = Vec::with_capacity(total);
            for page in pages.iter() {
                let text = page
                    .text()
                    .map_err(|e| ExtractError::CorruptDocument {
                        detail: format!("text extraction failed: {e:?}"),
                    })?
                    .all();
                texts.push(text);
            }
            debug!(
                "extracted {} chars of text across {} pages",
                texts.iter().map(String::len).sum::<usize>(),
                total
            );
            Ok(ExtractedContent::PageTexts(texts))
        }
        ExtractionMode::Raster => {
            if raster_page == 0 || raster_page > total {
                return Err(ExtractError::PageOutOfRange {
                    page: raster_page,
                    total,
                });
            }

            let page = pages.get((raster_page - 1) as u16).map_err(|e| {
                ExtractError::CorruptDocument {
                    detail: format!("failed to open page {raster_page}: {e:?}"),
                }
            })?;

            let render_config = PdfRenderConfig::new()
                .set_target_width(max_pixels as i32)
                .set_maximum_height(max_pixels as i32);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::CorruptDocument {
                    detail: format!("rasterisation failed for page {raster_page}: {e:?}"),
                }
            })?;

            let image = bitmap.as_image().to_rgb8();
            debug!(
                "rendered page {} → {}x{} px",
                raster_page,
                image.width(),
                image.height()
            );
            Ok(ExtractedContent::PageImage(image))
        }
    }
}

/// Blocking implementation of direct image decoding.
///
/// Any source color mode (RGBA, grayscale, palette) is normalised to RGB.
fn decode_image_blocking(bytes: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ExtractError::CorruptDocument {
        detail: format!("image decode failed: {e}"),
    })?;
    Ok(ExtractedContent::PageImage(decoded.to_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        // RGBA on purpose: exercises the normalise-to-RGB path.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([12, 34, 56, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn rejects_unsupported_media_type_before_parsing() {
        let config = ExtractionConfig::default();
        let err = load(b"hello".to_vec(), "text/plain", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn media_type_parameters_and_case_are_ignored() {
        let config = ExtractionConfig::default();
        let content = load(png_bytes(), "IMAGE/PNG; charset=binary", &config)
            .await
            .unwrap();
        assert!(matches!(content, ExtractedContent::PageImage(_)));
    }

    #[tokio::test]
    async fn image_upload_is_decoded_to_rgb() {
        let config = ExtractionConfig::default();
        let content = load(png_bytes(), "image/png", &config).await.unwrap();
        match content {
            ExtractedContent::PageImage(img) => {
                assert_eq!(img.dimensions(), (8, 8));
                assert_eq!(img.get_pixel(0, 0).0, [12, 34, 56]);
            }
            other => panic!("expected PageImage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_image_bytes_are_a_corrupt_document() {
        let config = ExtractionConfig::default();
        let err = load(vec![0u8; 64], "image/png", &config).await.unwrap_err();
        assert!(matches!(err, ExtractError::CorruptDocument { .. }));
    }

    #[test]
    fn bare_image_prefix_is_not_acceptable() {
        assert!(classify_media_type("image/").is_err());
        assert!(classify_media_type("image").is_err());
    }
}
