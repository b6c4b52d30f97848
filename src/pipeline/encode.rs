//! Raster encoding shared by every pipeline that produces an image.
//!
//! JPEG has no alpha channel, so transparent pixels are composited onto
//! white first (the colour a browser canvas export would produce). WebP is
//! written lossless: the `image` crate's encoder has no lossy mode.

use crate::error::ConvertError;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use tracing::debug;

/// Output raster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    Webp,
    Bmp,
}

impl RasterFormat {
    pub fn mime(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Webp => "image/webp",
            RasterFormat::Bmp => "image/bmp",
        }
    }

    /// File extension of the encoded output (`jpeg` is written as `jpg`).
    pub fn ext(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Webp => "webp",
            RasterFormat::Bmp => "bmp",
        }
    }
}

/// Encode `image` as `format`; `quality` (1–100) applies to JPEG only.
pub fn encode_rgba(image: &RgbaImage, format: RasterFormat, quality: u8) -> Result<Vec<u8>, ConvertError> {
    let (w, h) = image.dimensions();
    let mut buf = Vec::new();

    let written = match format {
        RasterFormat::Png => {
            PngEncoder::new(&mut buf).write_image(image.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
        RasterFormat::Webp => {
            WebPEncoder::new_lossless(&mut buf).write_image(image.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
        RasterFormat::Bmp => {
            BmpEncoder::new(&mut buf).write_image(image.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
        RasterFormat::Jpeg => {
            let flat = flatten_onto_white(image);
            JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
                .write_image(flat.as_raw(), w, h, ExtendedColorType::Rgb8)
        }
    };

    written.map_err(|e| ConvertError::EncodeFailed {
        format: format.ext().to_string(),
        detail: e.to_string(),
    })?;

    if buf.is_empty() {
        return Err(ConvertError::EncodeFailed {
            format: format.ext().to_string(),
            detail: "encoder produced no data".into(),
        });
    }

    debug!("Encoded {}x{} → {} bytes {}", w, h, buf.len(), format.ext());
    Ok(buf)
}

/// Composite RGBA pixels over an opaque white background.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
