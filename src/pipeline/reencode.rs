//! Image engine: decode a raster image and re-encode it to another format.
//!
//! Progress has no mid-encode granularity, so it is reported at four fixed
//! checkpoints: 10 (start), 40 (decoded), 70 (drawn), 100 (encoded).

use crate::error::ConvertError;
use crate::format::FormatToken;
use crate::job::{ConversionResult, InputFile};
use crate::pipeline::encode::{encode_rgba, RasterFormat};
use crate::progress::Progress;
use tracing::{debug, info};

/// Raster format for an image-category target token.
pub fn raster_target(target: FormatToken) -> Result<RasterFormat, ConvertError> {
    match target {
        FormatToken::Png => Ok(RasterFormat::Png),
        FormatToken::Jpeg => Ok(RasterFormat::Jpeg),
        FormatToken::Webp => Ok(RasterFormat::Webp),
        FormatToken::Bmp => Ok(RasterFormat::Bmp),
        other => Err(ConvertError::UnsupportedTarget {
            engine: "image",
            target: other.to_string(),
        }),
    }
}

/// Re-encode `file` as `target` at `quality` (lossy formats only).
pub async fn convert_image(
    file: &InputFile,
    target: FormatToken,
    quality: u8,
    progress: &Progress,
) -> Result<ConversionResult, ConvertError> {
    let format = raster_target(target)?;
    progress.report(10.0);

    let decoded = decode(file).await?;
    progress.report(40.0);

    let surface = decoded.into_rgba8();
    if surface.width() == 0 || surface.height() == 0 {
        return Err(ConvertError::ContextUnavailable(format!(
            "cannot allocate a {}x{} surface",
            surface.width(),
            surface.height()
        )));
    }
    debug!("Image surface {}x{}", surface.width(), surface.height());
    progress.report(70.0);

    let encoded = tokio::task::spawn_blocking(move || encode_rgba(&surface, format, quality))
        .await
        .map_err(|e| ConvertError::Internal(format!("Encode task panicked: {e}")))??;
    progress.done();

    info!("Re-encoded {} → {} ({} bytes)", file.name, format.ext(), encoded.len());
    Ok(ConversionResult::new(encoded, format.mime(), format.ext()))
}

async fn decode(file: &InputFile) -> Result<image::DynamicImage, ConvertError> {
    let bytes = file.bytes.clone();
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).map_err(|e| ConvertError::ImageLoad(e.to_string()))
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Decode task panicked: {e}")))?
}
