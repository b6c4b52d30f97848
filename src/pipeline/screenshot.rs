//! Document → page image: lay HTML out off-screen and capture it.
//!
//! ```text
//! source ──▶ HTML (typesetter, images as data URIs) ──▶ <body> only
//!        ──▶ styled off-screen surface ──▶ 2× capture ──▶ encode
//! ```
//!
//! Progress: 5 start, ≤50 HTML acquired, 55 mounted, 65 images settled,
//! 90 captured, 100 encoded.

use crate::config::ConverterConfig;
use crate::engine::{CaptureOptions, CaptureTarget, MountedSurface, RenderHost, SurfaceSpec};
use crate::error::ConvertError;
use crate::format::FormatToken;
use crate::job::{ConversionResult, InputFile};
use crate::pipeline::css::{DOCUMENT_SCOPED_CSS, RENDER_CLASS};
use crate::pipeline::encode::{encode_rgba, RasterFormat};
use crate::pipeline::typeset::TypesetEngine;
use crate::progress::Progress;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

static BODY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("valid regex"));

/// Raster format for a page-image target.
pub fn page_image_format(target: FormatToken) -> Option<RasterFormat> {
    match target {
        FormatToken::JpgPages => Some(RasterFormat::Jpeg),
        FormatToken::PngPages => Some(RasterFormat::Png),
        FormatToken::WebpPages => Some(RasterFormat::Webp),
        _ => None,
    }
}

/// Content of `<body>` when `html` is a full document; otherwise `html` itself.
pub fn extract_body(html: &str) -> &str {
    BODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

/// Markup mounted on the surface: scoped stylesheet plus the body content.
pub fn render_markup(html: &str) -> String {
    format!(
        "<style>{DOCUMENT_SCOPED_CSS}</style><div class=\"{RENDER_CLASS}\">{}</div>",
        extract_body(html)
    )
}

/// Screenshot `file` as a single page image.
pub async fn doc_to_image(
    host: &Arc<dyn RenderHost>,
    typeset: &TypesetEngine,
    config: &ConverterConfig,
    file: &InputFile,
    target: FormatToken,
    progress: &Progress,
) -> Result<ConversionResult, ConvertError> {
    let format = page_image_format(target).ok_or_else(|| ConvertError::UnsupportedTarget {
        engine: "document",
        target: target.to_string(),
    })?;
    progress.report(5.0);

    let ext = file.extension();
    let html = if ext == "html" || ext == "htm" {
        let html = String::from_utf8_lossy(&file.bytes).into_owned();
        progress.report(50.0);
        html
    } else {
        typeset.html_with_media(file, &progress.stage(5.0, 50.0)).await?
    };
    progress.report(55.0);

    let surface = MountedSurface::html(host, render_markup(&html), SurfaceSpec::document(config.page_width_px)).await?;
    surface
        .wait_for_images(Duration::from_millis(config.screenshot_image_timeout_ms))
        .await;
    tokio::time::sleep(Duration::from_millis(config.screenshot_settle_ms)).await;
    progress.report(65.0);

    let capture = surface
        .capture(CaptureTarget::Whole, CaptureOptions::at_scale(config.capture_scale))
        .await?;
    drop(surface);
    debug!("Captured {}x{} px", capture.width(), capture.height());
    progress.report(90.0);

    let quality = config.lossy_quality;
    let bytes = tokio::task::spawn_blocking(move || encode_rgba(&capture, format, quality))
        .await
        .map_err(|e| ConvertError::Internal(format!("Encode task panicked: {e}")))??;
    progress.done();

    info!("Rendered {} → {} ({} bytes)", file.name, format.ext(), bytes.len());
    Ok(ConversionResult::new(bytes, format.mime(), format.ext()))
}
