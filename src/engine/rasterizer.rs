//! PDF rasteriser seam.

use crate::error::{ConvertError, EngineLoadError};
use futures::future::BoxFuture;
use image::DynamicImage;
use std::sync::Arc;

/// Called as `(pages_rendered, total_pages)`; `(0, total)` once the document
/// has been parsed.
pub type PageCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Renders every page of a PDF to a bitmap.
pub trait PdfRasterizer: Send + Sync {
    /// Render all pages at `scale` (1.0 = 72 DPI), in page order.
    fn rasterize(
        &self,
        pdf: Vec<u8>,
        scale: f32,
        on_page: PageCallback,
    ) -> BoxFuture<'_, Result<Vec<DynamicImage>, ConvertError>>;
}

/// Produces a [`PdfRasterizer`].
pub trait PdfRasterizerLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn PdfRasterizer>, EngineLoadError>>;
}
