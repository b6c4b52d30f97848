//! Native PDF rasteriser backed by pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with global state; every call into it is
//! CPU-bound and synchronous. Rendering runs on the blocking pool so the
//! Tokio workers keep serving other jobs while a large document renders.
//!
//! `Pdfium` itself is neither `Send` nor `Sync`, so it never leaves the
//! blocking thread that created it. Only the resolved library location is
//! shared: it is found once per process and every render binds from it.

use crate::config::ConverterConfig;
use crate::engine::rasterizer::{PageCallback, PdfRasterizer, PdfRasterizerLoader};
use crate::error::{ConvertError, EngineLoadError};
use futures::future::{BoxFuture, FutureExt};
use image::DynamicImage;
use localconv_runtime as runtime;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Where pdfium was found; `None` means the system library.
static RESOLVED: OnceCell<Option<PathBuf>> = OnceCell::new();

/// Where the pdfium library comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LibrarySource {
    Path(PathBuf),
    System,
    Download,
}

/// Binds pdfium, downloading the platform library on first use if needed.
///
/// Resolution order: configured path, `PDFIUM_LIB_PATH`, the system
/// library, then the local runtime cache (downloading into it if empty).
#[derive(Debug, Clone)]
pub struct PdfiumLoader {
    path: Option<PathBuf>,
    timeout: Duration,
}

impl PdfiumLoader {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            path: config
                .pdfium_path
                .clone()
                .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from)),
            timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }

    fn initial_source(&self) -> LibrarySource {
        match &self.path {
            Some(p) => LibrarySource::Path(p.clone()),
            None => LibrarySource::System,
        }
    }

    /// Find a library that binds, remembering it for the rest of the process.
    async fn resolve(&self) -> Result<Option<PathBuf>, EngineLoadError> {
        if let Some(library) = RESOLVED.get() {
            return Ok(library.clone());
        }

        let mut source = self.initial_source();
        loop {
            let attempt = source.clone();
            let path = match &attempt {
                LibrarySource::Path(p) => Some(p.clone()),
                LibrarySource::System => None,
                LibrarySource::Download => {
                    let asset = runtime::pdfium_asset()?;
                    Some(runtime::ensure_installed(&asset, self.timeout, None).await?)
                }
            };

            let probe = path.clone();
            let bound = tokio::task::spawn_blocking(move || bind(probe.as_deref()).map(drop))
                .await
                .map_err(|e| EngineLoadError::Instantiate(format!("bind task panicked: {e}")))?;

            match (bound, attempt) {
                (Ok(()), _) => {
                    match &path {
                        Some(p) => info!("pdfium bound from {}", p.display()),
                        None => info!("pdfium bound from system library"),
                    }
                    return Ok(RESOLVED.get_or_init(|| path).clone());
                }
                (Err(e), LibrarySource::System) => {
                    debug!("No system pdfium ({}), using the runtime cache", e);
                    source = LibrarySource::Download;
                }
                (Err(e), _) => return Err(e),
            }
        }
    }
}

fn bind(library: Option<&Path>) -> Result<Pdfium, EngineLoadError> {
    match library {
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_system_library(),
    }
    .map(Pdfium::new)
    .map_err(|e| EngineLoadError::Instantiate(format!("pdfium bind failed: {e}")))
}

impl PdfRasterizerLoader for PdfiumLoader {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn PdfRasterizer>, EngineLoadError>> {
        let this = self.clone();
        async move {
            let library = this.resolve().await?;
            Ok(Arc::new(PdfiumRasterizer { library }) as Arc<dyn PdfRasterizer>)
        }
        .boxed()
    }
}

/// Renders PDF pages, binding pdfium on the blocking thread for each document.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf: Vec<u8>,
        scale: f32,
        on_page: PageCallback,
    ) -> BoxFuture<'_, Result<Vec<DynamicImage>, ConvertError>> {
        let library = self.library.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let pdfium = bind(library.as_deref()).map_err(|e| ConvertError::EngineLoad {
                    engine: "pdf",
                    detail: e.to_string(),
                })?;
                rasterize_blocking(&pdfium, pdf, scale, &on_page)
            })
                .await
                .map_err(|e| ConvertError::Internal(format!("Render task panicked: {e}")))?
        }
        .boxed()
    }
}

fn rasterize_blocking(
    pdfium: &Pdfium,
    pdf: Vec<u8>,
    scale: f32,
    on_page: &PageCallback,
) -> Result<Vec<DynamicImage>, ConvertError> {
    let document = pdfium
        .load_pdf_from_byte_vec(pdf, None)
        .map_err(|e| ConvertError::CorruptPdf(format!("{e:?}")))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);
    on_page(0, total);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let mut images = Vec::with_capacity(total);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
        let image = bitmap.as_image();
        debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
        images.push(image);
        on_page(idx + 1, total);
    }

    Ok(images)
}
