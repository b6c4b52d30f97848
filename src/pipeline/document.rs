//! Document router: picks one sub-pipeline per (source, target) pair.
//!
//! Precedence, first match wins:
//!
//! | Source | Target | Route |
//! |--------|--------|-------|
//! | pdf | `jpg-pages` | [`Route::PdfRaster`] |
//! | pdf | anything else | rejected: PDF only converts to JPG |
//! | docx, doc | `pdf` | [`Route::Paginate`] |
//! | any | page image | [`Route::Screenshot`] |
//! | typesetter reads and writes it | | [`Route::Typeset`] |
//! | otherwise | | rejected: unsupported route |
//!
//! Rendering routes come before the typesetter because they need an
//! off-screen render host the typesetter cannot replace.

use crate::config::ConverterConfig;
use crate::engine::{LazyEngine, PdfRasterizer, PdfRasterizerLoader, RenderHost, TypesetterLoader};
use crate::error::{ConvertError, EngineLoadError};
use crate::format::FormatToken;
use crate::job::{ConversionResult, InputFile};
use crate::pipeline::typeset::{can_typeset, TypesetEngine};
use crate::pipeline::{paginate, pdf_raster, screenshot};
use crate::progress::Progress;
use std::sync::Arc;
use tracing::debug;

/// Source extensions the router accepts.
pub const SUPPORTED_SOURCES: [&str; 8] = ["pdf", "docx", "doc", "txt", "html", "htm", "md", "markdown"];

/// What kind of document a source extension names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    /// Zip-structured rich document (DOCX).
    Container,
    /// Plain text, HTML or Markdown.
    Text,
}

impl SourceKind {
    /// Classify an extension against the allow-list.
    pub fn from_extension(ext: &str) -> Result<Self, ConvertError> {
        match ext {
            "pdf" => Ok(SourceKind::Pdf),
            "docx" | "doc" => Ok(SourceKind::Container),
            "txt" | "html" | "htm" | "md" | "markdown" => Ok(SourceKind::Text),
            _ => Err(ConvertError::UnsupportedSource { ext: ext.to_string() }),
        }
    }
}

/// The sub-pipeline chosen for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PdfRaster,
    Paginate,
    Screenshot,
    Typeset,
}

/// Select the route for `ext` → `target`.
pub fn select_route(ext: &str, target: FormatToken) -> Result<Route, ConvertError> {
    let kind = SourceKind::from_extension(ext)?;
    match (kind, target) {
        (SourceKind::Pdf, FormatToken::JpgPages) => Ok(Route::PdfRaster),
        (SourceKind::Pdf, requested) => Err(ConvertError::PdfTargetRestricted { requested }),
        (SourceKind::Container, FormatToken::Pdf) => Ok(Route::Paginate),
        (_, FormatToken::JpgPages | FormatToken::PngPages | FormatToken::WebpPages) => Ok(Route::Screenshot),
        (_, target) if can_typeset(ext, target) => Ok(Route::Typeset),
        (_, target) => Err(ConvertError::unsupported_route(ext, target)),
    }
}

/// Routes document conversions and owns the engines they need.
pub struct DocumentEngine {
    config: ConverterConfig,
    typeset: TypesetEngine,
    render_host: Option<Arc<dyn RenderHost>>,
    rasterizer_loader: Arc<dyn PdfRasterizerLoader>,
    rasterizer: LazyEngine<dyn PdfRasterizer>,
}

impl DocumentEngine {
    pub fn new(
        config: ConverterConfig,
        typesetter_loader: Arc<dyn TypesetterLoader>,
        rasterizer_loader: Arc<dyn PdfRasterizerLoader>,
        render_host: Option<Arc<dyn RenderHost>>,
    ) -> Self {
        Self {
            config,
            typeset: TypesetEngine::new(typesetter_loader),
            render_host,
            rasterizer_loader,
            rasterizer: LazyEngine::new("pdf"),
        }
    }

    pub fn typeset(&self) -> &TypesetEngine {
        &self.typeset
    }

    pub fn has_render_host(&self) -> bool {
        self.render_host.is_some()
    }

    pub fn is_rasterizer_loaded(&self) -> bool {
        self.rasterizer.is_ready()
    }

    /// Convert a document, rejecting unsupported pairs before any engine work.
    pub async fn convert(
        &self,
        file: &InputFile,
        target: FormatToken,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        let ext = file.extension();
        let route = select_route(&ext, target)?;
        debug!("Routing {} → {} via {:?}", ext, target, route);
        progress.report(5.0);

        match route {
            Route::PdfRaster => {
                let rasterizer = self.load_rasterizer().await?;
                pdf_raster::pdf_to_jpg(rasterizer, &self.config, file, progress).await
            }
            Route::Paginate => {
                let host = self.host("docx-to-pdf")?;
                paginate::docx_to_pdf(host, &self.config, file, progress).await
            }
            Route::Screenshot => {
                let host = self.host("document-to-image")?;
                screenshot::doc_to_image(host, &self.typeset, &self.config, file, target, progress).await
            }
            Route::Typeset => self.typeset.convert(file, target, progress).await,
        }
    }

    fn host(&self, route: &'static str) -> Result<&Arc<dyn RenderHost>, ConvertError> {
        self.render_host
            .as_ref()
            .ok_or(ConvertError::RendererUnavailable { route })
    }

    async fn load_rasterizer(&self) -> Result<Arc<dyn PdfRasterizer>, ConvertError> {
        let loader = Arc::clone(&self.rasterizer_loader);
        self.rasterizer
            .get_or_load(move || loader.load())
            .await
            .map_err(|e: EngineLoadError| ConvertError::EngineLoad {
                engine: "pdf",
                detail: e.to_string(),
            })
    }
}
