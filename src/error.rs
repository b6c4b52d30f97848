//! Error types for the localconv library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal** for one job: the conversion cannot produce
//!   an artifact (unsupported route, engine load failure, corrupt input).
//!   Returned as `Err(ConvertError)` from every `convert_*` entry point.
//!
//! * [`EngineLoadError`] — the failure of a shared engine load. It is
//!   `Clone` because every caller awaiting the same in-flight load receives
//!   the same value; each engine classifies it into a [`ConvertError`].
//!
//! * [`JobStateError`] — an illegal status transition on a
//!   [`crate::job::ConversionJob`] (e.g. `done` → `processing`).

use crate::format::FormatToken;
use crate::job::JobStatus;
use thiserror::Error;

/// All fatal per-job errors returned by the localconv library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The input extension is not on the document source allow-list.
    #[error("Unsupported source format: .{ext}")]
    UnsupportedSource { ext: String },

    /// The category string is not one of `image`, `document`, `media`.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Neither a dedicated pipeline nor the typesetter handles this pair.
    #[error("Conversion from {from} to {to} is not supported")]
    UnsupportedRoute { from: String, to: String },

    /// The target token is not valid for the selected engine.
    #[error("Unsupported target format for {engine}: {target}")]
    UnsupportedTarget { engine: &'static str, target: String },

    // ── Capability ceilings ───────────────────────────────────────────────
    /// PDF sources only convert to page images.
    #[error("PDF currently only convertible to JPG (requested {requested})")]
    PdfTargetRestricted { requested: FormatToken },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The input bytes could not be decoded as an image.
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// No raster surface could be allocated for drawing.
    #[error("Drawing context unavailable: {0}")]
    ContextUnavailable(String),

    /// Encoding to the target format produced no output.
    #[error("Failed to convert to {format}: {detail}")]
    EncodeFailed { format: String, detail: String },

    // ── Engine load errors ────────────────────────────────────────────────
    /// The multi-threaded transcoder core could not start because the host
    /// lacks shared-memory support.
    #[error(
        "Media conversion requires cross-origin isolation (shared memory).\n\
Enable COOP/COEP headers, or force the single-threaded core with \
--transcoder-shared-memory=false.\nCause: {0}"
    )]
    CrossOriginIsolationRequired(String),

    /// Any other engine fetch/instantiate failure.
    #[error("Failed to load {engine} engine: {detail}")]
    EngineLoad { engine: &'static str, detail: String },

    // ── Engine execution errors ───────────────────────────────────────────
    /// The transcoder exited with a non-zero status.
    #[error("Conversion failed (exit code {code}). The format combination may not be supported.")]
    TranscodeFailed { code: i32 },

    /// The typesetter produced neither a file nor standard output.
    #[error("Typesetting engine produced no output")]
    TypesetterNoOutput,

    /// The typesetter reported an error channel with no output.
    #[error("Typesetting engine failed: {0}")]
    TypesetterFailed(String),

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Screenshot and paginated routes need an off-screen render host.
    #[error("No render host is available for {route}; document-to-image and DOCX-to-PDF need one")]
    RendererUnavailable { route: &'static str },

    /// The render host failed to mount or capture.
    #[error("Render failed: {0}")]
    Render(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {0}")]
    CorruptPdf(String),

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Building the paginated output document failed.
    #[error("PDF assembly failed: {0}")]
    PdfAssembly(String),

    // ── I/O and config ────────────────────────────────────────────────────
    /// Filesystem error while staging engine input/output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// `true` for failures detected before any engine work starts.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConvertError::UnsupportedSource { .. }
                | ConvertError::UnknownCategory(_)
                | ConvertError::UnsupportedRoute { .. }
                | ConvertError::UnsupportedTarget { .. }
                | ConvertError::PdfTargetRestricted { .. }
        )
    }

    pub(crate) fn unsupported_route(from: impl ToString, to: FormatToken) -> Self {
        ConvertError::UnsupportedRoute {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Failure of a shared engine load.
///
/// Cloned to every waiter of the same in-flight load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineLoadError {
    /// The requested runtime variant needs shared memory the host lacks.
    #[error("shared memory unavailable: {0}")]
    SharedMemoryUnavailable(String),

    /// The runtime asset could not be fetched or unpacked.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The runtime was present but could not be started.
    #[error("instantiate failed: {0}")]
    Instantiate(String),
}

impl From<localconv_runtime::RuntimeError> for EngineLoadError {
    fn from(e: localconv_runtime::RuntimeError) -> Self {
        EngineLoadError::Fetch(e.to_string())
    }
}

/// An illegal job status transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Illegal job transition for {id}: {from} → {to}")]
pub struct JobStateError {
    pub id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

impl From<ParseCategoryError> for ConvertError {
    fn from(e: ParseCategoryError) -> Self {
        ConvertError::UnknownCategory(e.0)
    }
}

/// Returned when a string is not a known [`crate::format::Category`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown category '{0}' (expected image, document or media)")]
pub struct ParseCategoryError(pub String);

/// Returned when a string is not a known [`FormatToken`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown format token '{0}'")]
pub struct ParseFormatError(pub String);
