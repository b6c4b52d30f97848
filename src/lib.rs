//! # localconv
//!
//! Local, privacy-preserving file conversion: images, documents and media
//! are converted on the machine that holds them, never uploaded.
//!
//! ## Why this crate?
//!
//! A converter that covers DOCX, HTML, Markdown, PDF, raster images, audio
//! and video needs several unrelated engines: a raster codec, a universal
//! document typesetter, a PDF renderer, a media transcoder and an
//! off-screen layout engine. Each is heavy, loads lazily and supports only
//! part of the format matrix. This crate turns them into one contract:
//! a job goes in, bytes plus a definitive extension come out, with
//! composed progress along the way and a classified error when a pair is
//! not supported.
//!
//! ## Routing Overview
//!
//! ```text
//! ConversionJob
//!  │
//!  ├─ image     re-encode (PNG / JPEG / WebP / BMP)
//!  ├─ media     transcoder with per-target codec arguments
//!  └─ document  router
//!       ├─ pdf  → jpg-pages        rasterise + stack pages
//!       ├─ docx → pdf              paginate off-screen + assemble A4 PDF
//!       ├─ any  → *-pages          typeset to HTML + screenshot
//!       └─ typesetter pairs        docx / html / txt / md / odt / epub / rtf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use localconv::{Category, Converter, ConverterConfig, FormatToken, InputFile, Progress};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConverterConfig::default());
//!     let file = InputFile::from_path("report.docx").await?;
//!     let result = converter
//!         .convert_file(&file, FormatToken::Md, Category::Document, &Progress::noop())
//!         .await?;
//!     std::fs::write(format!("report.{}", result.ext), &result.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Engines
//!
//! | Engine | Native implementation | Loaded |
//! |--------|-----------------------|--------|
//! | Typesetter | pandoc (found on `PATH` or downloaded) | first document conversion |
//! | Transcoder | ffmpeg (configured path, variant URL or `PATH`) | first media conversion |
//! | PDF rasteriser | pdfium (bound once per process) | first PDF conversion |
//! | Render host | none; supplied through [`ConverterBuilder::with_render_host`] | |
//!
//! Without a render host the document-to-image and DOCX-to-PDF routes fail
//! with [`ConvertError::RendererUnavailable`]; every other route still works.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `localconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! localconv = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod format;
pub mod job;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::{get_accepted_mimes, Converter, ConverterBuilder};
pub use error::{ConvertError, EngineLoadError, JobStateError};
pub use format::{
    detect_category, detect_format, formats_for_category, generate_id, human_file_size, Category,
    FormatOption, FormatToken,
};
pub use job::{ConversionJob, ConversionResult, InputFile, JobStatus};
pub use progress::{BatchProgressCallback, NoopBatchCallback, Progress, ProgressSink};
