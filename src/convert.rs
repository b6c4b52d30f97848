//! Conversion entry points.
//!
//! [`Converter`] owns the three category engines and their lazily-loaded
//! runtimes. It is cheap to clone: clones share the same engines, so a
//! runtime loaded by one conversion is reused by every later one.
//!
//! ```rust,no_run
//! use localconv::{Converter, ConversionJob, FormatToken, InputFile, Progress};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::new(Default::default());
//! let file = InputFile::from_path("notes.md").await?;
//! let job = ConversionJob::detect(file, FormatToken::Html);
//! let result = converter
//!     .run_conversion(&job, &Progress::from_fn(|p| eprintln!("{p}%")))
//!     .await?;
//! std::fs::write(format!("notes.{}", result.ext), &result.bytes)?;
//! # Ok(())
//! # }
//! ```

use crate::config::ConverterConfig;
use crate::engine::ffmpeg::FfmpegLoader;
use crate::engine::pandoc::PandocLoader;
use crate::engine::pdfium::PdfiumLoader;
use crate::engine::{PdfRasterizerLoader, RenderHost, TranscoderLoader, TypesetterLoader};
use crate::error::ConvertError;
use crate::format::{self, Category, FormatToken};
use crate::job::{ConversionJob, ConversionResult, InputFile};
use crate::pipeline::document::DocumentEngine;
use crate::pipeline::media::MediaEngine;
use crate::pipeline::reencode;
use crate::progress::{BatchProgressCallback, Progress};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

struct Inner {
    config: ConverterConfig,
    document: DocumentEngine,
    media: MediaEngine,
}

/// The single conversion entry point.
#[derive(Clone)]
pub struct Converter {
    inner: Arc<Inner>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.inner.config)
            .field("render_host", &self.inner.document.has_render_host())
            .field("typesetter_loaded", &self.inner.document.typeset().is_loaded())
            .field("transcoder_loaded", &self.inner.media.is_loaded())
            .field("rasterizer_loaded", &self.inner.document.is_rasterizer_loaded())
            .finish()
    }
}

impl Converter {
    /// Converter with the native engines and no render host.
    pub fn new(config: ConverterConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.inner.config
    }

    pub fn is_typesetter_loaded(&self) -> bool {
        self.inner.document.typeset().is_loaded()
    }

    pub fn is_transcoder_loaded(&self) -> bool {
        self.inner.media.is_loaded()
    }

    pub fn is_rasterizer_loaded(&self) -> bool {
        self.inner.document.is_rasterizer_loaded()
    }

    /// Run one job, dispatching on its category.
    ///
    /// The job itself is not mutated; see [`Converter::run_batch`] for the
    /// status-tracking loop.
    pub async fn run_conversion(
        &self,
        job: &ConversionJob,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        self.convert_file(&job.file, job.target, job.category, progress).await
    }

    /// Convert `file` to `target` with the engine for `category`.
    pub async fn convert_file(
        &self,
        file: &InputFile,
        target: FormatToken,
        category: Category,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        info!("Converting {} ({}) → {}", file.name, category, target);
        match category {
            Category::Image => {
                reencode::convert_image(file, target, self.inner.config.lossy_quality, progress).await
            }
            Category::Document => self.inner.document.convert(file, target, progress).await,
            Category::Media => self.inner.media.convert(file, target, progress).await,
        }
    }

    /// Read a file from disk, detect its category and convert it.
    pub async fn convert_path(
        &self,
        path: impl AsRef<Path>,
        target: FormatToken,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        let file = InputFile::from_path(path).await?;
        let category = format::detect_category(&file.name, &file.mime);
        self.convert_file(&file, target, category, progress).await
    }

    /// Convert an HTML string through the typesetting engine.
    pub async fn typeset_html(
        &self,
        html: &str,
        target: FormatToken,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        self.inner.document.typeset().convert_html(html, target, progress).await
    }

    /// Run `jobs` one at a time, recording each outcome on its job.
    ///
    /// A failing job is marked `error` and the batch moves on. Jobs that are
    /// not `pending` are skipped. Returns the number of jobs that finished.
    pub async fn run_batch(&self, jobs: &mut [ConversionJob], callback: Arc<dyn BatchProgressCallback>) -> usize {
        let total = jobs.len();
        callback.on_batch_start(total);
        let mut succeeded = 0;

        for (index, job) in jobs.iter_mut().enumerate() {
            if let Err(e) = job.start() {
                warn!("Skipping job: {}", e);
                continue;
            }
            callback.on_job_start(index, &job.id);

            let latest = Arc::new(AtomicU8::new(0));
            let progress = {
                let latest = Arc::clone(&latest);
                let callback = Arc::clone(&callback);
                Progress::from_fn(move |p| {
                    latest.store(p, Ordering::Relaxed);
                    callback.on_job_progress(index, p);
                })
            };

            let outcome = self.run_conversion(job, &progress).await;
            job.set_progress(latest.load(Ordering::Relaxed));

            let recorded = match outcome {
                Ok(result) => {
                    let size = result.bytes.len();
                    job.complete(result).map(|_| {
                        succeeded += 1;
                        callback.on_job_complete(index, job.result_name().unwrap_or_default(), size);
                    })
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Job {} ({}) failed: {}", job.id, job.file.name, message);
                    callback.on_job_error(index, &message);
                    job.fail(message)
                }
            };
            if let Err(e) = recorded {
                warn!("{}", e);
            }
        }

        callback.on_batch_complete(total, succeeded);
        info!("Batch complete: {}/{} jobs succeeded", succeeded, total);
        succeeded
    }
}

/// MIME type → accepted extensions for upload pickers in `category`.
pub fn get_accepted_mimes(category: Category) -> BTreeMap<String, Vec<String>> {
    format::accept_table(category)
        .iter()
        .map(|(mime, exts)| (mime.to_string(), exts.iter().map(|e| e.to_string()).collect()))
        .collect()
}

/// Builder for [`Converter`].
///
/// Every engine defaults to its native implementation configured from the
/// [`ConverterConfig`]; the render host has no default.
#[derive(Default)]
pub struct ConverterBuilder {
    config: Option<ConverterConfig>,
    typesetter: Option<Arc<dyn TypesetterLoader>>,
    transcoder: Option<Arc<dyn TranscoderLoader>>,
    rasterizer: Option<Arc<dyn PdfRasterizerLoader>>,
    render_host: Option<Arc<dyn RenderHost>>,
}

impl ConverterBuilder {
    pub fn config(mut self, config: ConverterConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_typesetter_loader(mut self, loader: Arc<dyn TypesetterLoader>) -> Self {
        self.typesetter = Some(loader);
        self
    }

    pub fn with_transcoder_loader(mut self, loader: Arc<dyn TranscoderLoader>) -> Self {
        self.transcoder = Some(loader);
        self
    }

    pub fn with_rasterizer_loader(mut self, loader: Arc<dyn PdfRasterizerLoader>) -> Self {
        self.rasterizer = Some(loader);
        self
    }

    /// Off-screen renderer for the document-to-image and DOCX-to-PDF routes.
    pub fn with_render_host(mut self, host: Arc<dyn RenderHost>) -> Self {
        self.render_host = Some(host);
        self
    }

    pub fn build(self) -> Converter {
        let config = self.config.unwrap_or_default();
        let typesetter = self
            .typesetter
            .unwrap_or_else(|| Arc::new(PandocLoader::from_config(&config)));
        let transcoder = self
            .transcoder
            .unwrap_or_else(|| Arc::new(FfmpegLoader::from_config(&config)));
        let rasterizer = self
            .rasterizer
            .unwrap_or_else(|| Arc::new(PdfiumLoader::from_config(&config)));

        Converter {
            inner: Arc::new(Inner {
                document: DocumentEngine::new(config.clone(), typesetter, rasterizer, self.render_host),
                media: MediaEngine::new(transcoder),
                config,
            }),
        }
    }
}
