//! CLI binary for localconv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig`, runs batches and writes the results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use localconv::{
    detect_category, detect_format, formats_for_category, get_accepted_mimes, human_file_size,
    BatchProgressCallback, Category, ConversionJob, Converter, ConverterConfig, FormatToken,
    InputFile, JobStatus, NoopBatchCallback,
};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ─────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar per job, created when the job starts and finished when it ends.
struct CliBatchCallback {
    multi: MultiProgress,
    names: Vec<String>,
    bars: Mutex<Vec<Option<ProgressBar>>>,
}

impl CliBatchCallback {
    fn new(names: Vec<String>) -> Arc<Self> {
        let bars = Mutex::new(vec![None; names.len()]);
        Arc::new(Self {
            multi: MultiProgress::new(),
            names,
            bars,
        })
    }

    fn with_bar(&self, index: usize, f: impl FnOnce(&ProgressBar)) {
        if let Some(Some(bar)) = self.bars.lock().get(index) {
            f(bar);
        }
    }

    fn take_bar(&self, index: usize) -> Option<ProgressBar> {
        self.bars.lock().get_mut(index).and_then(Option::take)
    }
}

impl BatchProgressCallback for CliBatchCallback {
    fn on_batch_start(&self, total_jobs: usize) {
        let _ = self.multi.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_jobs} file(s)…"))
        ));
    }

    fn on_job_start(&self, index: usize, _job_id: &str) {
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix(self.names.get(index).cloned().unwrap_or_default());
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Some(slot) = self.bars.lock().get_mut(index) {
            *slot = Some(bar);
        }
    }

    fn on_job_progress(&self, index: usize, percent: u8) {
        self.with_bar(index, |bar| bar.set_position(u64::from(percent)));
    }

    fn on_job_complete(&self, index: usize, result_name: &str, size: usize) {
        if let Some(bar) = self.take_bar(index) {
            bar.finish_and_clear();
        }
        let _ = self.multi.println(format!(
            "  {} {}  {}",
            green("✓"),
            result_name,
            dim(&human_file_size(size as u64))
        ));
    }

    fn on_job_error(&self, index: usize, error: &str) {
        if let Some(bar) = self.take_bar(index) {
            bar.finish_and_clear();
        }
        let name = self.names.get(index).map(String::as_str).unwrap_or("?");
        let _ = self.multi.println(format!("  {} {}  {}", red("✗"), name, red(error)));
    }

    fn on_batch_complete(&self, total_jobs: usize, success_count: usize) {
        let failed = total_jobs.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} failed)",
                if failed == total_jobs { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_jobs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # DOCX to Markdown with images embedded as data URIs
  localconv convert report.docx --to md

  # Several files at once, written to ./out
  localconv convert a.docx b.txt c.md --to html -o out

  # PDF pages stacked into one JPEG
  localconv convert scan.pdf --to jpg-pages

  # Audio extraction
  localconv convert talk.mp4 --to mp3

  # What can a document become?
  localconv formats --category document

  # Upload filter for media pickers
  localconv accepts media --json

ENGINES:
  pandoc   Documents. Found on PATH or downloaded on first use.
  ffmpeg   Audio and video. --transcoder-path, a variant URL, or PATH.
  pdfium   PDF rasterisation. PDFIUM_LIB_PATH, system library, or download.

  Document-to-image (*-pages) and DOCX-to-PDF need an off-screen render
  host, which the command-line tool does not provide; those routes report
  a clear error. All other routes work out of the box.

ENVIRONMENT VARIABLES:
  LOCALCONV_*             Every engine flag below has a LOCALCONV_ fallback
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  RUST_LOG                Override log filtering (e.g. localconv=debug)
"#;

/// Convert images, documents and media files locally.
#[derive(Parser, Debug)]
#[command(
    name = "localconv",
    version,
    about = "Convert images, documents and media files locally",
    long_about = "Convert images, documents and media files without uploading them anywhere. \
Documents go through pandoc, PDFs through pdfium and media through ffmpeg; each engine is \
located or downloaded on first use.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LOCALCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LOCALCONV_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one or more files to a target format.
    Convert(ConvertArgs),

    /// List target formats.
    Formats {
        /// Only this category: image, document, media.
        #[arg(long)]
        category: Option<Category>,
    },

    /// Print accepted upload MIME types for a category.
    Accepts {
        category: Category,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the detected category, format and size of a file.
    Detect { file: PathBuf },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input files.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target format token (png, jpeg, docx, md, pdf, jpg-pages, mp3, …).
    #[arg(short, long)]
    to: FormatToken,

    /// Force a category instead of detecting it per file.
    #[arg(long)]
    category: Option<Category>,

    /// Directory for converted files (default: next to each input).
    #[arg(short, long, env = "LOCALCONV_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Disable progress bars.
    #[arg(long, env = "LOCALCONV_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Quality for lossy encoders (1–100).
    #[arg(long, env = "LOCALCONV_QUALITY", default_value_t = 92,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Device-pixel scale for document captures.
    #[arg(long, env = "LOCALCONV_CAPTURE_SCALE", default_value_t = 2.0)]
    capture_scale: f32,

    /// Scale for PDF page rasterisation (1.0 = 72 DPI).
    #[arg(long, env = "LOCALCONV_PDF_SCALE", default_value_t = 2.0)]
    pdf_scale: f32,

    /// Use this pandoc executable.
    #[arg(long, env = "LOCALCONV_TYPESETTER_PATH")]
    typesetter_path: Option<PathBuf>,

    /// Pandoc release to download when none is installed.
    #[arg(long, env = "LOCALCONV_TYPESETTER_VERSION")]
    typesetter_version: Option<String>,

    /// Download pandoc from this archive URL instead of the release page.
    #[arg(long, env = "LOCALCONV_TYPESETTER_URL")]
    typesetter_url: Option<String>,

    /// Use this ffmpeg executable.
    #[arg(long, env = "LOCALCONV_TRANSCODER_PATH")]
    transcoder_path: Option<PathBuf>,

    /// Download URL of the multi-threaded ffmpeg build.
    #[arg(long, env = "LOCALCONV_TRANSCODER_MT_URL")]
    transcoder_mt_url: Option<String>,

    /// Download URL of the single-threaded ffmpeg build.
    #[arg(long, env = "LOCALCONV_TRANSCODER_ST_URL")]
    transcoder_st_url: Option<String>,

    /// Override the shared-memory capability probe (false forces single-threaded).
    #[arg(long, env = "LOCALCONV_TRANSCODER_SHARED_MEMORY")]
    transcoder_shared_memory: Option<bool>,

    /// Use this libpdfium instead of searching for one.
    #[arg(long, env = "LOCALCONV_PDFIUM_PATH")]
    pdfium_path: Option<PathBuf>,

    /// Engine download timeout in seconds.
    #[arg(long, env = "LOCALCONV_DOWNLOAD_TIMEOUT", default_value_t = 300)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are noise while progress bars are drawn.
    let bars_active = matches!(&cli.command, Command::Convert(a) if !a.no_progress) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || bars_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Convert(args) => run_convert(args, cli.quiet).await,
        Command::Formats { category } => {
            print_formats(category);
            Ok(())
        }
        Command::Accepts { category, json } => print_accepts(category, json),
        Command::Detect { file } => detect(&file).await,
    }
}

async fn run_convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args.engine)?;
    let converter = Converter::new(config);

    let mut jobs = Vec::with_capacity(args.files.len());
    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = InputFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let job = match args.category {
            Some(category) => ConversionJob::new(file, args.to, category),
            None => ConversionJob::detect(file, args.to),
        };
        jobs.push(job);
        sources.push(path.clone());
    }

    let callback: Arc<dyn BatchProgressCallback> = if quiet || args.no_progress {
        Arc::new(NoopBatchCallback)
    } else {
        CliBatchCallback::new(jobs.iter().map(|j| j.file.name.clone()).collect())
    };

    let succeeded = converter.run_batch(&mut jobs, callback).await;

    for (job, source) in jobs.iter().zip(&sources) {
        match job.status() {
            JobStatus::Done => {
                if let (Some(result), Some(name)) = (job.result(), job.result_name()) {
                    let dir = output_dir(args.output_dir.as_deref(), source);
                    let path = dir.join(name);
                    write_output(&path, &result.bytes).await?;
                    if !quiet && args.no_progress {
                        eprintln!("{} → {}", source.display(), path.display());
                    }
                }
            }
            JobStatus::Error if args.no_progress || quiet => {
                eprintln!("{}: {}", source.display(), job.error().unwrap_or("unknown error"));
            }
            _ => {}
        }
    }

    if succeeded < jobs.len() {
        anyhow::bail!("{} of {} conversions failed", jobs.len() - succeeded, jobs.len());
    }
    Ok(())
}

fn output_dir(requested: Option<&Path>, source: &Path) -> PathBuf {
    match requested {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// Write via a temp file and rename so a failed write leaves no partial output.
async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("localconv.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move output to {}", path.display()))?;
    Ok(())
}

fn print_formats(category: Option<Category>) {
    let categories = match category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };
    for category in categories {
        println!("{}", bold(category.as_str()));
        for option in formats_for_category(category) {
            println!(
                "  {:<12} {:<18} {:<8} {}",
                option.value.as_str(),
                option.label,
                option.ext,
                dim(option.mime)
            );
        }
    }
}

fn print_accepts(category: Category, json: bool) -> Result<()> {
    let table = get_accepted_mimes(category);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&table).context("Failed to serialise accept table")?
        );
    } else {
        for (mime, exts) in &table {
            println!("{:<72} {}", mime, exts.join(" "));
        }
    }
    Ok(())
}

async fn detect(path: &Path) -> Result<()> {
    let file = InputFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let format = detect_format(&file.name, &file.mime);
    println!("File:      {}", path.display());
    println!("Category:  {}", detect_category(&file.name, &file.mime));
    println!(
        "Format:    {}",
        format.map(|f| f.to_string()).unwrap_or_else(|| "unknown".into())
    );
    println!("MIME:      {}", file.mime);
    println!("Size:      {}", human_file_size(file.len() as u64));
    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(args: &EngineArgs) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .lossy_quality(args.quality)
        .capture_scale(args.capture_scale)
        .pdf_raster_scale(args.pdf_scale)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref p) = args.typesetter_path {
        builder = builder.typesetter_path(p);
    }
    if let Some(ref v) = args.typesetter_version {
        builder = builder.typesetter_version(v);
    }
    if let Some(ref u) = args.typesetter_url {
        builder = builder.typesetter_url(u);
    }
    if let Some(ref p) = args.transcoder_path {
        builder = builder.transcoder_path(p);
    }
    if let Some(ref u) = args.transcoder_mt_url {
        builder = builder.transcoder_mt_url(u);
    }
    if let Some(ref u) = args.transcoder_st_url {
        builder = builder.transcoder_st_url(u);
    }
    if let Some(shared) = args.transcoder_shared_memory {
        builder = builder.shared_memory(shared);
    }
    if let Some(ref p) = args.pdfium_path {
        builder = builder.pdfium_path(p);
    }

    builder.build().context("Invalid configuration")
}
