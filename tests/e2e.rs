//! End-to-end tests for localconv.
//!
//! The first group drives the public [`Converter`] against in-process mock
//! engines and always runs. Tests that need real pandoc, ffmpeg or pdfium
//! are gated behind the `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Including the real engines:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use futures::future::{BoxFuture, FutureExt};
use image::{DynamicImage, Rgba, RgbaImage};
use localconv::engine::{
    CaptureOptions, CaptureTarget, ContainerRenderOptions, CoreVariant, FractionCallback,
    PageCallback, PdfRasterizer, PdfRasterizerLoader, RenderHost, SurfaceId, SurfaceSpec,
    Transcoder, TranscoderLoader, TypesetInput, TypesetOutput, TypesetRequest, Typesetter,
    TypesetterLoader,
};
use localconv::format::DOCX_MIME;
use localconv::{
    Category, ConversionJob, ConvertError, Converter, EngineLoadError, FormatToken, InputFile,
    JobStatus, NoopBatchCallback, Progress,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Mock engines ─────────────────────────────────────────────────────────────

fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        for (name, data) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn sample_docx() -> Vec<u8> {
    zip_of(&[
        ("word/document.xml", &b"<w:document>Quarterly report</w:document>"[..]),
        ("word/media/image1.png", &b"\x89PNG\r\n\x1a\nfake"[..]),
    ])
}

/// Deterministic typesetter: text inputs are echoed, DOCX inputs become a
/// fixed paragraph that references `media/image1.png`.
struct MockTypesetter;

impl Typesetter for MockTypesetter {
    fn convert(&self, request: TypesetRequest) -> BoxFuture<'_, Result<TypesetOutput, ConvertError>> {
        let text = match (&request.input, request.from.as_str()) {
            (_, "docx") => "Quarterly report".to_string(),
            (TypesetInput::File { bytes, .. }, _) => String::from_utf8_lossy(bytes).into_owned(),
            (TypesetInput::Stdin(text), _) => text.clone(),
        };
        let mut out = TypesetOutput::default();
        match (&request.output_file, request.to.as_str()) {
            (Some(name), _) => {
                out.files.insert(name.clone(), zip_of(&[("content.xml", text.as_bytes())]));
            }
            (None, "html") => {
                out.stdout = format!(
                    "<html><head><title>t</title></head><body><p>{text}</p><img src=\"media/image1.png\"></body></html>"
                );
            }
            (None, "markdown") => out.stdout = format!("{text}\n\n![chart](media/image1.png)\n"),
            (None, _) => out.stdout = text,
        }
        async move { Ok(out) }.boxed()
    }
}

#[derive(Default)]
struct MockTypesetterLoader {
    loads: AtomicUsize,
}

impl TypesetterLoader for MockTypesetterLoader {
    fn load(&self, progress: Progress) -> BoxFuture<'static, Result<Arc<dyn Typesetter>, EngineLoadError>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            progress.done();
            Ok(Arc::new(MockTypesetter) as Arc<dyn Typesetter>)
        }
        .boxed()
    }
}

/// Render host producing white A4-ish captures; counts live surfaces.
struct MockHost {
    sections: usize,
    live: AtomicUsize,
    next: AtomicU64,
}

impl MockHost {
    fn new(sections: usize) -> Arc<Self> {
        Arc::new(Self {
            sections,
            live: AtomicUsize::new(0),
            next: AtomicU64::new(1),
        })
    }

    fn mount(&self) -> SurfaceId {
        self.live.fetch_add(1, Ordering::SeqCst);
        SurfaceId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl RenderHost for MockHost {
    fn mount_html(&self, _markup: String, _spec: SurfaceSpec) -> BoxFuture<'_, Result<SurfaceId, ConvertError>> {
        let id = self.mount();
        async move { Ok(id) }.boxed()
    }

    fn mount_container(
        &self,
        _container: Vec<u8>,
        _spec: SurfaceSpec,
        _options: ContainerRenderOptions,
    ) -> BoxFuture<'_, Result<SurfaceId, ConvertError>> {
        let id = self.mount();
        async move { Ok(id) }.boxed()
    }

    fn section_count(&self, _surface: SurfaceId) -> BoxFuture<'_, Result<usize, ConvertError>> {
        let n = self.sections;
        async move { Ok(n) }.boxed()
    }

    fn images_settled(&self, _surface: SurfaceId) -> BoxFuture<'_, ()> {
        async {}.boxed()
    }

    fn capture(
        &self,
        _surface: SurfaceId,
        target: CaptureTarget,
        _options: CaptureOptions,
    ) -> BoxFuture<'_, Result<RgbaImage, ConvertError>> {
        let height = match target {
            CaptureTarget::Section(_) => 120,
            CaptureTarget::Whole => 300,
        };
        async move { Ok(RgbaImage::from_pixel(80, height, Rgba([255, 255, 255, 255]))) }.boxed()
    }

    fn unmount(&self, _surface: SurfaceId) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockTranscoder {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl Transcoder for MockTranscoder {
    fn write_file<'a>(&'a self, name: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<(), ConvertError>> {
        self.files.lock().insert(name.to_string(), data.to_vec());
        async { Ok(()) }.boxed()
    }

    fn exec<'a>(&'a self, args: &'a [String], on_progress: FractionCallback) -> BoxFuture<'a, Result<i32, ConvertError>> {
        async move {
            on_progress(0.5);
            on_progress(1.0);
            if let Some(out) = args.last() {
                self.files.lock().insert(out.clone(), b"transcoded".to_vec());
            }
            Ok(0)
        }
        .boxed()
    }

    fn read_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ConvertError>> {
        let found = self.files.lock().get(name).cloned();
        async move { found.ok_or_else(|| ConvertError::Internal(format!("{name} missing"))) }.boxed()
    }

    fn delete_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), ConvertError>> {
        self.files.lock().remove(name);
        async { Ok(()) }.boxed()
    }
}

struct MockTranscoderLoader {
    loads: AtomicUsize,
    fail_next: AtomicBool,
    shared_memory: bool,
    instance: Arc<MockTranscoder>,
}

impl MockTranscoderLoader {
    fn new(shared_memory: bool) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            shared_memory,
            instance: Arc::new(MockTranscoder::default()),
        })
    }
}

impl TranscoderLoader for MockTranscoderLoader {
    fn supports_shared_memory(&self) -> bool {
        self.shared_memory
    }

    fn load(&self, _variant: CoreVariant, _progress: Progress) -> BoxFuture<'static, Result<Arc<dyn Transcoder>, EngineLoadError>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_next.swap(false, Ordering::SeqCst);
        let instance = Arc::clone(&self.instance);
        async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if fail {
                return Err(EngineLoadError::Fetch("HTTP 503 fetching core".into()));
            }
            Ok(instance as Arc<dyn Transcoder>)
        }
        .boxed()
    }
}

/// Loader for hosts without shared memory that still ask for the threaded core.
struct IsolationMissingLoader;

impl TranscoderLoader for IsolationMissingLoader {
    fn supports_shared_memory(&self) -> bool {
        true
    }

    fn load(&self, _variant: CoreVariant, _progress: Progress) -> BoxFuture<'static, Result<Arc<dyn Transcoder>, EngineLoadError>> {
        async { Err(EngineLoadError::Instantiate("SharedArrayBuffer is not defined".into())) }.boxed()
    }
}

struct MockRasterizer;

impl PdfRasterizer for MockRasterizer {
    fn rasterize(&self, _pdf: Vec<u8>, _scale: f32, on_page: PageCallback) -> BoxFuture<'_, Result<Vec<DynamicImage>, ConvertError>> {
        async move {
            on_page(0, 3);
            let mut pages = Vec::new();
            for i in 0..3 {
                pages.push(DynamicImage::ImageRgba8(RgbaImage::from_pixel(60, 80, Rgba([0, 0, 0, 255]))));
                on_page(i + 1, 3);
            }
            Ok(pages)
        }
        .boxed()
    }
}

#[derive(Default)]
struct MockRasterizerLoader {
    loads: AtomicUsize,
}

impl PdfRasterizerLoader for MockRasterizerLoader {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn PdfRasterizer>, EngineLoadError>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        async { Ok(Arc::new(MockRasterizer) as Arc<dyn PdfRasterizer>) }.boxed()
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Harness {
    converter: Converter,
    typesetter: Arc<MockTypesetterLoader>,
    transcoder: Arc<MockTranscoderLoader>,
    rasterizer: Arc<MockRasterizerLoader>,
    host: Arc<MockHost>,
}

fn harness() -> Harness {
    let typesetter = Arc::new(MockTypesetterLoader::default());
    let transcoder = MockTranscoderLoader::new(true);
    let rasterizer = Arc::new(MockRasterizerLoader::default());
    let host = MockHost::new(2);
    let converter = Converter::builder()
        .with_typesetter_loader(typesetter.clone())
        .with_transcoder_loader(transcoder.clone())
        .with_rasterizer_loader(rasterizer.clone())
        .with_render_host(host.clone())
        .build();
    Harness {
        converter,
        typesetter,
        transcoder,
        rasterizer,
        host,
    }
}

fn recorder() -> (Progress, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Progress::from_fn(move |p| sink.lock().push(p)), seen)
}

fn text_file() -> InputFile {
    InputFile::new("notes.txt", "text/plain", b"Hello World\nLine 2".to_vec())
}

fn docx_file() -> InputFile {
    InputFile::new("report.docx", DOCX_MIME, sample_docx())
}

fn png_bytes() -> Vec<u8> {
    let img = RgbaImage::from_pixel(12, 9, Rgba([10, 120, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_text_to_html() {
    let h = harness();
    let job = ConversionJob::detect(text_file(), FormatToken::Html);
    assert_eq!(job.category, Category::Document);

    let out = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    assert_eq!(out.ext, "html");
    assert!(String::from_utf8_lossy(&out.bytes).contains("Hello World"));
}

#[tokio::test]
async fn scenario_b_text_to_docx_is_a_zip() {
    let h = harness();
    let job = ConversionJob::detect(text_file(), FormatToken::Docx);
    let out = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    assert_eq!(&out.bytes[..2], &[0x50, 0x4B]);
    assert_eq!(out.ext, "docx");
    assert_eq!(out.mime, DOCX_MIME);
}

#[tokio::test]
async fn scenario_c_docx_to_pdf() {
    let h = harness();
    let (progress, seen) = recorder();
    let job = ConversionJob::detect(docx_file(), FormatToken::Pdf);

    let out = h.converter.run_conversion(&job, &progress).await.unwrap();
    assert_eq!(&out.bytes[..4], b"%PDF");
    assert_eq!(out.ext, "pdf");
    let seen = seen.lock();
    assert!(*seen.first().unwrap() <= 10);
    assert_eq!(*seen.last().unwrap(), 100);
    assert_eq!(h.host.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_d_docx_to_page_images() {
    let h = harness();
    for (target, mime) in [
        (FormatToken::JpgPages, "image/jpeg"),
        (FormatToken::PngPages, "image/png"),
        (FormatToken::WebpPages, "image/webp"),
    ] {
        let job = ConversionJob::detect(docx_file(), target);
        let out = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
        assert_eq!(out.mime, mime, "{target}");
        assert!(!out.bytes.is_empty());
    }
    assert_eq!(h.host.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_e_unknown_extension_always_rejects() {
    let h = harness();
    for target in FormatToken::ALL {
        let job = ConversionJob::detect(InputFile::new("data.abcde", "", b"??".to_vec()), target);
        assert_eq!(job.category, Category::Document);
        let err = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedSource { .. }), "{target}: {err}");
    }
    assert_eq!(h.typesetter.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn same_input_twice_gives_comparable_output() {
    let h = harness();
    let job = ConversionJob::detect(docx_file(), FormatToken::Md);
    let first = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    let second = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    assert_eq!(first.ext, second.ext);
    assert!(!first.bytes.is_empty());
    assert_eq!(first.bytes.len(), second.bytes.len());
}

// ── Routing properties ───────────────────────────────────────────────────────

#[tokio::test]
async fn docx_to_pdf_uses_pagination_not_the_typesetter() {
    let h = harness();
    let job = ConversionJob::detect(docx_file(), FormatToken::Pdf);
    h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    assert_eq!(h.typesetter.loads.load(Ordering::SeqCst), 0);
    assert!(!h.converter.is_typesetter_loaded());
}

#[tokio::test]
async fn pdf_only_becomes_jpg_pages() {
    let h = harness();
    let pdf = InputFile::new("scan.pdf", "application/pdf", b"%PDF-1.7".to_vec());

    for target in [FormatToken::Docx, FormatToken::Html, FormatToken::PngPages, FormatToken::Pdf] {
        let job = ConversionJob::detect(pdf.clone(), target);
        let err = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::PdfTargetRestricted { .. }));
        assert!(err.to_string().contains("only convertible to JPG"));
    }
    assert_eq!(h.typesetter.loads.load(Ordering::SeqCst), 0);
    assert_eq!(h.host.next.load(Ordering::SeqCst), 1);

    let job = ConversionJob::detect(pdf, FormatToken::JpgPages);
    let out = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    assert_eq!(out.ext, "jpg");
    let stacked = image::load_from_memory(&out.bytes).unwrap();
    assert_eq!((stacked.width(), stacked.height()), (60, 240));
    assert_eq!(h.rasterizer.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_category_is_a_classified_error() {
    let err: ConvertError = "spreadsheet".parse::<Category>().unwrap_err().into();
    assert!(matches!(err, ConvertError::UnknownCategory(ref c) if c == "spreadsheet"));
}

#[tokio::test]
async fn images_reencode_without_any_engine() {
    let h = harness();
    let job = ConversionJob::detect(InputFile::new("photo.png", "image/png", png_bytes()), FormatToken::Jpeg);
    assert_eq!(job.category, Category::Image);
    let (progress, seen) = recorder();

    let out = h.converter.run_conversion(&job, &progress).await.unwrap();
    assert_eq!(out.ext, "jpg");
    assert_eq!(*seen.lock(), vec![10, 40, 70, 100]);
}

// ── Engine singletons ────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_first_calls_share_one_load() {
    let h = harness();
    let a = ConversionJob::detect(InputFile::new("a.wav", "audio/wav", b"RIFF".to_vec()), FormatToken::Mp3);
    let b = ConversionJob::detect(InputFile::new("b.mp4", "video/mp4", b"ftyp".to_vec()), FormatToken::Ogg);

    let (pa, pb) = (Progress::noop(), Progress::noop());
    let (ra, rb) = tokio::join!(
        h.converter.run_conversion(&a, &pa),
        h.converter.run_conversion(&b, &pb),
    );
    assert_eq!(ra.unwrap().ext, "mp3");
    assert_eq!(rb.unwrap().mime, "audio/ogg");
    assert_eq!(h.transcoder.loads.load(Ordering::SeqCst), 1);
    assert!(h.converter.is_transcoder_loaded());
}

#[tokio::test]
async fn failed_load_is_retried_on_the_next_call() {
    let h = harness();
    h.transcoder.fail_next.store(true, Ordering::SeqCst);
    let job = ConversionJob::detect(InputFile::new("a.wav", "audio/wav", b"RIFF".to_vec()), FormatToken::Mp3);

    let err = h.converter.run_conversion(&job, &Progress::noop()).await.unwrap_err();
    assert!(matches!(err, ConvertError::EngineLoad { engine: "media", .. }));
    assert!(!h.converter.is_transcoder_loaded());

    h.converter.run_conversion(&job, &Progress::noop()).await.unwrap();
    assert_eq!(h.transcoder.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_isolation_gets_its_own_error() {
    let converter = Converter::builder()
        .with_transcoder_loader(Arc::new(IsolationMissingLoader))
        .build();
    let job = ConversionJob::detect(InputFile::new("a.wav", "audio/wav", b"RIFF".to_vec()), FormatToken::Mp3);
    let err = converter.run_conversion(&job, &Progress::noop()).await.unwrap_err();
    assert!(matches!(err, ConvertError::CrossOriginIsolationRequired(_)));
}

#[tokio::test]
async fn media_progress_ends_at_one_hundred() {
    let h = harness();
    let (progress, seen) = recorder();
    let job = ConversionJob::detect(InputFile::new("a.wav", "audio/wav", b"RIFF".to_vec()), FormatToken::Wav);
    h.converter.run_conversion(&job, &progress).await.unwrap();
    let seen = seen.lock();
    assert!(*seen.first().unwrap() <= 10);
    assert_eq!(*seen.last().unwrap(), 100);
    assert!(seen.iter().all(|p| *p <= 100));
}

// ── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_marks_each_job_independently() {
    let h = harness();
    let mut jobs = vec![
        ConversionJob::detect(text_file(), FormatToken::Md),
        ConversionJob::detect(InputFile::new("scan.pdf", "application/pdf", b"%PDF".to_vec()), FormatToken::Docx),
        ConversionJob::detect(docx_file(), FormatToken::Pdf),
    ];

    let ok = h.converter.run_batch(&mut jobs, Arc::new(NoopBatchCallback)).await;
    assert_eq!(ok, 2);
    assert_eq!(jobs[0].status(), JobStatus::Done);
    assert_eq!(jobs[0].result_name(), Some("notes.md"));
    assert_eq!(jobs[1].status(), JobStatus::Error);
    assert!(jobs[1].error().unwrap().contains("JPG"));
    assert_eq!(jobs[2].result_name(), Some("report.pdf"));
}

#[tokio::test]
async fn without_a_render_host_only_rendering_routes_fail() {
    let converter = Converter::builder()
        .with_typesetter_loader(Arc::new(MockTypesetterLoader::default()))
        .build();
    let pdf_job = ConversionJob::detect(docx_file(), FormatToken::Pdf);
    let err = converter.run_conversion(&pdf_job, &Progress::noop()).await.unwrap_err();
    assert!(matches!(err, ConvertError::RendererUnavailable { .. }));

    let md_job = ConversionJob::detect(docx_file(), FormatToken::Md);
    let out = converter.run_conversion(&md_job, &Progress::noop()).await.unwrap();
    let md = String::from_utf8(out.bytes).unwrap();
    assert!(md.contains("![chart](data:image/png;base64,"));
}

// ── Real engines (E2E_ENABLED) ───────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

#[tokio::test]
async fn test_real_pandoc_text_to_html() {
    e2e_skip_unless_enabled!();
    let converter = Converter::new(Default::default());
    let job = ConversionJob::detect(text_file(), FormatToken::Html);
    let out = converter
        .run_conversion(&job, &Progress::noop())
        .await
        .expect("pandoc conversion");
    let html = String::from_utf8_lossy(&out.bytes);
    assert!(html.contains("Hello World"));
    assert!(html.contains("<style>"));
}

#[tokio::test]
async fn test_real_pandoc_text_to_docx() {
    e2e_skip_unless_enabled!();
    let converter = Converter::new(Default::default());
    let job = ConversionJob::detect(text_file(), FormatToken::Docx);
    let out = converter
        .run_conversion(&job, &Progress::noop())
        .await
        .expect("pandoc conversion");
    assert_eq!(&out.bytes[..2], b"PK");
}

#[tokio::test]
async fn test_real_ffmpeg_wav_to_mp3() {
    e2e_skip_unless_enabled!();
    // One second of silence, 8 kHz mono 16-bit PCM.
    let samples = 8000u32;
    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + samples * 2).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&8000u32.to_le_bytes());
    wav.extend_from_slice(&16000u32.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(samples * 2).to_le_bytes());
    wav.resize(wav.len() + (samples * 2) as usize, 0);

    let converter = Converter::new(Default::default());
    let (progress, seen) = recorder();
    let job = ConversionJob::detect(InputFile::new("silence.wav", "audio/wav", wav), FormatToken::Mp3);
    let out = converter.run_conversion(&job, &progress).await.expect("ffmpeg conversion");
    assert_eq!(out.mime, "audio/mpeg");
    assert!(!out.bytes.is_empty());
    assert_eq!(*seen.lock().last().unwrap(), 100);
}

#[tokio::test]
async fn test_real_pdfium_single_page() {
    e2e_skip_unless_enabled!();
    let pdf = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/sample.pdf");
    if !pdf.exists() {
        println!("SKIP: test file not found: {}", pdf.display());
        return;
    }
    let converter = Converter::new(Default::default());
    let out = converter
        .convert_path(&pdf, FormatToken::JpgPages, &Progress::noop())
        .await
        .expect("pdfium conversion");
    assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
}
