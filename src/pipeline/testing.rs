//! Shared fixtures for pipeline unit tests.

use crate::engine::{
    CaptureOptions, CaptureTarget, ContainerRenderOptions, RenderHost, SurfaceId, SurfaceSpec,
    TypesetInput, TypesetOutput, TypesetRequest, Typesetter, TypesetterLoader,
};
use crate::error::{ConvertError, EngineLoadError};
use crate::progress::Progress;
use futures::future::{BoxFuture, FutureExt};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;

pub(crate) fn docx_with_media(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buf.into_inner()
}

pub(crate) fn sample_docx() -> Vec<u8> {
    docx_with_media(&[
        ("word/document.xml", b"<w:document>Hello</w:document>"),
        ("word/media/image1.png", b"\x89PNG\r\n\x1a\n"),
    ])
}

pub(crate) fn recorder() -> (Progress, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Progress::from_fn(move |p| sink.lock().push(p)), seen)
}

/// Echoing typesetter: HTML output wraps the input text in `<p>` and links
/// `media/image1.png`; container outputs are real zip files.
#[derive(Default)]
pub(crate) struct EchoTypesetter {
    pub requests: Mutex<Vec<TypesetRequest>>,
    pub stderr_only: bool,
    /// Succeed with no output and no diagnostics.
    pub silent: bool,
    pub media_files: HashMap<String, Vec<u8>>,
}

impl Typesetter for EchoTypesetter {
    fn convert(&self, request: TypesetRequest) -> BoxFuture<'_, Result<TypesetOutput, ConvertError>> {
        self.requests.lock().push(request.clone());
        let mut out = TypesetOutput::default();

        if self.stderr_only {
            out.stderr = "pandoc: unknown reader".into();
            return async move { Ok(out) }.boxed();
        }
        if self.silent {
            return async move { Ok(out) }.boxed();
        }

        let text = match &request.input {
            TypesetInput::File { bytes, .. } => String::from_utf8_lossy(bytes).into_owned(),
            TypesetInput::Stdin(text) => text.clone(),
        };

        match &request.output_file {
            Some(name) => {
                out.files.insert(name.clone(), docx_with_media(&[("content.xml", text.as_bytes())]));
            }
            None if request.to == "html" => {
                out.stdout = format!(
                    "<html><head><title>doc</title></head><body><p>{text}</p><img src=\"media/image1.png\"></body></html>"
                );
            }
            None if request.to == "markdown" => {
                out.stdout = format!("{text}\n\n![figure](media/image1.png)\n");
            }
            None => out.stdout = text,
        }
        if request.extract_media.is_some() {
            out.media_files = self.media_files.clone();
        }
        async move { Ok(out) }.boxed()
    }
}

pub(crate) struct EchoLoader {
    pub instance: Arc<EchoTypesetter>,
    pub loads: AtomicUsize,
    pub fail: bool,
}

impl EchoLoader {
    pub fn new(instance: EchoTypesetter) -> Arc<Self> {
        Arc::new(Self {
            instance: Arc::new(instance),
            loads: AtomicUsize::new(0),
            fail: false,
        })
    }
}

impl TypesetterLoader for EchoLoader {
    fn load(&self, progress: Progress) -> BoxFuture<'static, Result<Arc<dyn Typesetter>, EngineLoadError>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail {
            Err(EngineLoadError::Fetch("HTTP 503".into()))
        } else {
            Ok(self.instance.clone() as Arc<dyn Typesetter>)
        };
        async move {
            progress.report(50.0);
            result
        }
        .boxed()
    }
}

/// Render host whose captures are white bitmaps of a fixed device size.
pub(crate) struct FakeHost {
    pub sections: usize,
    pub capture_size: (u32, u32),
    pub mounted: Mutex<Vec<SurfaceId>>,
    pub markup: Mutex<Vec<String>>,
    pub fail_capture: bool,
    next: AtomicU64,
}

impl FakeHost {
    pub fn new(sections: usize, capture_size: (u32, u32)) -> Self {
        Self {
            sections,
            capture_size,
            mounted: Mutex::new(Vec::new()),
            markup: Mutex::new(Vec::new()),
            fail_capture: false,
            next: AtomicU64::new(1),
        }
    }

    fn mount(&self) -> SurfaceId {
        let id = SurfaceId(self.next.fetch_add(1, Ordering::SeqCst));
        self.mounted.lock().push(id);
        id
    }
}

impl RenderHost for FakeHost {
    fn mount_html(&self, markup: String, _spec: SurfaceSpec) -> BoxFuture<'_, Result<SurfaceId, ConvertError>> {
        self.markup.lock().push(markup);
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
        _target: CaptureTarget,
        _options: CaptureOptions,
    ) -> BoxFuture<'_, Result<RgbaImage, ConvertError>> {
        let (w, h) = self.capture_size;
        let fail = self.fail_capture;
        async move {
            if fail {
                return Err(ConvertError::Render("capture failed".into()));
            }
            Ok(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
        }
        .boxed()
    }

    fn unmount(&self, surface: SurfaceId) {
        self.mounted.lock().retain(|s| *s != surface);
    }
}
