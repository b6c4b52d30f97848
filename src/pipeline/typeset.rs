//! Direct document conversion through the typesetting engine.
//!
//! Format support is two finite maps consulted together: source extension
//! → engine reader, target token → engine writer. A missing entry on either
//! side is the only rejection condition.
//!
//! Container outputs (`docx`, `odt`, `epub`) come back as files; textual
//! outputs come back on stdout. When a DOCX is converted to text, its images
//! are embedded as data URIs so the output has no dangling references.

use crate::engine::{LazyEngine, TypesetInput, TypesetOutput, TypesetRequest, Typesetter, TypesetterLoader};
use crate::error::{ConvertError, EngineLoadError};
use crate::format::{self, Category, FormatToken};
use crate::job::{ConversionResult, InputFile};
use crate::pipeline::embed::{self, TextFlavor};
use crate::progress::Progress;
use std::sync::Arc;
use tracing::{debug, info};

/// Engine reader for a source file extension.
pub fn typeset_input(ext: &str) -> Option<&'static str> {
    let reader = match ext {
        "docx" | "doc" => "docx",
        "html" | "htm" => "html",
        "txt" => "markdown",
        "md" | "markdown" => "markdown",
        "rtf" => "rtf",
        "odt" => "odt",
        "epub" => "epub",
        "csv" => "csv",
        "tsv" => "tsv",
        _ => return None,
    };
    Some(reader)
}

/// Engine writer for a target token.
pub fn typeset_output(target: FormatToken) -> Option<&'static str> {
    match target {
        FormatToken::Docx => Some("docx"),
        FormatToken::Html => Some("html"),
        FormatToken::Txt => Some("plain"),
        FormatToken::Md => Some("markdown"),
        FormatToken::Rtf => Some("rtf"),
        FormatToken::Odt => Some("odt"),
        FormatToken::Epub => Some("epub"),
        FormatToken::Png
        | FormatToken::Jpeg
        | FormatToken::Webp
        | FormatToken::Bmp
        | FormatToken::Gif
        | FormatToken::Pdf
        | FormatToken::JpgPages
        | FormatToken::PngPages
        | FormatToken::WebpPages
        | FormatToken::Mp3
        | FormatToken::Wav
        | FormatToken::Ogg
        | FormatToken::Mp4
        | FormatToken::Webm => None,
    }
}

/// `true` when both sides of the pair have an engine format.
pub fn can_typeset(ext: &str, target: FormatToken) -> bool {
    typeset_input(ext).is_some() && typeset_output(target).is_some()
}

fn is_container_output(writer: &str) -> bool {
    matches!(writer, "docx" | "odt" | "epub")
}

fn text_mime(writer: &str) -> &'static str {
    match writer {
        "html" => "text/html",
        "plain" => "text/plain",
        "markdown" => "text/markdown",
        "rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}

fn container_mime(target: FormatToken) -> &'static str {
    format::find_option(Category::Document, target)
        .map(|o| o.mime)
        .unwrap_or("application/octet-stream")
}

fn is_docx(ext: &str) -> bool {
    matches!(ext, "docx" | "doc")
}

/// The typesetting engine behind a lazily-loaded shared handle.
pub struct TypesetEngine {
    loader: Arc<dyn TypesetterLoader>,
    engine: LazyEngine<dyn Typesetter>,
}

impl TypesetEngine {
    pub fn new(loader: Arc<dyn TypesetterLoader>) -> Self {
        Self {
            loader,
            engine: LazyEngine::new("document"),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_ready()
    }

    async fn typesetter(&self, progress: Progress) -> Result<Arc<dyn Typesetter>, ConvertError> {
        let loader = Arc::clone(&self.loader);
        self.engine
            .get_or_load(move || loader.load(progress))
            .await
            .map_err(classify_load_error)
    }

    /// Convert `file` to `target` directly.
    ///
    /// Progress: engine load 0–50, 60 before the run, 85 after it, 100 done.
    pub async fn convert(
        &self,
        file: &InputFile,
        target: FormatToken,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        let ext = file.extension();
        let (reader, writer) = match (typeset_input(&ext), typeset_output(target)) {
            (Some(r), Some(w)) => (r, w),
            _ => return Err(ConvertError::unsupported_route(&ext, target)),
        };

        let container_out = is_container_output(writer);
        let embed_media = is_docx(&ext) && !container_out;
        let mut media = if embed_media {
            embed::extract_docx_media(&file.bytes)
        } else {
            Default::default()
        };

        let typesetter = self.typesetter(progress.stage(0.0, 50.0)).await?;
        progress.report(50.0);

        let output_file = container_out.then(|| format!("output.{}", target.as_str()));
        let request = TypesetRequest {
            from: reader.to_string(),
            to: writer.to_string(),
            standalone: true,
            input: TypesetInput::File {
                name: format!("input.{ext}"),
                bytes: file.bytes.clone(),
            },
            output_file: output_file.clone(),
            extract_media: None,
        };
        progress.report(60.0);

        let mut result = typesetter.convert(request).await?;
        progress.report(85.0);

        let produced = take_output(&mut result, output_file.as_deref());
        let converted = match produced {
            Some(bytes) => ConversionResult::new(bytes, container_mime(target), target.as_str()),
            None if !result.stdout.is_empty() => {
                let mut text = std::mem::take(&mut result.stdout);
                if embed_media {
                    embed::merge_engine_media(&mut media, &result.media_files);
                    let flavor = match writer {
                        "html" => TextFlavor::Html,
                        "markdown" => TextFlavor::Markdown,
                        _ => TextFlavor::Plain,
                    };
                    text = embed::embed_media(&text, &media, flavor);
                }
                if writer == "html" {
                    text = embed::inject_stylesheet(&text);
                }
                ConversionResult::new(text.into_bytes(), text_mime(writer), target.as_str())
            }
            None => return Err(no_output(result)),
        };

        progress.done();
        info!(
            "Typeset {} ({}) → {} ({} bytes)",
            file.name,
            reader,
            writer,
            converted.bytes.len()
        );
        Ok(converted)
    }

    /// HTML for on-screen rendering, with every image embedded as a data URI.
    ///
    /// Progress: 30 after media extraction, engine load 30–60, 75 after the
    /// run, 85 once references are rewritten.
    pub async fn html_with_media(&self, file: &InputFile, progress: &Progress) -> Result<String, ConvertError> {
        let ext = file.extension();
        let reader = typeset_input(&ext).ok_or_else(|| ConvertError::UnsupportedSource { ext: ext.clone() })?;

        let mut media = if is_docx(&ext) {
            embed::extract_docx_media(&file.bytes)
        } else {
            Default::default()
        };
        progress.report(30.0);

        let typesetter = self.typesetter(progress.stage(30.0, 60.0)).await?;
        progress.report(60.0);

        let request = TypesetRequest {
            from: reader.to_string(),
            to: "html".into(),
            standalone: true,
            input: TypesetInput::File {
                name: format!("input.{ext}"),
                bytes: file.bytes.clone(),
            },
            output_file: None,
            extract_media: media.is_empty().then(|| ".".to_string()),
        };

        let result = typesetter.convert(request).await?;
        progress.report(75.0);

        if result.stdout.trim().is_empty() {
            return Err(no_output(result));
        }

        embed::merge_engine_media(&mut media, &result.media_files);
        let html = embed::embed_media(&result.stdout, &media, TextFlavor::Html);
        debug!("HTML for rendering: {} bytes, {} media keys", html.len(), media.len());
        progress.report(85.0);
        Ok(html)
    }

    /// Convert an in-memory HTML string to `target`.
    ///
    /// Progress: engine load 0–50, 60 before the run, 90 after it, 100 done.
    pub async fn convert_html(
        &self,
        html: &str,
        target: FormatToken,
        progress: &Progress,
    ) -> Result<ConversionResult, ConvertError> {
        let writer = typeset_output(target).ok_or_else(|| ConvertError::unsupported_route("html", target))?;

        let typesetter = self.typesetter(progress.stage(0.0, 50.0)).await?;
        progress.report(50.0);

        let output_file = is_container_output(writer).then(|| format!("output.{}", target.as_str()));
        let request = TypesetRequest {
            from: "html".into(),
            to: writer.to_string(),
            standalone: true,
            input: TypesetInput::Stdin(html.to_string()),
            output_file: output_file.clone(),
            extract_media: None,
        };
        progress.report(60.0);

        let mut result = typesetter.convert(request).await?;
        progress.report(90.0);

        let converted = match take_output(&mut result, output_file.as_deref()) {
            Some(bytes) => ConversionResult::new(bytes, container_mime(target), target.as_str()),
            None if !result.stdout.is_empty() => {
                let mut text = std::mem::take(&mut result.stdout);
                if writer == "html" {
                    text = embed::inject_stylesheet(&text);
                }
                ConversionResult::new(text.into_bytes(), text_mime(writer), target.as_str())
            }
            None => return Err(no_output(result)),
        };

        progress.done();
        Ok(converted)
    }
}

fn take_output(result: &mut TypesetOutput, output_file: Option<&str>) -> Option<Vec<u8>> {
    output_file
        .and_then(|name| result.files.remove(name))
        .filter(|bytes| !bytes.is_empty())
}

fn no_output(result: TypesetOutput) -> ConvertError {
    if result.stderr.trim().is_empty() {
        ConvertError::TypesetterNoOutput
    } else {
        ConvertError::TypesetterFailed(result.stderr)
    }
}

fn classify_load_error(err: EngineLoadError) -> ConvertError {
    ConvertError::EngineLoad {
        engine: "document",
        detail: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{recorder, sample_docx, EchoLoader, EchoTypesetter};
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    fn engine(typesetter: EchoTypesetter) -> (TypesetEngine, Arc<EchoLoader>) {
        let loader = EchoLoader::new(typesetter);
        (TypesetEngine::new(loader.clone()), loader)
    }

    fn txt(text: &str) -> InputFile {
        InputFile::new("notes.txt", "text/plain", text.as_bytes().to_vec())
    }

    #[test]
    fn tables_cover_legacy_aliases() {
        assert_eq!(typeset_input("doc"), typeset_input("docx"));
        assert_eq!(typeset_input("htm"), Some("html"));
        assert_eq!(typeset_input("markdown"), Some("markdown"));
        assert!(typeset_input("pdf").is_none());
        assert!(can_typeset("txt", FormatToken::Docx));
        assert!(!can_typeset("txt", FormatToken::Pdf));
        assert!(!can_typeset("pdf", FormatToken::Html));
    }

    #[test]
    fn every_reader_is_a_pandoc_input_format() {
        // Input formats known to pandoc; `plain` is a writer only.
        const READERS: &[&str] = &["docx", "html", "markdown", "commonmark", "rtf", "odt", "epub", "csv", "tsv"];
        for ext in ["docx", "doc", "html", "htm", "txt", "md", "markdown", "rtf", "odt", "epub", "csv", "tsv"] {
            let reader = typeset_input(ext).unwrap();
            assert!(READERS.contains(&reader), "{ext} maps to unknown reader {reader}");
        }
        assert_eq!(typeset_input("txt"), Some("markdown"));
    }

    #[tokio::test]
    async fn text_to_html_is_styled_and_keeps_content() {
        let (engine, _) = engine(EchoTypesetter::default());
        let (progress, seen) = recorder();
        let out = engine.convert(&txt("Hello World\nLine 2"), FormatToken::Html, &progress).await.unwrap();

        let html = String::from_utf8(out.bytes).unwrap();
        assert!(html.contains("Hello World"));
        assert!(html.contains("<style>"));
        assert_eq!(out.ext, "html");
        assert_eq!(out.mime, "text/html");
        assert_eq!(*seen.lock(), vec![25, 50, 60, 85, 100]);
    }

    #[tokio::test]
    async fn container_targets_come_from_the_output_file() {
        let (engine, loader) = engine(EchoTypesetter::default());
        let out = engine.convert(&txt("Hello"), FormatToken::Docx, &Progress::noop()).await.unwrap();
        assert_eq!(&out.bytes[..2], b"PK");
        assert_eq!(out.mime, format::DOCX_MIME);

        let requests = loader.instance.requests.lock();
        assert_eq!(requests[0].output_file.as_deref(), Some("output.docx"));
        assert_eq!(requests[0].from, "markdown");
    }

    #[tokio::test]
    async fn docx_to_html_embeds_container_images() {
        let (engine, _) = engine(EchoTypesetter::default());
        let file = InputFile::new("report.docx", format::DOCX_MIME, sample_docx());
        let out = engine.convert(&file, FormatToken::Html, &Progress::noop()).await.unwrap();
        let html = String::from_utf8(out.bytes).unwrap();
        assert!(html.contains(r#"src="data:image/png;base64,"#));
        assert!(!html.contains(r#"src="media/image1.png""#));
    }

    #[tokio::test]
    async fn docx_to_markdown_embeds_images_without_stylesheet() {
        let (engine, _) = engine(EchoTypesetter::default());
        let file = InputFile::new("report.docx", format::DOCX_MIME, sample_docx());
        let out = engine.convert(&file, FormatToken::Md, &Progress::noop()).await.unwrap();
        let md = String::from_utf8(out.bytes).unwrap();
        assert!(md.contains("![figure](data:image/png;base64,"));
        assert!(!md.contains("<style>"));
        assert_eq!(out.ext, "md");
    }

    #[tokio::test]
    async fn stderr_without_output_is_a_typesetter_failure() {
        let (engine, _) = engine(EchoTypesetter {
            stderr_only: true,
            ..Default::default()
        });
        let err = engine.convert(&txt("x"), FormatToken::Html, &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::TypesetterFailed(ref m) if m.contains("unknown reader")));
    }

    #[tokio::test]
    async fn empty_output_is_no_output() {
        let (engine, _) = engine(EchoTypesetter::default());
        let err = engine.convert(&txt(""), FormatToken::Txt, &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::TypesetterNoOutput));
    }

    #[tokio::test]
    async fn unsupported_pair_is_rejected_before_loading() {
        let (engine, loader) = engine(EchoTypesetter::default());
        let err = engine.convert(&txt("x"), FormatToken::Mp3, &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedRoute { .. }));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn html_with_media_asks_engine_to_extract_when_container_has_none() {
        let mut media_files = HashMap::new();
        media_files.insert("./media/image1.png".to_string(), b"png".to_vec());
        let (engine, loader) = engine(EchoTypesetter {
            media_files,
            ..Default::default()
        });

        let html = engine.html_with_media(&txt("Hello"), &Progress::noop()).await.unwrap();
        assert!(html.contains(r#"src="data:image/png;base64,"#));
        assert_eq!(loader.instance.requests.lock()[0].extract_media.as_deref(), Some("."));

        let file = InputFile::new("report.docx", format::DOCX_MIME, sample_docx());
        engine.html_with_media(&file, &Progress::noop()).await.unwrap();
        assert_eq!(loader.instance.requests.lock()[1].extract_media, None);
    }

    #[tokio::test]
    async fn html_with_media_needs_a_rendered_document() {
        let (engine, _) = engine(EchoTypesetter {
            silent: true,
            ..Default::default()
        });
        let err = engine.html_with_media(&txt("Hello"), &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::TypesetterNoOutput), "{err:?}");

        let (engine, _) = self::engine(EchoTypesetter {
            stderr_only: true,
            ..Default::default()
        });
        let err = engine.html_with_media(&txt("Hello"), &Progress::noop()).await.unwrap_err();
        assert!(matches!(err, ConvertError::TypesetterFailed(ref s) if s.contains("unknown reader")));
    }

    #[tokio::test]
    async fn html_strings_are_piped_through_stdin() {
        let (engine, loader) = engine(EchoTypesetter::default());
        let out = engine.convert_html("<p>Hi</p>", FormatToken::Odt, &Progress::noop()).await.unwrap();
        assert_eq!(out.ext, "odt");
        assert!(matches!(
            loader.instance.requests.lock()[0].input,
            TypesetInput::Stdin(ref s) if s == "<p>Hi</p>"
        ));
    }

    #[tokio::test]
    async fn failed_load_is_classified_and_retried() {
        let loader = Arc::new(EchoLoader {
            instance: Arc::new(EchoTypesetter::default()),
            loads: Default::default(),
            fail: true,
        });
        let engine = TypesetEngine::new(loader.clone());
        for _ in 0..2 {
            let err = engine.convert(&txt("x"), FormatToken::Html, &Progress::noop()).await.unwrap_err();
            assert!(matches!(err, ConvertError::EngineLoad { engine: "document", .. }));
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }
}
