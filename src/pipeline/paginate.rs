//! DOCX → PDF: render the document paginated, capture each page section and
//! assemble the captures into an A4 PDF.
//!
//! ```text
//! DOCX ──▶ paginated surface ──▶ per-section capture (2×)
//!      ──▶ slice anything taller than one page ──▶ JPEG per page ──▶ PDF
//! ```
//!
//! Each slice fills the page width and is top-aligned, keeping its aspect
//! ratio. Pages are never split inside a section unless the section itself
//! is taller than a page.

use crate::config::ConverterConfig;
use crate::engine::{
    CaptureOptions, CaptureTarget, ContainerRenderOptions, MountedSurface, RenderHost, SurfaceSpec,
};
use crate::error::ConvertError;
use crate::job::{ConversionResult, InputFile};
use crate::pipeline::encode::{encode_rgba, RasterFormat};
use crate::progress::Progress;
use image::{imageops, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A4 in PDF points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

const CONTAINER_CLASS: &str = "docx-pdf";

/// Render a DOCX and return it as a paginated PDF.
pub async fn docx_to_pdf(
    host: &Arc<dyn RenderHost>,
    config: &ConverterConfig,
    file: &InputFile,
    progress: &Progress,
) -> Result<ConversionResult, ConvertError> {
    progress.report(5.0);
    let container = file.bytes.clone();
    progress.report(10.0);

    progress.report(15.0);
    let surface = MountedSurface::container(
        host,
        container,
        SurfaceSpec::bare(config.page_width_px),
        ContainerRenderOptions::paginated(CONTAINER_CLASS),
    )
    .await?;
    progress.report(40.0);

    tokio::time::sleep(Duration::from_millis(config.paginate_settle_ms)).await;
    surface
        .wait_for_images(Duration::from_millis(config.paginate_image_timeout_ms))
        .await;
    progress.report(45.0);

    let options = CaptureOptions::at_scale(config.capture_scale);
    let sections = surface.section_count().await?;
    let mut captures = Vec::with_capacity(sections.max(1));
    if sections > 0 {
        debug!("Capturing {} page sections", sections);
        for i in 0..sections {
            captures.push(surface.capture(CaptureTarget::Section(i), options.clone()).await?);
            progress.report(45.0 + ((i + 1) as f64 / sections as f64 * 30.0).round());
        }
    } else {
        debug!("No page sections; capturing the whole surface");
        captures.push(surface.capture(CaptureTarget::Whole, options).await?);
        progress.report(75.0);
    }
    drop(surface);

    let page_height = config.page_height_device_px();
    let tolerance = config.slice_tolerance_px;
    let pages: Vec<RgbaImage> = captures
        .into_iter()
        .flat_map(|capture| slice_pages(capture, page_height, tolerance))
        .collect();
    progress.report(85.0);

    let quality = config.lossy_quality;
    let page_count = pages.len();
    let bytes = tokio::task::spawn_blocking(move || assemble_pdf(&pages, quality))
        .await
        .map_err(|e| ConvertError::Internal(format!("PDF assembly task panicked: {e}")))??;
    progress.report(95.0);
    progress.done();

    info!("Paginated {} into {} pages ({} bytes)", file.name, page_count, bytes.len());
    Ok(ConversionResult::new(bytes, "application/pdf", "pdf"))
}

/// Split a capture into page-height slices.
///
/// Captures no taller than `page_height + tolerance` are kept whole; the
/// last slice of a taller capture holds whatever remains.
pub fn slice_pages(capture: RgbaImage, page_height: u32, tolerance: u32) -> Vec<RgbaImage> {
    let (width, height) = capture.dimensions();
    if page_height == 0 || height <= page_height.saturating_add(tolerance) {
        return vec![capture];
    }

    let mut slices = Vec::with_capacity(height.div_ceil(page_height) as usize);
    let mut y = 0;
    while y < height {
        let h = page_height.min(height - y);
        slices.push(imageops::crop_imm(&capture, 0, y, width, h).to_image());
        y += page_height;
    }
    slices
}

/// Build an A4 PDF with one JPEG page image per slice.
pub fn assemble_pdf(pages: &[RgbaImage], quality: u8) -> Result<Vec<u8>, ConvertError> {
    if pages.is_empty() {
        return Err(ConvertError::PdfAssembly("no pages captured".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let (width, height) = page.dimensions();
        if width == 0 || height == 0 {
            return Err(ConvertError::PdfAssembly(format!("empty page slice {width}x{height}")));
        }
        let jpeg = encode_rgba(page, RasterFormat::Jpeg, quality)?;
        let image_id = doc.add_object(Object::Stream(image_xobject(jpeg, width, height)));

        let drawn_height = A4_WIDTH_PT * height as f32 / width as f32;
        let content = format!(
            "q {:.2} 0 0 {:.2} 0 {:.2} cm /Im0 Do Q",
            A4_WIDTH_PT,
            drawn_height,
            A4_HEIGHT_PT - drawn_height
        );
        let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("MediaBox", media_box());
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page_dict))));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| ConvertError::PdfAssembly(e.to_string()))?;
    Ok(output)
}

fn image_xobject(jpeg: Vec<u8>, width: u32, height: u32) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    // DCT data is already compressed
    Stream::new(dict, jpeg).with_compression(false)
}

fn media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(A4_WIDTH_PT),
        Object::Real(A4_HEIGHT_PT),
    ])
}
