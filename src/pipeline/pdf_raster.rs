//! PDF → JPG: rasterise every page and stack them into one tall image.

use crate::config::ConverterConfig;
use crate::engine::PdfRasterizer;
use crate::error::ConvertError;
use crate::job::{ConversionResult, InputFile};
use crate::pipeline::encode::{encode_rgba, RasterFormat};
use crate::progress::Progress;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use std::sync::Arc;
use tracing::{debug, info};

/// Rasterise `file` and return the pages as a single JPEG.
///
/// Progress: 10 before rendering, 15 once the page count is known, then up
/// to 85 as pages render. A single page jumps straight to 80.
pub async fn pdf_to_jpg(
    rasterizer: Arc<dyn PdfRasterizer>,
    config: &ConverterConfig,
    file: &InputFile,
    progress: &Progress,
) -> Result<ConversionResult, ConvertError> {
    progress.report(10.0);

    let reporter = progress.clone();
    let on_page = Box::new(move |rendered: usize, total: usize| {
        if rendered == 0 {
            reporter.report(15.0);
        } else if total > 1 {
            reporter.report(15.0 + (rendered as f64 / total as f64 * 70.0).round());
        }
    });
    let pages = rasterizer
        .rasterize(file.bytes.clone(), config.pdf_raster_scale, on_page)
        .await?;
    if pages.is_empty() {
        return Err(ConvertError::CorruptPdf("document has no pages".into()));
    }
    debug!("Rasterised {} pages", pages.len());

    let page_count = pages.len();
    let quality = config.lossy_quality;
    let single = page_count == 1;
    if single {
        progress.report(80.0);
    }
    let bytes = tokio::task::spawn_blocking(move || {
        let image = if single {
            pages.into_iter().next().map(|p| p.into_rgba8()).unwrap_or_default()
        } else {
            stack_pages(pages)
        };
        encode_rgba(&image, RasterFormat::Jpeg, quality)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Encode task panicked: {e}")))??;
    progress.done();

    info!("Rasterised {} ({} pages) → jpg ({} bytes)", file.name, page_count, bytes.len());
    Ok(ConversionResult::new(bytes, RasterFormat::Jpeg.mime(), RasterFormat::Jpeg.ext()))
}

/// Stack pages top to bottom on a white canvas as wide as the widest page.
pub fn stack_pages(pages: Vec<DynamicImage>) -> RgbaImage {
    let width = pages.iter().map(|p| p.width()).max().unwrap_or(0);
    let height = pages.iter().map(|p| p.height()).sum();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    let mut y: i64 = 0;
    for page in pages {
        let h = page.height();
        imageops::overlay(&mut canvas, &page.into_rgba8(), 0, y);
        y += i64::from(h);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PageCallback;
    use crate::pipeline::testing::recorder;
    use futures::future::{BoxFuture, FutureExt};

    struct FakeRasterizer {
        pages: Vec<(u32, u32)>,
    }

    impl PdfRasterizer for FakeRasterizer {
        fn rasterize(
            &self,
            _pdf: Vec<u8>,
            _scale: f32,
            on_page: PageCallback,
        ) -> BoxFuture<'_, Result<Vec<DynamicImage>, ConvertError>> {
            let sizes = self.pages.clone();
            async move {
                let total = sizes.len();
                on_page(0, total);
                let mut out = Vec::new();
                for (i, (w, h)) in sizes.into_iter().enumerate() {
                    out.push(DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))));
                    on_page(i + 1, total);
                }
                Ok(out)
            }
            .boxed()
        }
    }

    fn pdf() -> InputFile {
        InputFile::new("scan.pdf", "application/pdf", b"%PDF-1.7".to_vec())
    }

    #[test]
    fn stacking_uses_widest_page_and_summed_height() {
        let pages = vec![
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 255]))),
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 2, Rgba([0, 0, 0, 255]))),
        ];
        let canvas = stack_pages(pages);
        assert_eq!(canvas.dimensions(), (6, 5));
        assert_eq!(canvas.get_pixel(5, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(5, 4), &Rgba([0, 0, 0, 255]));
    }

    #[tokio::test]
    async fn multi_page_progress_is_proportional() {
        let rasterizer = Arc::new(FakeRasterizer {
            pages: vec![(10, 10), (10, 10)],
        });
        let (progress, seen) = recorder();
        let out = pdf_to_jpg(rasterizer, &ConverterConfig::default(), &pdf(), &progress)
            .await
            .unwrap();
        assert_eq!(out.mime, "image/jpeg");
        assert_eq!(out.ext, "jpg");
        assert!(out.bytes.starts_with(&[0xFF, 0xD8]));
        assert_eq!(*seen.lock(), vec![10, 15, 50, 85, 100]);
    }

    #[tokio::test]
    async fn single_page_reports_eighty_before_encoding() {
        let rasterizer = Arc::new(FakeRasterizer { pages: vec![(8, 8)] });
        let (progress, seen) = recorder();
        pdf_to_jpg(rasterizer, &ConverterConfig::default(), &pdf(), &progress)
            .await
            .unwrap();
        assert_eq!(*seen.lock(), vec![10, 15, 80, 100]);
    }

    #[tokio::test]
    async fn empty_documents_are_rejected() {
        let rasterizer = Arc::new(FakeRasterizer { pages: vec![] });
        let err = pdf_to_jpg(rasterizer, &ConverterConfig::default(), &pdf(), &Progress::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::CorruptPdf(_)));
    }
}
