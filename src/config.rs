//! Configuration for the conversion engines.
//!
//! All tunable behaviour lives in [`ConverterConfig`], built via
//! [`ConverterConfigBuilder`]. Defaults reproduce the reference rendering
//! geometry (A4 at 96 DPI, 2× capture) and the quality factor used by every
//! lossy encoder.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by every engine a [`crate::Converter`] owns.
///
/// # Example
/// ```rust
/// use localconv::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .lossy_quality(85)
///     .capture_scale(1.5)
///     .build()
///     .unwrap();
/// assert_eq!(config.lossy_quality, 85);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Quality factor for lossy encoders (JPEG), 1–100. Default: 92.
    pub lossy_quality: u8,

    /// Off-screen page width in CSS pixels. Default: 794 (A4 at 96 DPI).
    pub page_width_px: u32,

    /// Page height in CSS pixels used to slice paginated captures. Default: 1123.
    pub page_height_px: u32,

    /// Device-pixel scale for DOM captures. Default: 2.0.
    pub capture_scale: f32,

    /// Extra pixels a capture may exceed one page before a second slice. Default: 10.
    pub slice_tolerance_px: u32,

    /// Bounded image-decode wait for the screenshot route. Default: 5000 ms.
    pub screenshot_image_timeout_ms: u64,

    /// Layout settle delay after images load (screenshot route). Default: 200 ms.
    pub screenshot_settle_ms: u64,

    /// Bounded image-decode wait for the DOCX → PDF route. Default: 3000 ms.
    pub paginate_image_timeout_ms: u64,

    /// Settle delay after the container render (DOCX → PDF route). Default: 300 ms.
    pub paginate_settle_ms: u64,

    /// Page scale for PDF rasterisation. Default: 2.0.
    pub pdf_raster_scale: f32,

    /// Explicit pandoc executable. Default: look on `PATH`, then download.
    pub typesetter_path: Option<PathBuf>,

    /// Pandoc release fetched when no executable is found. Default: 3.6.
    pub typesetter_version: String,

    /// Override for the pandoc download URL.
    pub typesetter_url: Option<String>,

    /// Explicit ffmpeg executable. Default: look on `PATH`.
    pub transcoder_path: Option<PathBuf>,

    /// Download URL of the multi-threaded transcoder build, if any.
    pub transcoder_mt_url: Option<String>,

    /// Download URL of the single-threaded transcoder build, if any.
    pub transcoder_st_url: Option<String>,

    /// Force the shared-memory probe result. `None` probes the host.
    pub shared_memory: Option<bool>,

    /// Explicit pdfium library. Default: `PDFIUM_LIB_PATH`, system, download.
    pub pdfium_path: Option<PathBuf>,

    /// Timeout for runtime downloads in seconds. Default: 300.
    pub download_timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            lossy_quality: 92,
            page_width_px: 794,
            page_height_px: 1123,
            capture_scale: 2.0,
            slice_tolerance_px: 10,
            screenshot_image_timeout_ms: 5000,
            screenshot_settle_ms: 200,
            paginate_image_timeout_ms: 3000,
            paginate_settle_ms: 300,
            pdf_raster_scale: 2.0,
            typesetter_path: None,
            typesetter_version: localconv_runtime::PANDOC_VERSION.to_string(),
            typesetter_url: None,
            transcoder_path: None,
            transcoder_mt_url: None,
            transcoder_st_url: None,
            shared_memory: None,
            pdfium_path: None,
            download_timeout_secs: 300,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Page height in device pixels at the capture scale.
    pub fn page_height_device_px(&self) -> u32 {
        (self.page_height_px as f32 * self.capture_scale).round() as u32
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn lossy_quality(mut self, q: u8) -> Self {
        self.config.lossy_quality = q.clamp(1, 100);
        self
    }

    pub fn page_width_px(mut self, px: u32) -> Self {
        self.config.page_width_px = px;
        self
    }

    pub fn page_height_px(mut self, px: u32) -> Self {
        self.config.page_height_px = px;
        self
    }

    pub fn capture_scale(mut self, scale: f32) -> Self {
        self.config.capture_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn slice_tolerance_px(mut self, px: u32) -> Self {
        self.config.slice_tolerance_px = px;
        self
    }

    pub fn screenshot_image_timeout_ms(mut self, ms: u64) -> Self {
        self.config.screenshot_image_timeout_ms = ms;
        self
    }

    pub fn screenshot_settle_ms(mut self, ms: u64) -> Self {
        self.config.screenshot_settle_ms = ms;
        self
    }

    pub fn paginate_image_timeout_ms(mut self, ms: u64) -> Self {
        self.config.paginate_image_timeout_ms = ms;
        self
    }

    pub fn paginate_settle_ms(mut self, ms: u64) -> Self {
        self.config.paginate_settle_ms = ms;
        self
    }

    pub fn pdf_raster_scale(mut self, scale: f32) -> Self {
        self.config.pdf_raster_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn typesetter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.typesetter_path = Some(path.into());
        self
    }

    pub fn typesetter_version(mut self, version: impl Into<String>) -> Self {
        self.config.typesetter_version = version.into();
        self
    }

    pub fn typesetter_url(mut self, url: impl Into<String>) -> Self {
        self.config.typesetter_url = Some(url.into());
        self
    }

    pub fn transcoder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.transcoder_path = Some(path.into());
        self
    }

    pub fn transcoder_mt_url(mut self, url: impl Into<String>) -> Self {
        self.config.transcoder_mt_url = Some(url.into());
        self
    }

    pub fn transcoder_st_url(mut self, url: impl Into<String>) -> Self {
        self.config.transcoder_st_url = Some(url.into());
        self
    }

    pub fn shared_memory(mut self, available: bool) -> Self {
        self.config.shared_memory = Some(available);
        self
    }

    pub fn pdfium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.page_width_px < 100 || c.page_height_px < 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "Page size must be at least 100×100 px, got {}×{}",
                c.page_width_px, c.page_height_px
            )));
        }
        if c.slice_tolerance_px >= c.page_height_px {
            return Err(ConvertError::InvalidConfig(format!(
                "Slice tolerance ({} px) must be smaller than the page height ({} px)",
                c.slice_tolerance_px, c.page_height_px
            )));
        }
        if c.typesetter_version.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Typesetter version must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Download timeout must be ≥ 1 s".into(),
            ));
        }
        Ok(self.config)
    }
}
