//! Off-screen layout/render host seam and its scoped surface guard.
//!
//! A [`RenderHost`] lays out HTML (or a document container such as DOCX) on
//! an off-screen surface and captures it to an RGBA bitmap. There is no
//! native implementation in this crate: embedders with a layout engine
//! (a headless browser, a webview) supply one.
//!
//! Surfaces are only ever held through [`MountedSurface`], whose `Drop`
//! unmounts the surface on every exit path, including early returns, `?`
//! propagation and future cancellation.

use crate::error::ConvertError;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Opaque handle to one mounted surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Geometry and base style of an off-screen surface.
///
/// The surface is laid out (never display-suppressed) but positioned where
/// the user cannot see it.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    pub width_px: u32,
    pub padding_px: u32,
    pub background: String,
    pub font_family: String,
    pub font_size_px: u32,
    pub line_height: f32,
    pub color: String,
}

impl SurfaceSpec {
    /// Surface for HTML screenshots: page width plus padding and base typography.
    pub fn document(width_px: u32) -> Self {
        Self {
            width_px,
            padding_px: 40,
            background: "#ffffff".into(),
            font_family: "'Segoe UI', Tahoma, Geneva, Verdana, sans-serif".into(),
            font_size_px: 14,
            line_height: 1.6,
            color: "#1a1a1a".into(),
        }
    }

    /// Bare surface for container rendering, which brings its own styles.
    pub fn bare(width_px: u32) -> Self {
        Self {
            padding_px: 0,
            ..Self::document(width_px)
        }
    }
}

/// Options handed to the host's document-container renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRenderOptions {
    /// Class applied to each rendered page section.
    pub class_name: String,
    pub in_wrapper: bool,
    pub break_pages: bool,
    pub ignore_last_rendered_page_break: bool,
    pub ignore_width: bool,
    pub ignore_height: bool,
    pub ignore_fonts: bool,
    /// Embed images as data URIs instead of object URLs.
    pub use_base64_url: bool,
    pub render_headers: bool,
    pub render_footers: bool,
    pub render_footnotes: bool,
    pub render_endnotes: bool,
    pub render_changes: bool,
    pub render_comments: bool,
}

impl ContainerRenderOptions {
    /// Options for paginated PDF output: page sections with native breaks.
    pub fn paginated(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            in_wrapper: false,
            break_pages: true,
            ignore_last_rendered_page_break: true,
            ignore_width: false,
            ignore_height: false,
            ignore_fonts: false,
            use_base64_url: true,
            render_headers: true,
            render_footers: true,
            render_footnotes: true,
            render_endnotes: true,
            render_changes: false,
            render_comments: false,
        }
    }
}

/// What part of a surface to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    /// The whole surface at its full scroll size.
    Whole,
    /// The n-th page section (0-based).
    Section(usize),
}

/// Rasterisation options for a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Device-pixel scale.
    pub scale: f32,
    pub background: String,
    /// Permit data-URI images to be drawn.
    pub allow_data_uris: bool,
    /// Treat embedded resources as same-origin.
    pub same_origin: bool,
}

impl CaptureOptions {
    pub fn at_scale(scale: f32) -> Self {
        Self {
            scale,
            background: "#ffffff".into(),
            allow_data_uris: true,
            same_origin: true,
        }
    }
}

/// An off-screen layout engine.
///
/// A failed `mount_*` must leave nothing mounted.
pub trait RenderHost: Send + Sync {
    /// Mount HTML markup on a new surface.
    fn mount_html(&self, markup: String, spec: SurfaceSpec) -> BoxFuture<'_, Result<SurfaceId, ConvertError>>;

    /// Render a document container (e.g. DOCX bytes) onto a new surface.
    fn mount_container(
        &self,
        container: Vec<u8>,
        spec: SurfaceSpec,
        options: ContainerRenderOptions,
    ) -> BoxFuture<'_, Result<SurfaceId, ConvertError>>;

    /// Number of page sections on the surface (0 for continuous flow).
    fn section_count(&self, surface: SurfaceId) -> BoxFuture<'_, Result<usize, ConvertError>>;

    /// Resolves once every image on the surface has loaded or failed.
    fn images_settled(&self, surface: SurfaceId) -> BoxFuture<'_, ()>;

    fn capture(
        &self,
        surface: SurfaceId,
        target: CaptureTarget,
        options: CaptureOptions,
    ) -> BoxFuture<'_, Result<RgbaImage, ConvertError>>;

    /// Remove the surface. Must not fail.
    fn unmount(&self, surface: SurfaceId);
}

/// A mounted surface that is unmounted when dropped.
pub struct MountedSurface {
    host: Arc<dyn RenderHost>,
    id: SurfaceId,
}

impl MountedSurface {
    pub async fn html(
        host: &Arc<dyn RenderHost>,
        markup: String,
        spec: SurfaceSpec,
    ) -> Result<Self, ConvertError> {
        let id = host.mount_html(markup, spec).await?;
        debug!("Mounted HTML on {}", id);
        Ok(Self {
            host: Arc::clone(host),
            id,
        })
    }

    pub async fn container(
        host: &Arc<dyn RenderHost>,
        container: Vec<u8>,
        spec: SurfaceSpec,
        options: ContainerRenderOptions,
    ) -> Result<Self, ConvertError> {
        let id = host.mount_container(container, spec, options).await?;
        debug!("Mounted document container on {}", id);
        Ok(Self {
            host: Arc::clone(host),
            id,
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Wait for images, giving up silently after `timeout`.
    pub async fn wait_for_images(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.host.images_settled(self.id))
            .await
            .is_err()
        {
            debug!("Image wait on {} timed out after {:?}", self.id, timeout);
        }
    }

    pub async fn section_count(&self) -> Result<usize, ConvertError> {
        self.host.section_count(self.id).await
    }

    pub async fn capture(
        &self,
        target: CaptureTarget,
        options: CaptureOptions,
    ) -> Result<RgbaImage, ConvertError> {
        self.host.capture(self.id, target, options).await
    }
}

impl Drop for MountedSurface {
    fn drop(&mut self) {
        debug!("Unmounting {}", self.id);
        self.host.unmount(self.id);
    }
}
