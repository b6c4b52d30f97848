//! Heavy conversion engines and their lazily-loaded shared handles.
//!
//! Each engine is a trait seam with a loader trait beside it:
//!
//! | Seam | Loader | Native implementation |
//! |------|--------|-----------------------|
//! | [`Typesetter`] | [`TypesetterLoader`] | [`pandoc::PandocLoader`] |
//! | [`Transcoder`] | [`TranscoderLoader`] | [`ffmpeg::FfmpegLoader`] |
//! | [`PdfRasterizer`] | [`PdfRasterizerLoader`] | [`pdfium::PdfiumLoader`] |
//! | [`RenderHost`] | supplied by the embedder | none |
//!
//! Loaded engines live in a [`LazyEngine`]: the first caller starts the load,
//! concurrent callers attach to the same in-flight future, and a failed load
//! resets the slot so the next call retries from scratch.

pub mod ffmpeg;
pub mod pandoc;
pub mod pdfium;
pub mod rasterizer;
pub mod render_host;
pub mod transcoder;
pub mod typesetter;

pub use rasterizer::{PageCallback, PdfRasterizer, PdfRasterizerLoader};
pub use render_host::{
    CaptureOptions, CaptureTarget, ContainerRenderOptions, MountedSurface, RenderHost, SurfaceId,
    SurfaceSpec,
};
pub use transcoder::{CoreVariant, FractionCallback, Transcoder, TranscoderLoader};
pub use typesetter::{TypesetInput, TypesetOutput, TypesetRequest, Typesetter, TypesetterLoader};

use crate::error::EngineLoadError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Future returned by every engine loader.
pub type LoadFuture<T> = BoxFuture<'static, Result<Arc<T>, EngineLoadError>>;

enum Slot<T: ?Sized> {
    Unloaded,
    Loading(Shared<LoadFuture<T>>),
    Ready(Arc<T>),
}

/// A lazily-initialised, shared engine handle.
///
/// States: `Unloaded` → `Loading(shared future)` → `Ready(handle)`, with
/// `Loading` → `Unloaded` on failure.
pub struct LazyEngine<T: ?Sized> {
    name: &'static str,
    slot: Mutex<Slot<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> LazyEngine<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(Slot::Unloaded),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Loading(_))
    }

    /// Return the ready engine, or start/join a load.
    ///
    /// `load` is only invoked when the slot is `Unloaded`.
    pub async fn get_or_load<F>(&self, load: F) -> Result<Arc<T>, EngineLoadError>
    where
        F: FnOnce() -> LoadFuture<T>,
    {
        let pending = match self.attach(load) {
            Ok(ready) => return Ok(ready),
            Err(pending) => pending,
        };

        let result = pending.clone().await;

        let mut slot = self.slot.lock();
        let still_current = matches!(&*slot, Slot::Loading(current) if current.ptr_eq(&pending));
        if still_current {
            match &result {
                Ok(engine) => {
                    debug!("{} engine ready", self.name);
                    *slot = Slot::Ready(Arc::clone(engine));
                }
                Err(e) => {
                    warn!("{} engine failed to load: {}", self.name, e);
                    *slot = Slot::Unloaded;
                }
            }
        }
        result
    }

    /// Drop a ready engine so the next call reloads it.
    pub fn reset(&self) {
        *self.slot.lock() = Slot::Unloaded;
    }

    fn attach<F>(&self, load: F) -> Result<Arc<T>, Shared<LoadFuture<T>>>
    where
        F: FnOnce() -> LoadFuture<T>,
    {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Ready(engine) => return Ok(Arc::clone(engine)),
            Slot::Loading(pending) => return Err(pending.clone()),
            Slot::Unloaded => {}
        }
        debug!("Loading {} engine", self.name);
        let pending = load().shared();
        *slot = Slot::Loading(pending.clone());
        Err(pending)
    }
}
