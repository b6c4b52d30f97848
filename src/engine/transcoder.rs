//! Media transcoder seam (an ffmpeg-style engine with a scratch filesystem).

use crate::error::{ConvertError, EngineLoadError};
use crate::progress::Progress;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Fractional (`0.0..=1.0`) progress reported while a command runs.
pub type FractionCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Which runtime build to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreVariant {
    /// Threaded core; needs shared memory between threads.
    MultiThreaded,
    /// Single-threaded fallback core.
    SingleThreaded,
}

/// A ready transcoder with its own scratch filesystem.
///
/// Callers must serialise use of one instance: file names in the scratch
/// filesystem are shared by every command.
pub trait Transcoder: Send + Sync {
    fn write_file<'a>(&'a self, name: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<(), ConvertError>>;

    /// Run a command; returns the process exit code.
    fn exec<'a>(
        &'a self,
        args: &'a [String],
        on_progress: FractionCallback,
    ) -> BoxFuture<'a, Result<i32, ConvertError>>;

    fn read_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ConvertError>>;

    fn delete_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), ConvertError>>;
}

/// Produces a [`Transcoder`] for a chosen [`CoreVariant`].
pub trait TranscoderLoader: Send + Sync {
    /// Whether the host can share memory between engine threads.
    fn supports_shared_memory(&self) -> bool;

    fn load(
        &self,
        variant: CoreVariant,
        progress: Progress,
    ) -> BoxFuture<'static, Result<Arc<dyn Transcoder>, EngineLoadError>>;
}
