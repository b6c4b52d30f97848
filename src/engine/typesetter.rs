//! Typesetting engine seam (a pandoc-style universal document converter).

use crate::error::{ConvertError, EngineLoadError};
use crate::progress::Progress;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// Where the typesetter reads its input from.
#[derive(Debug, Clone)]
pub enum TypesetInput {
    /// A named file placed in the engine's working filesystem.
    File { name: String, bytes: Vec<u8> },
    /// Text piped through standard input.
    Stdin(String),
}

/// One typesetter invocation, expressed in the engine's own format names.
#[derive(Debug, Clone)]
pub struct TypesetRequest {
    /// Engine input format, e.g. `docx`, `markdown`, `plain`.
    pub from: String,
    /// Engine output format, e.g. `html`, `docx`.
    pub to: String,
    /// Produce a complete document rather than a fragment.
    pub standalone: bool,
    pub input: TypesetInput,
    /// When set, the output is written to this file instead of stdout.
    pub output_file: Option<String>,
    /// When set, embedded media is extracted under this directory.
    pub extract_media: Option<String>,
}

/// Everything the engine produced for one request.
#[derive(Debug, Clone, Default)]
pub struct TypesetOutput {
    pub stdout: String,
    pub stderr: String,
    /// Output files keyed by the name requested in `output_file`.
    pub files: HashMap<String, Vec<u8>>,
    /// Media extracted by the engine, keyed by the path it was written to.
    pub media_files: HashMap<String, Vec<u8>>,
}

/// A ready typesetting engine.
pub trait Typesetter: Send + Sync {
    fn convert(&self, request: TypesetRequest) -> BoxFuture<'_, Result<TypesetOutput, ConvertError>>;
}

/// Produces a [`Typesetter`], reporting load progress on a 0–100 scale.
pub trait TypesetterLoader: Send + Sync {
    fn load(
        &self,
        progress: Progress,
    ) -> BoxFuture<'static, Result<Arc<dyn Typesetter>, EngineLoadError>>;
}
