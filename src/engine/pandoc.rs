//! Native typesetter: a pandoc executable driven through `tokio::process`.
//!
//! Each request runs in a fresh temporary directory that plays the role of
//! the engine's virtual filesystem: the input file is written there, the
//! output file and any extracted media are read back from it.

use crate::config::ConverterConfig;
use crate::engine::typesetter::{TypesetInput, TypesetOutput, TypesetRequest, Typesetter, TypesetterLoader};
use crate::error::{ConvertError, EngineLoadError};
use crate::progress::Progress;
use futures::future::{BoxFuture, FutureExt};
use localconv_runtime::{self as runtime, Packaging};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Locates (or downloads) pandoc and verifies it starts.
#[derive(Debug, Clone)]
pub struct PandocLoader {
    path: Option<PathBuf>,
    version: String,
    url: Option<String>,
    timeout: Duration,
}

impl PandocLoader {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            path: config.typesetter_path.clone(),
            version: config.typesetter_version.clone(),
            url: config.typesetter_url.clone(),
            timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }

    async fn resolve_binary(&self, progress: &Progress) -> Result<PathBuf, EngineLoadError> {
        if let Some(path) = &self.path {
            return if is_file(path).await {
                Ok(path.clone())
            } else {
                Err(EngineLoadError::Fetch(format!(
                    "configured pandoc not found at {}",
                    path.display()
                )))
            };
        }

        progress.report(8.0);
        if let Some(found) = runtime::find_program("pandoc") {
            debug!("Found pandoc on PATH: {}", found.display());
            return Ok(found);
        }

        let mut asset = runtime::pandoc_asset(&self.version)?;
        if let Some(url) = &self.url {
            asset.packaging = Packaging::from_url(url);
            asset.url = url.clone();
        }

        // Download share of the load: 8–70 %, or one coarse checkpoint when
        // the server sends no length.
        let coarse_sent = AtomicBool::new(false);
        let on_bytes: runtime::DownloadProgress<'_> = &|received, total| match total {
            Some(total) if total > 0 => {
                progress.report(8.0 + (received as f64 / total as f64) * 62.0);
            }
            _ => {
                if !coarse_sent.swap(true, Ordering::Relaxed) {
                    progress.report(35.0);
                }
            }
        };

        let path = runtime::ensure_installed(&asset, self.timeout, Some(on_bytes)).await?;
        Ok(path)
    }
}

impl TypesetterLoader for PandocLoader {
    fn load(
        &self,
        progress: Progress,
    ) -> BoxFuture<'static, Result<Arc<dyn Typesetter>, EngineLoadError>> {
        let this = self.clone();
        async move {
            progress.report(5.0);
            let binary = this.resolve_binary(&progress).await?;
            progress.report(75.0);

            let version = probe_version(&binary).await?;
            info!("Typesetter ready: {} ({})", version, binary.display());
            progress.report(95.0);

            Ok(Arc::new(PandocProcess { binary }) as Arc<dyn Typesetter>)
        }
        .boxed()
    }
}

async fn probe_version(binary: &Path) -> Result<String, EngineLoadError> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| EngineLoadError::Instantiate(format!("{}: {e}", binary.display())))?;

    if !output.status.success() {
        return Err(EngineLoadError::Instantiate(format!(
            "{} --version exited with {}",
            binary.display(),
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or("pandoc").trim().to_string())
}

/// A resolved pandoc executable.
#[derive(Debug, Clone)]
pub struct PandocProcess {
    binary: PathBuf,
}

impl PandocProcess {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, request: TypesetRequest) -> Result<TypesetOutput, ConvertError> {
        let args = build_args(&request)?;
        let workdir = scratch_dir().await?;
        let result = self.run_in(workdir.path(), args, request).await;
        // Removing the tree walks the filesystem; keep it off the runtime.
        tokio::task::spawn_blocking(move || drop(workdir));
        result
    }

    async fn run_in(
        &self,
        workdir: &Path,
        args: Vec<String>,
        request: TypesetRequest,
    ) -> Result<TypesetOutput, ConvertError> {

        let stdin_text = match &request.input {
            TypesetInput::File { name, bytes } => {
                tokio::fs::write(workdir.join(name), bytes).await?;
                None
            }
            TypesetInput::Stdin(text) => Some(text.clone()),
        };

        debug!("pandoc {}", args.join(" "));
        let mut child = Command::new(&self.binary)
            .args(&args)
            .current_dir(workdir)
            .stdin(if stdin_text.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(text), Some(mut stdin)) = (stdin_text, child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    warn!("Failed to feed pandoc stdin: {}", e);
                }
            });
        }

        let output = child.wait_with_output().await?;
        let mut result = TypesetOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            ..Default::default()
        };

        if !output.status.success() {
            warn!("pandoc exited with {}", output.status);
            if result.stderr.trim().is_empty() {
                result.stderr = format!("pandoc exited with {}", output.status);
            }
            result.stdout.clear();
            return Ok(result);
        }

        if let Some(name) = &request.output_file {
            let path = workdir.join(name);
            if is_file(&path).await {
                result.files.insert(name.clone(), tokio::fs::read(&path).await?);
            }
        }

        if request.extract_media.is_some() {
            let mut skip: Vec<&str> = request.output_file.iter().map(String::as_str).collect();
            if let TypesetInput::File { name, .. } = &request.input {
                skip.push(name);
            }
            result.media_files = collect_files(workdir, &skip).await?;
        }

        Ok(result)
    }
}

impl Typesetter for PandocProcess {
    fn convert(&self, request: TypesetRequest) -> BoxFuture<'_, Result<TypesetOutput, ConvertError>> {
        self.run(request).boxed()
    }
}

/// A fresh per-request working directory, created off the async runtime.
async fn scratch_dir() -> Result<tempfile::TempDir, ConvertError> {
    tokio::task::spawn_blocking(tempfile::tempdir)
        .await
        .map_err(|e| ConvertError::Internal(format!("scratch dir task failed: {e}")))?
        .map_err(ConvertError::from)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Command-line arguments for one request. File names must be plain names.
pub(crate) fn build_args(request: &TypesetRequest) -> Result<Vec<String>, ConvertError> {
    let mut args = vec![format!("--from={}", request.from), format!("--to={}", request.to)];
    if request.standalone {
        args.push("--standalone".into());
    }
    if let Some(out) = &request.output_file {
        ensure_plain_name(out)?;
        args.push(format!("--output={out}"));
    }
    if let Some(dir) = &request.extract_media {
        args.push(format!("--extract-media={dir}"));
    }
    if let TypesetInput::File { name, .. } = &request.input {
        ensure_plain_name(name)?;
        args.push(name.clone());
    }
    Ok(args)
}

fn ensure_plain_name(name: &str) -> Result<(), ConvertError> {
    let plain = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != "..";
    if plain {
        Ok(())
    } else {
        Err(ConvertError::Internal(format!(
            "scratch file name must be a plain file name, got '{name}'"
        )))
    }
}

/// Every file under `root` except `skip`, keyed by its `/`-separated relative path.
async fn collect_files(root: &Path, skip: &[&str]) -> Result<HashMap<String, Vec<u8>>, ConvertError> {
    let mut files = HashMap::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
                continue;
            }
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if skip.contains(&key.as_str()) {
                continue;
            }
            files.insert(key, tokio::fs::read(&path).await?);
        }
    }

    Ok(files)
}
