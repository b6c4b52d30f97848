//! Native transcoder: an ffmpeg executable with a temp-dir scratch filesystem.
//!
//! Progress comes from `-progress pipe:1`: ffmpeg prints `out_time_us=…`
//! lines on stdout, which are divided by the input duration parsed from the
//! `Duration: HH:MM:SS.xx` banner on stderr.

use crate::config::ConverterConfig;
use crate::engine::transcoder::{CoreVariant, FractionCallback, Transcoder, TranscoderLoader};
use crate::error::{ConvertError, EngineLoadError};
use crate::progress::Progress;
use futures::future::{BoxFuture, FutureExt};
use localconv_runtime::{self as runtime, RuntimeAsset};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid regex"));

/// Locates (or downloads) ffmpeg for the requested core variant.
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    path: Option<PathBuf>,
    mt_url: Option<String>,
    st_url: Option<String>,
    shared_memory: Option<bool>,
    timeout: Duration,
}

impl FfmpegLoader {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            path: config.transcoder_path.clone(),
            mt_url: config.transcoder_mt_url.clone(),
            st_url: config.transcoder_st_url.clone(),
            shared_memory: config.shared_memory,
            timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }

    async fn resolve_binary(&self, variant: CoreVariant) -> Result<PathBuf, EngineLoadError> {
        if let Some(path) = &self.path {
            let is_file = tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false);
            return if is_file {
                Ok(path.clone())
            } else {
                Err(EngineLoadError::Fetch(format!(
                    "configured ffmpeg not found at {}",
                    path.display()
                )))
            };
        }

        let url = match variant {
            CoreVariant::MultiThreaded => self.mt_url.as_ref(),
            CoreVariant::SingleThreaded => self.st_url.as_ref(),
        };

        if let Some(url) = url {
            let name = match variant {
                CoreVariant::MultiThreaded => "ffmpeg-mt",
                CoreVariant::SingleThreaded => "ffmpeg-st",
            };
            let file = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
            let asset = RuntimeAsset::new(name, "custom", url.clone(), file)
                .member(file)
                .executable(true);
            return Ok(runtime::ensure_installed(&asset, self.timeout, None).await?);
        }

        runtime::find_program("ffmpeg").ok_or_else(|| {
            EngineLoadError::Fetch(
                "ffmpeg not found on PATH and no download URL configured".into(),
            )
        })
    }
}

impl TranscoderLoader for FfmpegLoader {
    fn supports_shared_memory(&self) -> bool {
        self.shared_memory.unwrap_or(true)
    }

    fn load(
        &self,
        variant: CoreVariant,
        progress: Progress,
    ) -> BoxFuture<'static, Result<Arc<dyn Transcoder>, EngineLoadError>> {
        let this = self.clone();
        async move {
            if variant == CoreVariant::MultiThreaded && !this.supports_shared_memory() {
                return Err(EngineLoadError::SharedMemoryUnavailable(
                    "multi-threaded core requested without shared memory".into(),
                ));
            }

            let binary = this.resolve_binary(variant).await?;
            progress.report(50.0);

            let banner = probe_version(&binary).await?;
            info!("Transcoder ready: {} ({:?})", banner, variant);
            progress.done();

            let scratch = tokio::task::spawn_blocking(tempfile::tempdir)
                .await
                .map_err(|e| EngineLoadError::Instantiate(format!("scratch dir task: {e}")))?
                .map_err(|e| EngineLoadError::Instantiate(format!("scratch dir: {e}")))?;
            Ok(Arc::new(FfmpegProcess {
                binary,
                variant,
                scratch,
            }) as Arc<dyn Transcoder>)
        }
        .boxed()
    }
}

async fn probe_version(binary: &Path) -> Result<String, EngineLoadError> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| EngineLoadError::Instantiate(format!("{}: {e}", binary.display())))?;

    if !output.status.success() {
        return Err(EngineLoadError::Instantiate(format!(
            "{} -version exited with {}",
            binary.display(),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("ffmpeg")
        .to_string())
}

/// A loaded ffmpeg with its own scratch directory.
#[derive(Debug)]
pub struct FfmpegProcess {
    binary: PathBuf,
    variant: CoreVariant,
    scratch: TempDir,
}

impl FfmpegProcess {
    fn scratch_path(&self, name: &str) -> Result<PathBuf, ConvertError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConvertError::Internal(format!(
                "scratch file name must be a plain file name, got '{name}'"
            )));
        }
        Ok(self.scratch.path().join(name))
    }

    /// Full argument list: quiet/overwrite/progress prefix, then the
    /// caller's arguments with the thread limit placed before the output.
    fn full_args(&self, args: &[String]) -> Vec<String> {
        let mut full: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-nostats", "-progress", "pipe:1"]
            .into_iter()
            .map(String::from)
            .collect();

        match (self.variant, args.split_last()) {
            (CoreVariant::SingleThreaded, Some((output, rest))) => {
                full.extend(rest.iter().cloned());
                full.push("-threads".into());
                full.push("1".into());
                full.push(output.clone());
            }
            _ => full.extend(args.iter().cloned()),
        }
        full
    }

    async fn run(&self, args: &[String], on_progress: FractionCallback) -> Result<i32, ConvertError> {
        let full = self.full_args(args);
        debug!("ffmpeg {}", full.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&full)
            .current_dir(self.scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let duration_us = AtomicU64::new(0);

        let read_stderr = async {
            let mut tail = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(us) = parse_duration_us(&line) {
                        duration_us.store(us, Ordering::Relaxed);
                    }
                    tail.push(line);
                    if tail.len() > 20 {
                        tail.remove(0);
                    }
                }
            }
            tail
        };

        let read_stdout = async {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim() == "progress=end" {
                        on_progress(1.0);
                    } else if let Some(done) = parse_out_time_us(&line) {
                        let total = duration_us.load(Ordering::Relaxed);
                        if total > 0 {
                            on_progress((done as f64 / total as f64).clamp(0.0, 1.0));
                        }
                    }
                }
            }
        };

        let (status, tail, ()) = tokio::join!(child.wait(), read_stderr, read_stdout);
        let status = status?;
        let code = status.code().unwrap_or(-1);
        if code != 0 {
            warn!("ffmpeg exited with {}: {}", code, tail.join(" | "));
        }
        Ok(code)
    }
}

impl Transcoder for FfmpegProcess {
    fn write_file<'a>(&'a self, name: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<(), ConvertError>> {
        async move {
            let path = self.scratch_path(name)?;
            tokio::fs::write(path, data).await?;
            Ok(())
        }
        .boxed()
    }

    fn exec<'a>(
        &'a self,
        args: &'a [String],
        on_progress: FractionCallback,
    ) -> BoxFuture<'a, Result<i32, ConvertError>> {
        self.run(args, on_progress).boxed()
    }

    fn read_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ConvertError>> {
        async move {
            let path = self.scratch_path(name)?;
            Ok(tokio::fs::read(path).await?)
        }
        .boxed()
    }

    fn delete_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), ConvertError>> {
        async move {
            let path = self.scratch_path(name)?;
            match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        }
        .boxed()
    }
}

/// Input duration in microseconds from an ffmpeg `Duration:` banner line.
pub(crate) fn parse_duration_us(line: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(((hours * 3600.0 + minutes * 60.0 + seconds) * 1_000_000.0).round() as u64)
}

/// Microseconds processed from a `-progress` key/value line.
pub(crate) fn parse_out_time_us(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // ffmpeg reports microseconds under both keys.
        "out_time_us" | "out_time_ms" => value.parse().ok(),
        _ => None,
    }
}
