//! # localconv-runtime
//!
//! Download, cache and unpack the heavy runtimes behind the `localconv`
//! engines: the pandoc typesetter, the pdfium rasteriser and (optionally) an
//! ffmpeg build for the media transcoder.
//!
//! ## How it works
//!
//! On first call to [`ensure_installed`] for a [`RuntimeAsset`]:
//!
//! 1. Checks `{cache}/{name}-{version}/` for the unpacked file.
//! 2. If absent, downloads the asset into memory, reporting
//!    `(received, total)` after every chunk.
//! 3. Extracts the wanted member (`.tar.gz` / `.tgz` / `.zip`) or keeps the
//!    raw bytes, writes them to a temp file and renames it into place.
//!
//! Later calls touch the network only if the cache was removed.
//!
//! ## Environment variable overrides
//!
//! - `LOCALCONV_CACHE_DIR` — override the default cache directory.
//! - `PDFIUM_LIB_PATH` — path to an existing pdfium library; skips download.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info};

// ── Public constants ─────────────────────────────────────────────────────────

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// Default pandoc release fetched when no local executable is found.
pub const PANDOC_VERSION: &str = "3.6";

const PDFIUM_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";
const PANDOC_BASE_URL: &str = "https://github.com/jgm/pandoc/releases/download";

/// Download progress callback: `(bytes_received, total_bytes_if_known)`.
pub type DownloadProgress<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while resolving a runtime asset.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The current OS/architecture combination has no published asset.
    #[error("Unsupported platform for {runtime}: {os}/{arch}")]
    UnsupportedPlatform {
        runtime: String,
        os: String,
        arch: String,
    },

    /// Could not create or write inside the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// gzip/tar/zip extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),
}

// ── Asset description ────────────────────────────────────────────────────────

/// How the downloaded bytes are packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// The download is the file itself.
    Raw,
    /// Gzipped tarball; one member is extracted.
    TarGz,
    /// Zip archive; one member is extracted.
    Zip,
}

impl Packaging {
    /// Infer packaging from the download URL.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Packaging::TarGz
        } else if lower.ends_with(".zip") {
            Packaging::Zip
        } else {
            Packaging::Raw
        }
    }
}

/// A downloadable runtime file and where it lives once unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeAsset {
    /// Short runtime name, used for the cache sub-directory.
    pub name: String,
    /// Version tag, used for the cache sub-directory.
    pub version: String,
    /// Download URL.
    pub url: String,
    /// Packaging of the download.
    pub packaging: Packaging,
    /// Path suffix of the wanted archive member, e.g. `bin/pandoc`.
    pub member: Option<String>,
    /// File name written to the cache directory.
    pub file_name: String,
    /// Mark the unpacked file executable (unix only).
    pub executable: bool,
}

impl RuntimeAsset {
    /// Describe an asset; packaging is inferred from `url`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            version: version.into(),
            packaging: Packaging::from_url(&url),
            url,
            member: None,
            file_name: file_name.into(),
            executable: false,
        }
    }

    pub fn member(mut self, suffix: impl Into<String>) -> Self {
        self.member = Some(suffix.into());
        self
    }

    pub fn executable(mut self, yes: bool) -> Self {
        self.executable = yes;
        self
    }

    /// Directory this asset is unpacked into.
    pub fn install_dir(&self) -> PathBuf {
        cache_root().join(format!("{}-{}", self.name, self.version))
    }

    /// Final on-disk path of the unpacked file.
    pub fn install_path(&self) -> PathBuf {
        self.install_dir().join(&self.file_name)
    }
}

// ── Platform tables ──────────────────────────────────────────────────────────

/// The pdfium shared library for the running platform.
pub fn pdfium_asset() -> Result<RuntimeAsset, RuntimeError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    let (archive, member, lib) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        (os, arch) => {
            return Err(RuntimeError::UnsupportedPlatform {
                runtime: "pdfium".into(),
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };

    let url = format!("{PDFIUM_BASE_URL}/chromium%2F{PDFIUM_VERSION}/{archive}");
    Ok(RuntimeAsset::new("pdfium", PDFIUM_VERSION, url, lib).member(member))
}

/// The pandoc executable for the running platform.
pub fn pandoc_asset(version: &str) -> Result<RuntimeAsset, RuntimeError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    let (archive, member, file) = match (os, arch) {
        ("linux", "x86_64") => (format!("pandoc-{version}-linux-amd64.tar.gz"), "bin/pandoc", "pandoc"),
        ("linux", "aarch64") => (format!("pandoc-{version}-linux-arm64.tar.gz"), "bin/pandoc", "pandoc"),
        ("macos", "aarch64") => (format!("pandoc-{version}-arm64-macOS.zip"), "bin/pandoc", "pandoc"),
        ("macos", "x86_64") => (format!("pandoc-{version}-x86_64-macOS.zip"), "bin/pandoc", "pandoc"),
        ("windows", "x86_64") => (format!("pandoc-{version}-windows-x86_64.zip"), "pandoc.exe", "pandoc.exe"),
        (os, arch) => {
            return Err(RuntimeError::UnsupportedPlatform {
                runtime: "pandoc".into(),
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };

    let url = format!("{PANDOC_BASE_URL}/{version}/{archive}");
    Ok(RuntimeAsset::new("pandoc", version, url, file)
        .member(member)
        .executable(true))
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Root of the runtime cache.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/localconv/`
/// - **Linux**: `~/.cache/localconv/`
/// - **Windows**: `%LOCALAPPDATA%\localconv\`
///
/// Override by setting `LOCALCONV_CACHE_DIR`.
pub fn cache_root() -> PathBuf {
    if let Ok(override_dir) = std::env::var("LOCALCONV_CACHE_DIR") {
        return PathBuf::from(override_dir);
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("localconv")
}

/// Returns the unpacked path of `asset` if it is already cached.
pub fn cached_path(asset: &RuntimeAsset) -> Option<PathBuf> {
    let path = asset.install_path();
    path.exists().then_some(path)
}

/// Look `program` up on `PATH`, the way a shell would.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    let candidates: Vec<String> = if cfg!(windows) && !program.ends_with(".exe") {
        vec![format!("{program}.exe"), program.to_string()]
    } else {
        vec![program.to_string()]
    };

    std::env::split_paths(&paths)
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|p| p.is_file())
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Ensures `asset` is unpacked in the local cache and returns its path.
///
/// `on_progress` receives `(bytes_received, total_size_option)` during the
/// download. Pass `None` to suppress progress callbacks.
pub async fn ensure_installed(
    asset: &RuntimeAsset,
    timeout: Duration,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<PathBuf, RuntimeError> {
    if let Some(path) = cached_path(asset) {
        debug!("{} already cached at {}", asset.name, path.display());
        return Ok(path);
    }

    info!("Fetching {} {} from {}", asset.name, asset.version, asset.url);
    let bytes = fetch_bytes(&asset.url, timeout, on_progress).await?;

    let asset = asset.clone();
    tokio::task::spawn_blocking(move || install_bytes(&asset, &bytes))
        .await
        .map_err(|e| RuntimeError::Extract(format!("install task panicked: {e}")))?
}

/// Streams `url` into a complete in-memory buffer.
pub async fn fetch_bytes(
    url: &str,
    timeout: Duration,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<Vec<u8>, RuntimeError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("localconv-runtime/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| RuntimeError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RuntimeError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(RuntimeError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(8 * 1024 * 1024) as usize);
    let mut received: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RuntimeError::Download(format!("Read error: {e}")))?;
        buf.extend_from_slice(&chunk);
        received += chunk.len() as u64;
        if let Some(cb) = on_progress {
            cb(received, total);
        }
    }

    debug!("Downloaded {} bytes from {}", received, url);
    Ok(buf)
}

/// Unpacks downloaded bytes for `asset` into the cache.
///
/// The file is written next to its destination and renamed into place so a
/// concurrent reader never sees a partial file.
pub fn install_bytes(asset: &RuntimeAsset, bytes: &[u8]) -> Result<PathBuf, RuntimeError> {
    let payload = match (asset.packaging, asset.member.as_deref()) {
        (Packaging::Raw, _) | (_, None) => bytes.to_vec(),
        (Packaging::TarGz, Some(member)) => extract_tar_gz(bytes, member)?,
        (Packaging::Zip, Some(member)) => extract_zip(bytes, member)?,
    };

    let dir = asset.install_dir();
    std::fs::create_dir_all(&dir).map_err(RuntimeError::CacheDir)?;

    let dest = asset.install_path();
    let tmp = dir.join(format!(".{}.partial", asset.file_name));
    std::fs::write(&tmp, &payload).map_err(RuntimeError::CacheDir)?;

    #[cfg(unix)]
    if asset.executable {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))
            .map_err(RuntimeError::CacheDir)?;
    }

    std::fs::rename(&tmp, &dest).map_err(RuntimeError::CacheDir)?;
    info!("Installed {} → {}", asset.name, dest.display());
    Ok(dest)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn member_matches(entry: &str, member: &str) -> bool {
    let entry = entry.replace('\\', "/");
    entry == member || entry.ends_with(&format!("/{member}"))
}

fn extract_tar_gz(archive_bytes: &[u8], member: &str) -> Result<Vec<u8>, RuntimeError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut archive = Archive::new(GzDecoder::new(archive_bytes));

    for entry in archive
        .entries()
        .map_err(|e| RuntimeError::Extract(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| RuntimeError::Extract(e.to_string()))?;
        let path = entry
            .path()
            .map_err(|e| RuntimeError::Extract(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        if member_matches(&path, member) {
            let mut out = Vec::new();
            entry
                .read_to_end(&mut out)
                .map_err(|e| RuntimeError::Extract(format!("Unpack failed: {e}")))?;
            return Ok(out);
        }
    }

    Err(RuntimeError::Extract(format!(
        "'{member}' not found in archive"
    )))
}

fn extract_zip(archive_bytes: &[u8], member: &str) -> Result<Vec<u8>, RuntimeError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| RuntimeError::Extract(e.to_string()))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| RuntimeError::Extract(e.to_string()))?;
        if file.is_file() && member_matches(file.name(), member) {
            let mut out = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut out)
                .map_err(|e| RuntimeError::Extract(format!("Unpack failed: {e}")))?;
            return Ok(out);
        }
    }

    Err(RuntimeError::Extract(format!(
        "'{member}' not found in archive"
    )))
}

/// Whether `path` looks usable as a runtime file (exists, non-empty).
pub fn is_usable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
