//! # pdfium-auto
//!
//! Locate, fetch and cache the [PDFium](https://pdfium.googlesource.com/pdfium/)
//! shared library that `pdfium-render` binds to at runtime.
//!
//! The library is pinned to one release tag ([`PDFIUM_VERSION`]) of
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//! and every cached copy lives in a directory named after that tag, so
//! upgrading the tag never picks up a stale binary.
//!
//! ## Resolution order
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. The per-version cache directory (see [`pdfium_cache_dir`]).
//! 3. A download of the platform archive, extracted into the cache.
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium_from_path, ensure_pdfium_library};
//!
//! let path = ensure_pdfium_library(Some(&|done, total| {
//!     if let Some(t) = total {
//!         eprint!("\rPDFium: {done}/{t} bytes");
//!     }
//! }))
//! .expect("download failed");
//! let pdfium = bind_pdfium_from_path(&path).expect("bind failed");
//! ```
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH` — existing pdfium library; skips the cache entirely.
//! - `PDF2IMG_CACHE_DIR` — root directory for the cache.
//! - `PDFIUM_DOWNLOAD_BASE_URL` — mirror of the release download URL.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Release tag of bblanchon/pdfium-binaries this crate downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// Default release download root; the tag and archive name are appended.
pub const DEFAULT_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

const READ_CHUNK: usize = 64 * 1024;

/// Callback receiving `(bytes_downloaded, content_length)` while fetching.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("No PDFium build is published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cache directory '{path}' is unusable: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Could not extract '{entry}' from the PDFium archive: {reason}")]
    Extract { entry: String, reason: String },

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Release asset layout for one OS/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Archive published in the release, e.g. `pdfium-linux-x64.tgz`.
    pub archive: &'static str,
    /// Path of the shared library inside the archive.
    pub entry: &'static str,
    /// File name the library is cached under.
    pub library: &'static str,
}

impl Platform {
    const fn new(archive: &'static str, entry: &'static str, library: &'static str) -> Self {
        Self {
            archive,
            entry,
            library,
        }
    }

    /// Look up the layout for an explicit OS/arch pair (`std::env::consts` names).
    pub fn for_target(os: &str, arch: &str) -> Result<Self, PdfiumAutoError> {
        let platform = match (os, arch) {
            ("macos", "aarch64") => Self::new("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("macos", "x86_64") => Self::new("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("linux", "x86_64") => Self::new("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("linux", "aarch64") => Self::new("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("windows", "x86_64") => Self::new("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            ("windows", "aarch64") => Self::new("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            ("windows", "x86") => Self::new("pdfium-win-x86.tgz", "bin/pdfium.dll", "pdfium.dll"),
            (os, arch) => {
                return Err(PdfiumAutoError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        Ok(platform)
    }

    /// Layout for the platform this binary was compiled for.
    pub fn detect() -> Result<Self, PdfiumAutoError> {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Full download URL of this platform's archive for [`PDFIUM_VERSION`].
    pub fn archive_url(&self, base_url: &str) -> String {
        format!(
            "{}/chromium%2F{}/{}",
            base_url.trim_end_matches('/'),
            PDFIUM_VERSION,
            self.archive
        )
    }
}

/// Per-version cache directory for the PDFium library.
///
/// Defaults to `<platform cache dir>/pdf2img/pdfium-<PDFIUM_VERSION>`;
/// `PDF2IMG_CACHE_DIR` replaces the `<platform cache dir>/pdf2img` part.
pub fn pdfium_cache_dir() -> PathBuf {
    let root = match std::env::var_os("PDF2IMG_CACHE_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("pdf2img"),
    };
    root.join(format!("pdfium-{PDFIUM_VERSION}"))
}

fn base_url() -> String {
    std::env::var("PDFIUM_DOWNLOAD_BASE_URL")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn env_library() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Path of a usable library without touching the network, if there is one.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    if let Some(path) = RESOLVED.get() {
        return Some(path.clone());
    }
    env_library().or_else(|| {
        let platform = Platform::detect().ok()?;
        let path = pdfium_cache_dir().join(platform.library);
        path.is_file().then_some(path)
    })
}

/// `true` when [`ensure_pdfium_library`] would not need to download.
pub fn is_pdfium_cached() -> bool {
    cached_pdfium_path().is_some()
}

/// Return the library path, downloading and caching it first if needed.
///
/// The resolved path is memoised for the rest of the process.
pub fn ensure_pdfium_library(
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = cached_pdfium_path() {
        let _ = RESOLVED.set(path.clone());
        return Ok(path);
    }

    if let Some(p) = std::env::var_os("PDFIUM_LIB_PATH") {
        warn!(
            "PDFIUM_LIB_PATH '{}' does not exist; falling back to download",
            Path::new(&p).display()
        );
    }

    let platform = Platform::detect()?;
    let cache_dir = pdfium_cache_dir();
    std::fs::create_dir_all(&cache_dir).map_err(|source| PdfiumAutoError::CacheDir {
        path: cache_dir.clone(),
        source,
    })?;

    let url = platform.archive_url(&base_url());
    info!("Fetching PDFium {} from {}", PDFIUM_VERSION, url);
    let archive = download(&url, on_progress)?;

    let dest = cache_dir.join(platform.library);
    extract_entry(&archive, platform.entry, &dest)?;
    info!("PDFium cached at {}", dest.display());

    let _ = RESOLVED.set(dest.clone());
    Ok(dest)
}

/// Bind `pdfium-render` to the library at `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn download(
    url: &str,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let fail = |reason: String| PdfiumAutoError::Download {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let mut response = client.get(url).send().map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(fail(e.to_string())),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(cb) = on_progress {
            cb(body.len() as u64, total);
        }
    }

    debug!("Downloaded {} bytes", body.len());
    Ok(body)
}

/// Unpack one entry of a `.tgz` archive to `dest`.
///
/// The entry is written next to `dest` under a `.part` name and renamed, so an
/// interrupted extraction never leaves a truncated library in the cache.
fn extract_entry(archive: &[u8], entry: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    use flate2::read::GzDecoder;

    let fail = |reason: String| PdfiumAutoError::Extract {
        entry: entry.to_string(),
        reason,
    };

    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    let entries = tar.entries().map_err(|e| fail(e.to_string()))?;

    for item in entries {
        let mut item = item.map_err(|e| fail(e.to_string()))?;
        let matches = item
            .path()
            .map(|p| p.to_string_lossy() == entry)
            .map_err(|e| fail(e.to_string()))?;
        if !matches {
            continue;
        }

        let partial = dest.with_extension("part");
        item.unpack(&partial).map_err(|e| fail(e.to_string()))?;
        std::fs::rename(&partial, dest).map_err(|e| fail(e.to_string()))?;
        return Ok(());
    }

    Err(fail("entry not present in archive".to_string()))
}
