//! Error types for the edgequake-pdf2img library.
//!
//! * [`ConvertError`] — the conversion cannot produce a result at all (bad
//!   input, wrong password, PDFium unavailable, a page failed to render or
//!   encode). Returned as `Err` from the `convert*` and `inspect*` functions.
//!
//! * [`SurfaceError`] — the drawing surface could not be acquired for a page.
//!   This is not fatal to the caller: the eager API reports it as an empty
//!   result with `stats.surface_unavailable` set, and the streaming API ends
//!   with [`ConvertError::SurfaceUnavailable`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input is neither a `.pdf` path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but carry no `%PDF` header.
    #[error("'{input}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { input: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDFium could not parse the document.
    #[error("PDF '{input}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { input: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{input}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { input: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{input}'")]
    WrongPassword { input: String },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered surface could not be compressed.
    #[error("Encoding page {page} failed: {source}")]
    EncodingFailed {
        page: usize,
        #[source]
        source: image::ImageError,
    },

    /// The drawing surface could not be acquired; no further page was rendered.
    #[error("Drawing surface unavailable at page {page}: {source}")]
    SurfaceUnavailable {
        page: usize,
        #[source]
        source: SurfaceError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The pdf2img binary downloads PDFium automatically on first run.\n\
When using the library directly you can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Call pdfium_auto::ensure_pdfium_library() once before converting.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a drawing surface could not be acquired for a viewport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// One of the viewport dimensions truncated to zero pixels.
    #[error("viewport {width}x{height} has no area")]
    ZeroSized { width: u32, height: u32 },

    /// The viewport exceeds the configured pixel budget.
    #[error("viewport {width}x{height} exceeds the limit of {max_pixels} pixels")]
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// The pixel buffer could not be allocated.
    #[error("could not allocate {bytes} bytes for the surface")]
    OutOfMemory { bytes: usize },
}
