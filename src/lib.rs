//! # edgequake-pdf2img
//!
//! Turn every page of a PDF into a base64-encoded image and show the pages
//! as an HTML gallery.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    read a local .pdf, download a URL, or take bytes / a reader
//!  ├─ 2. Open     bind pdfium and load the document (spawn_blocking)
//!  ├─ 3. Viewport page size in points × scale (3.0), truncated to pixels
//!  ├─ 4. Surface  one reusable RGBA buffer, cleared to white per page
//!  ├─ 5. Render   pdfium draws the page onto the surface
//!  ├─ 6. Encode   JPEG (or PNG) → base64, no data: prefix
//!  └─ 7. Display  Gallery keeps the ordered list and renders <img> tags
//! ```
//!
//! Pages are rendered strictly one after another. If a drawing surface cannot
//! be allocated the run stops and yields no images; every other failure is
//! returned as a [`ConvertError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let output = convert("document.pdf", &ConversionConfig::default()).await?;
//!     for page in &output.pages {
//!         println!("page {}: {}x{}", page.page_num, page.width, page.height);
//!     }
//!     let base64_list: Vec<String> = output.into_base64_list();
//!     eprintln!("{} images", base64_list.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Gallery
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{ConversionConfig, Gallery, DEFAULT_DISPLAY_WIDTH};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut gallery = Gallery::new();
//! gallery.upload("document.pdf", &ConversionConfig::default()).await?;
//! gallery.write_html("gallery.html", DEFAULT_DISPLAY_WIDTH).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! The library binds, in order: [`ConversionConfig::pdfium_library_path`],
//! the copy cached by `pdfium-auto`, then the system library. It never
//! downloads on its own; call `pdfium_auto::ensure_pdfium_library` first
//! (the binary does this with a progress bar).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod gallery;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ImageEncoding, PageSelection,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SURFACE_PIXELS, DEFAULT_SCALE,
};
pub use convert::{convert, convert_from_bytes, convert_reader, convert_sync, inspect, inspect_bytes};
pub use error::{ConvertError, SurfaceError};
pub use gallery::{Gallery, DEFAULT_DISPLAY_WIDTH};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, PageImage, PageSize};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, convert_stream_from_bytes, PageStream};
