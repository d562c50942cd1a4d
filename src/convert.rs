//! Eager (full-document) conversion entry points.
//!
//! These wait for every selected page and return the whole ordered sequence.
//! Use [`crate::stream::convert_stream`] to receive pages as they finish.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, PageImage};
use crate::pipeline::{input, render};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

/// Convert a PDF file or URL to one base64 image per page.
///
/// # Arguments
/// * `input` — Local `.pdf` path or HTTP/HTTPS URL
/// * `config` — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` with pages in document order. When a drawing
/// surface cannot be acquired the run stops, `pages` is empty and
/// `stats.surface_unavailable` is set.
///
/// # Errors
/// Every other failure (missing file, not a PDF, corrupt or encrypted PDF,
/// render or encode error) is returned as `Err`.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run_eager(resolved.name, resolved.bytes, config, total_start).await
}

/// Convert PDF bytes already in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2img::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let output = convert_from_bytes(bytes, &ConversionConfig::default()).await?;
/// println!("{} pages", output.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    input::check_pdf_header(&bytes, "<memory>")?;
    run_eager("<memory>".to_string(), bytes, config, total_start).await
}

/// Convert a PDF read to the end from `reader` (an open file, a socket, …).
pub async fn convert_reader<R>(
    mut reader: R,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| ConvertError::InvalidInput {
            input: "<reader>".into(),
            reason: e.to_string(),
        })?;
    convert_from_bytes(bytes, config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without rendering any page.
///
/// `config` supplies the password, the pdfium library path and the download
/// timeout; rendering options are ignored.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, ConvertError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    run_inspect(resolved.name, resolved.bytes, config.clone()).await
}

/// [`inspect`] for bytes already in memory; `config` supplies the password
/// and library path.
pub async fn inspect_bytes(
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, ConvertError> {
    input::check_pdf_header(&bytes, "<memory>")?;
    run_inspect("<memory>".to_string(), bytes, config.clone()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_inspect(
    name: String,
    bytes: Vec<u8>,
    config: ConversionConfig,
) -> Result<DocumentMetadata, ConvertError> {
    tokio::task::spawn_blocking(move || render::inspect_document(&name, bytes, &config))
        .await
        .map_err(|e| ConvertError::Internal(format!("Inspect task panicked: {}", e)))?
}

async fn run_eager(
    name: String,
    bytes: Vec<u8>,
    config: &ConversionConfig,
    total_start: Instant,
) -> Result<ConversionOutput, ConvertError> {
    let cfg = config.clone();
    let (report, pages) = tokio::task::spawn_blocking(move || {
        let mut pages: Vec<PageImage> = Vec::new();
        let report = render::render_document(&name, bytes, &cfg, &mut |page: PageImage| {
            pages.push(page);
            true
        })?;
        Ok::<_, ConvertError>((report, pages))
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))??;

    Ok(assemble_output(report, pages, total_start))
}

/// Turn a finished render into the caller-facing output.
///
/// A surface abort discards every page rendered before it.
fn assemble_output(
    report: render::RenderReport,
    mut pages: Vec<PageImage>,
    total_start: Instant,
) -> ConversionOutput {
    let raster = &report.raster;
    let surface_unavailable = raster.aborted.is_some();
    if let Some((page, ref reason)) = raster.aborted {
        warn!(
            "Drawing surface unavailable at page {} ({}); discarding {} rendered pages",
            page,
            reason,
            pages.len()
        );
        pages.clear();
    }

    let stats = ConversionStats {
        total_pages: report.total_pages,
        selected_pages: report.selected_pages,
        rendered_pages: pages.len(),
        encoded_bytes: pages.iter().map(|p| p.data.len() as u64).sum(),
        render_duration_ms: raster.render_ms,
        encode_duration_ms: raster.encode_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        surface_unavailable,
    };

    info!(
        "Conversion complete: {}/{} pages, {}ms total",
        stats.rendered_pages, stats.total_pages, stats.total_duration_ms
    );

    ConversionOutput { pages, stats }
}
