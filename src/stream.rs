//! Streaming conversion API: emit pages as they are rendered.
//!
//! The blocking render task pushes each page into a bounded channel as soon
//! as it is encoded, so at most one finished page waits in memory while the
//! next one renders. Pages always arrive in document order. Dropping the
//! stream closes the channel; the render task notices at the next page
//! boundary and stops.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::PageImage;
use crate::pipeline::{input, render};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of page images.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageImage, ConvertError>> + Send>>;

/// Convert a PDF file or URL, streaming pages in order as they are ready.
///
/// # Returns
/// - `Ok(PageStream)` — a stream of `Result<PageImage, ConvertError>`
/// - `Err(ConvertError)` — the input could not be read or is not a PDF
///
/// Errors from opening or rendering the document arrive as stream items. A
/// drawing-surface failure ends the stream with
/// [`ConvertError::SurfaceUnavailable`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2img::{convert_stream, ConversionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut stream = convert_stream("document.pdf", &ConversionConfig::default()).await?;
/// while let Some(page) = stream.next().await {
///     match page {
///         Ok(p) => println!("Page {}: {}x{}", p.page_num, p.width, p.height),
///         Err(e) => eprintln!("Error: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<PageStream, ConvertError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    Ok(spawn_stream(resolved.name, resolved.bytes, config))
}

/// Streaming equivalent of [`crate::convert::convert_from_bytes`].
pub async fn convert_stream_from_bytes(
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<PageStream, ConvertError> {
    input::check_pdf_header(&bytes, "<memory>")?;
    Ok(spawn_stream("<memory>".to_string(), bytes, config))
}

fn spawn_stream(name: String, bytes: Vec<u8>, config: &ConversionConfig) -> PageStream {
    let (tx, rx) = mpsc::channel::<Result<PageImage, ConvertError>>(1);
    let cfg = config.clone();

    tokio::task::spawn_blocking(move || {
        let page_tx = tx.clone();
        let result = render::render_document(&name, bytes, &cfg, &mut |page: PageImage| {
            // A send error means the receiver is gone.
            page_tx.blocking_send(Ok(page)).is_ok()
        });

        let closing = match result {
            Ok(report) => match report.raster.aborted {
                Some((page, source)) => {
                    Some(Err(ConvertError::SurfaceUnavailable { page, source }))
                }
                None if report.raster.stopped => {
                    debug!("Page stream dropped by consumer; render stopped");
                    None
                }
                None => None,
            },
            Err(e) => {
                warn!("Streaming conversion of {} failed: {}", name, e);
                Some(Err(e))
            }
        };

        if let Some(item) = closing {
            let _ = tx.blocking_send(item);
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_pdf_bytes_fail_up_front() {
        let result = convert_stream_from_bytes(b"PK\x03\x04zip".to_vec(), &ConversionConfig::default()).await;
        assert!(matches!(result, Err(ConvertError::NotAPdf { .. })));
    }

    #[tokio::test]
    async fn missing_file_fails_up_front() {
        let result = convert_stream("/no/such/file.pdf", &ConversionConfig::default()).await;
        assert!(matches!(result, Err(ConvertError::FileNotFound { .. })));
    }
}
