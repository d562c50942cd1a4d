//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline rasterises each page. Pages are processed strictly
//! in order on the blocking render thread, so events for one conversion never
//! overlap, but they do arrive on a thread other than the caller's.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl ConversionProgressCallback for Counter {
//!     fn on_page_complete(&self, _page_num: usize, _total: usize, _encoded_bytes: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Counter::default()))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// All methods have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the document is open and the page selection is known.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page (1-indexed) is rendered.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been rendered and encoded.
    ///
    /// `encoded_bytes` is the length of the base64 payload.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_bytes: usize) {
        let _ = (page_num, total_pages, encoded_bytes);
    }

    /// Called when the surface for `page_num` could not be acquired.
    ///
    /// No further events follow for this conversion.
    fn on_conversion_aborted(&self, page_num: usize, reason: &str) {
        let _ = (page_num, reason);
    }

    /// Called once after the last selected page.
    fn on_conversion_complete(&self, total_pages: usize, rendered: usize) {
        let _ = (total_pages, rendered);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every event as a short string, in arrival order.
    #[derive(Default)]
    pub(crate) struct RecordingCallback {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingCallback {
        pub fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ConversionProgressCallback for RecordingCallback {
        fn on_conversion_start(&self, total_pages: usize) {
            self.push(format!("start {total_pages}"));
        }

        fn on_page_start(&self, page_num: usize, total_pages: usize) {
            self.push(format!("page {page_num}/{total_pages}"));
        }

        fn on_page_complete(&self, page_num: usize, _total_pages: usize, _encoded_bytes: usize) {
            self.push(format!("done {page_num}"));
        }

        fn on_conversion_aborted(&self, page_num: usize, _reason: &str) {
            self.push(format!("aborted {page_num}"));
        }

        fn on_conversion_complete(&self, total_pages: usize, rendered: usize) {
            self.push(format!("complete {rendered}/{total_pages}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_conversion_aborted(2, "too large");
        cb.on_conversion_complete(5, 1);
    }

    #[test]
    fn recording_callback_keeps_order() {
        let cb = RecordingCallback::default();
        cb.on_conversion_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 10);
        cb.on_conversion_complete(2, 1);
        assert_eq!(
            cb.take(),
            vec!["start 2", "page 1/2", "done 1", "complete 1/2"]
        );
        assert!(cb.take().is_empty());
    }
}
