//! The page loop: viewport → surface → render → encode, one page at a time.
//!
//! The loop only talks to a [`RenderBackend`], so the ordering and abort
//! rules here hold for any renderer. The PDFium implementation lives in
//! [`crate::pipeline::render`].

use crate::config::ConversionConfig;
use crate::error::{ConvertError, SurfaceError};
use crate::output::{PageImage, PageSize};
use crate::pipeline::encode;
use crate::pipeline::surface::{Surface, Viewport};
use std::time::Instant;
use tracing::{debug, warn};

/// An open document that can rasterise its pages onto a [`Surface`].
pub trait RenderBackend {
    fn page_count(&self) -> usize;

    /// Size of page `index` (0-based) in points.
    fn page_size(&self, index: usize) -> Result<PageSize, ConvertError>;

    /// Draw page `index` onto `surface`, which is already sized to `viewport`.
    fn render_page(
        &self,
        index: usize,
        viewport: &Viewport,
        surface: &mut Surface,
    ) -> Result<(), ConvertError>;
}

/// What happened during one pass over the selected pages.
#[derive(Debug, Default)]
pub struct RasterSummary {
    /// Pages handed to the sink.
    pub emitted: usize,
    pub encoded_bytes: u64,
    pub render_ms: u64,
    pub encode_ms: u64,
    /// Set when the surface could not be acquired; the loop stopped there.
    pub aborted: Option<(usize, SurfaceError)>,
    /// The sink asked to stop before the last page.
    pub stopped: bool,
}

/// Rasterise `page_indices` in order, handing each image to `sink`.
///
/// `sink` returns `false` to stop after the current page. Surface failures
/// end the loop and are reported in [`RasterSummary::aborted`] rather than as
/// an error; every other failure is returned as `Err` immediately.
pub fn rasterize_pages<B: RenderBackend + ?Sized>(
    backend: &B,
    config: &ConversionConfig,
    page_indices: &[usize],
    sink: &mut dyn FnMut(PageImage) -> bool,
) -> Result<RasterSummary, ConvertError> {
    let total = page_indices.len();
    let progress = config.progress_callback.as_deref();
    let page_count = backend.page_count();
    let mut surface = Surface::new(config.max_surface_pixels);
    let mut summary = RasterSummary::default();

    if let Some(cb) = progress {
        cb.on_conversion_start(total);
    }

    for &idx in page_indices {
        let page_num = idx + 1;
        if idx >= page_count {
            warn!(
                "Skipping page {} (out of range, total={})",
                page_num, page_count
            );
            continue;
        }
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }

        let viewport = Viewport::for_page(backend.page_size(idx)?, config.scale);
        if let Err(e) = surface.acquire(&viewport) {
            warn!("Page {}: drawing surface unavailable: {}", page_num, e);
            if let Some(cb) = progress {
                cb.on_conversion_aborted(page_num, &e.to_string());
            }
            summary.aborted = Some((page_num, e));
            return Ok(summary);
        }

        let start = Instant::now();
        backend.render_page(idx, &viewport, &mut surface)?;
        summary.render_ms += start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let image = encode::encode_page(&surface, config.encoding, page_num)
            .map_err(|source| ConvertError::EncodingFailed {
                page: page_num,
                source,
            })?;
        summary.encode_ms += start.elapsed().as_millis() as u64;

        debug!(
            "Page {} rendered at {}x{} (scale {})",
            page_num, viewport.width, viewport.height, viewport.scale
        );
        let encoded = image.data.len();
        summary.encoded_bytes += encoded as u64;
        summary.emitted += 1;
        if let Some(cb) = progress {
            cb.on_page_complete(page_num, total, encoded);
        }

        if !sink(image) {
            summary.stopped = true;
            break;
        }
    }

    if let Some(cb) = progress {
        cb.on_conversion_complete(total, summary.emitted);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingCallback;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::sync::Arc;

    /// Pages are solid colours; `fail_at` makes one page's render fail.
    struct FakeDocument {
        pub sizes: Vec<PageSize>,
        pub fail_at: Option<usize>,
        pub rendered: RefCell<Vec<usize>>,
    }

    impl FakeDocument {
        pub fn uniform(pages: usize, width_pt: f32, height_pt: f32) -> Self {
            Self {
                sizes: vec![PageSize { width_pt, height_pt }; pages],
                fail_at: None,
                rendered: RefCell::new(Vec::new()),
            }
        }
    }

    impl RenderBackend for FakeDocument {
        fn page_count(&self) -> usize {
            self.sizes.len()
        }

        fn page_size(&self, index: usize) -> Result<PageSize, ConvertError> {
            Ok(self.sizes[index])
        }

        fn render_page(
            &self,
            index: usize,
            viewport: &Viewport,
            surface: &mut Surface,
        ) -> Result<(), ConvertError> {
            if self.fail_at == Some(index) {
                return Err(ConvertError::RasterisationFailed {
                    page: index + 1,
                    detail: "boom".into(),
                });
            }
            self.rendered.borrow_mut().push(index);
            let shade = (index * 40 % 256) as u8;
            let page = RgbaImage::from_pixel(
                viewport.width,
                viewport.height,
                Rgba([shade, 0, 0, 255]),
            );
            surface.draw(&DynamicImage::ImageRgba8(page));
            Ok(())
        }
    }

    fn collect(
        doc: &FakeDocument,
        config: &ConversionConfig,
        indices: &[usize],
    ) -> (Result<RasterSummary, ConvertError>, Vec<PageImage>) {
        let mut pages = Vec::new();
        let result = rasterize_pages(doc, config, indices, &mut |p| {
            pages.push(p);
            true
        });
        (result, pages)
    }

    #[test]
    fn every_page_in_order_at_viewport_size() {
        let doc = FakeDocument::uniform(4, 100.0, 50.0);
        let config = ConversionConfig::default();
        let (result, pages) = collect(&doc, &config, &[0, 1, 2, 3]);

        let summary = result.unwrap();
        assert_eq!(summary.emitted, 4);
        assert!(summary.aborted.is_none());
        assert_eq!(
            pages.iter().map(|p| p.page_num).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        for p in &pages {
            assert_eq!((p.width, p.height), (300, 150));
            let img = image::load_from_memory(&p.decode().unwrap()).unwrap();
            assert_eq!((img.width(), img.height()), (300, 150));
        }
    }

    #[test]
    fn mixed_page_sizes_reuse_one_surface() {
        let doc = FakeDocument {
            sizes: vec![
                PageSize {
                    width_pt: 10.0,
                    height_pt: 20.0,
                },
                PageSize {
                    width_pt: 30.0,
                    height_pt: 5.0,
                },
            ],
            fail_at: None,
            rendered: RefCell::new(Vec::new()),
        };
        let config = ConversionConfig::builder().scale(2.0).build().unwrap();
        let (_, pages) = collect(&doc, &config, &[0, 1]);
        assert_eq!((pages[0].width, pages[0].height), (20, 40));
        assert_eq!((pages[1].width, pages[1].height), (60, 10));
    }

    #[test]
    fn surface_failure_renders_nothing() {
        let doc = FakeDocument::uniform(3, 100.0, 100.0);
        let config = ConversionConfig::builder()
            .max_surface_pixels(10)
            .build()
            .unwrap();
        let (result, pages) = collect(&doc, &config, &[0, 1, 2]);

        let summary = result.unwrap();
        assert!(pages.is_empty());
        assert!(doc.rendered.borrow().is_empty());
        let (page, err) = summary.aborted.expect("aborted");
        assert_eq!(page, 1);
        assert!(matches!(err, SurfaceError::TooLarge { .. }));
    }

    #[test]
    fn surface_failure_mid_document_stops_loop() {
        let mut doc = FakeDocument::uniform(3, 10.0, 10.0);
        doc.sizes[1] = PageSize {
            width_pt: 0.1,
            height_pt: 10.0,
        };
        let config = ConversionConfig::default();
        let (result, pages) = collect(&doc, &config, &[0, 1, 2]);

        let summary = result.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(*doc.rendered.borrow(), vec![0]);
        assert_eq!(summary.aborted.map(|(p, _)| p), Some(2));
    }

    #[test]
    fn zero_pages_is_empty_not_error() {
        let doc = FakeDocument::uniform(0, 1.0, 1.0);
        let (result, pages) = collect(&doc, &ConversionConfig::default(), &[]);
        let summary = result.unwrap();
        assert_eq!(summary.emitted, 0);
        assert!(summary.aborted.is_none());
        assert!(pages.is_empty());
    }

    #[test]
    fn render_error_propagates() {
        let mut doc = FakeDocument::uniform(3, 10.0, 10.0);
        doc.fail_at = Some(1);
        let (result, pages) = collect(&doc, &ConversionConfig::default(), &[0, 1, 2]);
        assert!(matches!(
            result,
            Err(ConvertError::RasterisationFailed { page: 2, .. })
        ));
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let doc = FakeDocument::uniform(2, 10.0, 10.0);
        let (result, pages) = collect(&doc, &ConversionConfig::default(), &[1, 5]);
        assert_eq!(result.unwrap().emitted, 1);
        assert_eq!(pages[0].page_num, 2);
    }

    #[test]
    fn sink_can_stop_early() {
        let doc = FakeDocument::uniform(5, 10.0, 10.0);
        let mut seen = 0;
        let summary = rasterize_pages(&doc, &ConversionConfig::default(), &[0, 1, 2, 3, 4], &mut |_| {
            seen += 1;
            seen < 2
        })
        .unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.emitted, 2);
        assert_eq!(*doc.rendered.borrow(), vec![0, 1]);
    }

    #[test]
    fn identical_runs_are_byte_identical() {
        let doc = FakeDocument::uniform(3, 40.0, 30.0);
        let config = ConversionConfig::default();
        let (_, a) = collect(&doc, &config, &[0, 1, 2]);
        let (_, b) = collect(&doc, &config, &[0, 1, 2]);
        assert_eq!(a, b);
    }

    #[test]
    fn progress_events_follow_pages() {
        let recorder = Arc::new(RecordingCallback::default());
        let config = ConversionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let doc = FakeDocument::uniform(2, 10.0, 10.0);
        collect(&doc, &config, &[0, 1]).0.unwrap();
        assert_eq!(
            recorder.take(),
            vec!["start 2", "page 1/2", "done 1", "page 2/2", "done 2", "complete 2/2"]
        );

        let tiny = ConversionConfig::builder()
            .progress_callback(recorder.clone())
            .max_surface_pixels(1)
            .build()
            .unwrap();
        collect(&doc, &tiny, &[0, 1]).0.unwrap();
        assert_eq!(recorder.take(), vec!["start 2", "page 1/2", "aborted 1"]);
    }
}
