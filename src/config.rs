//! Configuration types for PDF-to-image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one `Clone` struct
//! so a conversion can carry its own copy onto the blocking render thread.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Zoom applied to every page: one PDF point becomes three pixels.
pub const DEFAULT_SCALE: f32 = 3.0;

/// Largest surface area accepted, in pixels (16 384 × 16 384).
///
/// This is the canvas area limit shared by the major browser engines.
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 268_435_456;

/// JPEG quality used when none is given; same as the canvas `toDataURL` default.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Configuration for a PDF-to-image conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ConversionConfig, ImageEncoding};
///
/// let config = ConversionConfig::builder()
///     .scale(2.0)
///     .encoding(ImageEncoding::Png)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 2.0);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Zoom multiplier from PDF points to pixels. Range: (0, 10]. Default: 3.0.
    pub scale: f32,

    /// Compressed image format for each page. Default: JPEG at quality 92.
    pub encoding: ImageEncoding,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Surface area limit in pixels; larger viewports abort the run.
    pub max_surface_pixels: u64,

    /// Explicit pdfium shared library. When `None` the cached download and
    /// then the system library are tried.
    pub pdfium_library_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            encoding: ImageEncoding::default(),
            pages: PageSelection::default(),
            password: None,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            pdfium_library_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("encoding", &self.encoding)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_surface_pixels", &self.max_surface_pixels)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn encoding(mut self, encoding: ImageEncoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// Shorthand for [`ImageEncoding::Jpeg`] with the given quality (1–100).
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.encoding = ImageEncoding::Jpeg {
            quality: quality.clamp(1, 100),
        };
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_surface_pixels(mut self, px: u64) -> Self {
        self.config.max_surface_pixels = px;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 || c.scale > 10.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "scale must be in (0, 10], got {}",
                c.scale
            )));
        }
        if let ImageEncoding::Jpeg { quality } = c.encoding {
            if !(1..=100).contains(&quality) {
                return Err(ConvertError::InvalidConfig(format!(
                    "JPEG quality must be 1–100, got {quality}"
                )));
            }
        }
        if matches!(&c.pages, PageSelection::Set(pages) if pages.is_empty()) {
            return Err(ConvertError::InvalidConfig(
                "page set must name at least one page".into(),
            ));
        }
        if c.max_surface_pixels == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_surface_pixels must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Compressed image format produced for each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "format")]
pub enum ImageEncoding {
    /// Lossy, small; rendered text stays readable at quality ≥ 80.
    Jpeg { quality: u8 },
    /// Lossless.
    Png,
}

impl Default for ImageEncoding {
    fn default() -> Self {
        ImageEncoding::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "jpg",
            ImageEncoding::Png => "png",
        }
    }
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first 1-indexed page this selection asks for, used in range errors.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_browser_canvas() {
        let c = ConversionConfig::default();
        assert_eq!(c.scale, 3.0);
        assert_eq!(c.encoding, ImageEncoding::Jpeg { quality: 92 });
        assert_eq!(c.encoding.mime_type(), "image/jpeg");
        assert_eq!(c.pages, PageSelection::All);
        assert_eq!(c.max_surface_pixels, 16_384 * 16_384);
    }

    #[test]
    fn builder_rejects_bad_scale() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY, 11.0] {
            let err = ConversionConfig::builder().scale(bad).build();
            assert!(
                matches!(err, Err(ConvertError::InvalidConfig(_))),
                "scale {bad} accepted"
            );
        }
    }

    #[test]
    fn builder_rejects_zero_quality() {
        let err = ConversionConfig::builder()
            .encoding(ImageEncoding::Jpeg { quality: 0 })
            .build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));

        let ok = ConversionConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(ok.encoding, ImageEncoding::Jpeg { quality: 1 });
    }

    #[test]
    fn builder_rejects_empty_page_set() {
        let err = ConversionConfig::builder()
            .pages(PageSelection::Set(Vec::new()))
            .build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));

        let ok = ConversionConfig::builder()
            .pages(PageSelection::Set(vec![2]))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::All.to_indices(0), Vec::<usize>::new());
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn encoding_serialises_with_tag() {
        let json = serde_json::to_string(&ImageEncoding::Jpeg { quality: 80 }).unwrap();
        assert_eq!(json, r#"{"format":"jpeg","quality":80}"#);
        let png: ImageEncoding = serde_json::from_str(r#"{"format":"png"}"#).unwrap();
        assert_eq!(png, ImageEncoding::Png);
    }
}
