//! The image gallery: holds the latest conversion and renders it as HTML.
//!
//! A [`Gallery`] owns three pieces of state: the ordered page images, a
//! loading flag and the last failure message. The flag is a
//! [`tokio::sync::watch`] channel so a UI task can observe it while an
//! upload is in flight; it is raised for the duration of each upload and
//! lowered again however the upload ends, including when the upload future
//! is dropped. Dropping an upload does not stop a render already running on
//! the blocking pool; that render finishes and its result is discarded.

use crate::config::ConversionConfig;
use crate::convert::{convert, convert_from_bytes};
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionStats, PageImage};
use std::path::Path;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// CSS width given to every page image.
pub const DEFAULT_DISPLAY_WIDTH: u32 = 800;

const TITLE: &str = "Convert PDF to Image";

/// Latest converted document plus upload state.
#[derive(Debug)]
pub struct Gallery {
    images: Vec<PageImage>,
    loading: watch::Sender<bool>,
    last_error: Option<String>,
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new()
    }
}

/// Raises the loading flag; lowers it on drop.
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> LoadingGuard<'a> {
    fn engage(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl Gallery {
    pub fn new() -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            images: Vec::new(),
            loading,
            last_error: None,
        }
    }

    /// Stored images in page order.
    pub fn images(&self) -> &[PageImage] {
        &self.images
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Watch the loading flag from another task.
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Message of the most recent failed upload, cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop all stored images.
    pub fn clear(&mut self) {
        self.images.clear();
        self.last_error = None;
    }

    /// Convert a file or URL and replace the stored images with the result.
    ///
    /// On failure the error is logged and recorded, the previous images stay
    /// in place and the error is returned. Dropping the returned future lowers
    /// the loading flag but does not cancel the render already in progress.
    pub async fn upload(
        &mut self,
        input: impl AsRef<str>,
        config: &ConversionConfig,
    ) -> Result<ConversionStats, ConvertError> {
        let input = input.as_ref();
        let result = {
            let _loading = LoadingGuard::engage(&self.loading);
            convert(input, config).await
        };
        self.finish(input, result)
    }

    /// [`Gallery::upload`] for a document already in memory.
    pub async fn upload_bytes(
        &mut self,
        bytes: Vec<u8>,
        config: &ConversionConfig,
    ) -> Result<ConversionStats, ConvertError> {
        let result = {
            let _loading = LoadingGuard::engage(&self.loading);
            convert_from_bytes(bytes, config).await
        };
        self.finish("<memory>", result)
    }

    fn finish(
        &mut self,
        input: &str,
        result: Result<ConversionOutput, ConvertError>,
    ) -> Result<ConversionStats, ConvertError> {
        match result {
            Ok(output) => {
                if output.stats.surface_unavailable {
                    warn!("{}: no drawing surface, gallery is now empty", input);
                } else {
                    info!("{}: showing {} pages", input, output.pages.len());
                }
                self.images = output.pages;
                self.last_error = None;
                Ok(output.stats)
            }
            Err(e) => {
                error!("Failed to convert {}: {}", input, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Standalone HTML page showing every stored image at `display_width` px.
    pub fn render_html(&self, display_width: u32) -> String {
        let status = if self.is_loading() {
            "Loading..."
        } else {
            "Upload PDF"
        };

        let mut html = String::with_capacity(
            512 + self.images.iter().map(|p| p.data.len() + 96).sum::<usize>(),
        );
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", TITLE));
        html.push_str(&format!("<h1>{}</h1>\n", TITLE));
        html.push_str(&format!("<p class=\"status\">{}</p>\n", status));

        if !self.images.is_empty() {
            html.push_str("<div class=\"image-list\">\n");
            for page in &self.images {
                html.push_str(&format!(
                    "<img src=\"{}\" alt=\"Page {}\" style=\"width: {}px\">\n",
                    page.data_uri(),
                    page.page_num,
                    display_width
                ));
            }
            html.push_str("</div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write [`Gallery::render_html`] to `path` (temp file, then rename).
    pub async fn write_html(
        &self,
        path: impl AsRef<Path>,
        display_width: u32,
    ) -> Result<(), ConvertError> {
        let path = path.as_ref();
        let write_err = |source| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = path.with_extension("html.tmp");
        tokio::fs::write(&tmp_path, self.render_html(display_width))
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }
}
