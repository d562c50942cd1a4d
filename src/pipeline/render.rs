//! PDFium rasterisation: open a document from memory and draw its pages.
//!
//! Everything in this module is blocking. pdfium keeps thread-local state and
//! must not be driven from a Tokio worker, so the async entry points in
//! [`crate::convert`] and [`crate::stream`] call in here through
//! `spawn_blocking`. Each call binds its own [`Pdfium`] instance.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{DocumentMetadata, PageImage, PageSize};
use crate::pipeline::rasterize::{self, RasterSummary, RenderBackend};
use crate::pipeline::surface::{Surface, Viewport};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Bind pdfium: explicit path, then the pdfium-auto cache, then the system library.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ConvertError> {
    if let Some(path) = explicit {
        return pdfium_auto::bind_pdfium_from_path(path)
            .map_err(|e| ConvertError::PdfiumBindingFailed(e.to_string()));
    }

    if let Some(path) = pdfium_auto::cached_pdfium_path() {
        match pdfium_auto::bind_pdfium_from_path(&path) {
            Ok(pdfium) => return Ok(pdfium),
            Err(e) => warn!("Cached pdfium unusable, trying system library: {}", e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| ConvertError::PdfiumBindingFailed(e.to_string()))
}

/// Load a document from an owned buffer; the document keeps the bytes alive.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    bytes: Vec<u8>,
    password: Option<&str>,
    input: &str,
) -> Result<PdfDocument<'a>, ConvertError> {
    pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| match e {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                if password.is_some() {
                    ConvertError::WrongPassword {
                        input: input.to_string(),
                    }
                } else {
                    ConvertError::PasswordRequired {
                        input: input.to_string(),
                    }
                }
            }
            other => ConvertError::CorruptPdf {
                input: input.to_string(),
                detail: format!("{:?}", other),
            },
        })
}

fn page_at<'a>(document: &PdfDocument<'a>, index: usize) -> Result<PdfPage<'a>, ConvertError> {
    document
        .pages()
        .get(index as u16)
        .map_err(|e| ConvertError::RasterisationFailed {
            page: index + 1,
            detail: format!("{:?}", e),
        })
}

impl RenderBackend for PdfDocument<'_> {
    fn page_count(&self) -> usize {
        self.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, ConvertError> {
        let page = page_at(self, index)?;
        Ok(PageSize {
            width_pt: page.width().value,
            height_pt: page.height().value,
        })
    }

    fn render_page(
        &self,
        index: usize,
        viewport: &Viewport,
        surface: &mut Surface,
    ) -> Result<(), ConvertError> {
        let page = page_at(self, index)?;
        let config = PdfRenderConfig::new()
            .set_target_size(viewport.width as Pixels, viewport.height as Pixels);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ConvertError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;
        surface.draw(&bitmap.as_image());
        Ok(())
    }
}

/// Read document metadata and page sizes.
pub fn extract_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let page_sizes: Vec<PageSize> = document
        .pages()
        .iter()
        .map(|page| PageSize {
            width_pt: page.width().value,
            height_pt: page.height().value,
        })
        .collect();

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: page_sizes.len(),
        pdf_version: format!("{:?}", document.version()),
        page_sizes,
    }
}

/// Expand the page selection; an empty match on a non-empty document is an error.
pub fn select_pages(config: &ConversionConfig, total_pages: usize) -> Result<Vec<usize>, ConvertError> {
    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() && total_pages > 0 {
        return Err(ConvertError::PageOutOfRange {
            page: config.pages.first_requested(),
            total: total_pages,
        });
    }
    Ok(indices)
}

/// Outcome of [`render_document`].
#[derive(Debug)]
pub struct RenderReport {
    pub total_pages: usize,
    pub selected_pages: usize,
    pub raster: RasterSummary,
}

/// Open `bytes` and feed every selected page to `sink`, in page order.
pub fn render_document(
    input: &str,
    bytes: Vec<u8>,
    config: &ConversionConfig,
    sink: &mut dyn FnMut(PageImage) -> bool,
) -> Result<RenderReport, ConvertError> {
    let pdfium = bind_pdfium(config.pdfium_library_path.as_deref())?;
    let document = open_document(&pdfium, bytes, config.password.as_deref(), input)?;

    let total_pages = document.page_count();
    info!("PDF loaded: {} pages", total_pages);

    let indices = select_pages(config, total_pages)?;
    debug!("Selected {} pages for rasterisation", indices.len());

    let raster = rasterize::rasterize_pages(&document, config, &indices, sink)?;
    Ok(RenderReport {
        total_pages,
        selected_pages: indices.len(),
        raster,
    })
}

/// Open `bytes` and read metadata without rendering.
pub fn inspect_document(
    input: &str,
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, ConvertError> {
    let pdfium = bind_pdfium(config.pdfium_library_path.as_deref())?;
    let document = open_document(&pdfium, bytes, config.password.as_deref(), input)?;
    Ok(extract_metadata(&document))
}
