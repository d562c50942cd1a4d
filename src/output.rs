//! Result types produced by a conversion.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// One rendered page, compressed and base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Pixel width of the encoded image (the page viewport width).
    pub width: u32,
    /// Pixel height of the encoded image (the page viewport height).
    pub height: u32,
    /// `image/jpeg` or `image/png`.
    pub mime_type: String,
    /// Base64 payload with no `data:` prefix.
    pub data: String,
}

impl PageImage {
    /// `data:<mime>;base64,<payload>`, ready for an `<img src>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// The compressed image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Timing and volume figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages matched by the page selection.
    pub selected_pages: usize,
    /// Pages in the returned sequence.
    pub rendered_pages: usize,
    /// Sum of base64 payload lengths.
    pub encoded_bytes: u64,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub total_duration_ms: u64,
    /// The run stopped because a drawing surface could not be acquired.
    pub surface_unavailable: bool,
}

/// The ordered page images of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Ordered by `page_num`.
    pub pages: Vec<PageImage>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Just the base64 payloads, in page order.
    pub fn into_base64_list(self) -> Vec<String> {
        self.pages.into_iter().map(|p| p.data).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Size of one page in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Document-level information read without rendering any page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// One entry per page, in page order.
    pub page_sizes: Vec<PageSize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, data: &str) -> PageImage {
        PageImage {
            page_num: n,
            width: 30,
            height: 20,
            mime_type: "image/jpeg".into(),
            data: data.into(),
        }
    }

    #[test]
    fn data_uri_restores_prefix() {
        assert_eq!(page(1, "QUJD").data_uri(), "data:image/jpeg;base64,QUJD");
        assert_eq!(page(1, "QUJD").decode().unwrap(), b"ABC");
    }

    #[test]
    fn base64_list_keeps_order() {
        let out = ConversionOutput {
            pages: vec![page(1, "AA=="), page(2, "AQ=="), page(3, "Ag==")],
            stats: ConversionStats::default(),
        };
        assert_eq!(out.into_base64_list(), vec!["AA==", "AQ==", "Ag=="]);
    }

    #[test]
    fn output_json_round_trip() {
        let out = ConversionOutput {
            pages: vec![page(1, "AA==")],
            stats: ConversionStats {
                total_pages: 1,
                selected_pages: 1,
                rendered_pages: 1,
                encoded_bytes: 4,
                ..Default::default()
            },
        };
        let json = serde_json::to_string(&out).unwrap();
        let back: ConversionOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }
}
