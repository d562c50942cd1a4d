//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! pdfium loads documents straight from memory, so every input ends up as an
//! owned `Vec<u8>` that is moved into the conversion and dropped with it.
//! Local paths must carry a `.pdf` extension; every buffer must carry a
//! `%PDF` header so callers get a precise error instead of a pdfium one.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How far into the file the `%PDF` marker may appear.
///
/// Readers tolerate leading garbage before the header; 1024 bytes is the
/// window Acrobat accepts.
const HEADER_WINDOW: usize = 1024;

/// A resolved input: a display name and the document bytes.
#[derive(Debug)]
pub struct ResolvedInput {
    /// Path or URL as given, used in logs and error messages.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// `true` for paths ending in `.pdf`, in any letter case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Verify the `%PDF` marker appears near the start of `bytes`.
pub fn check_pdf_header(bytes: &[u8], input: &str) -> Result<(), ConvertError> {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    if window.windows(4).any(|w| w == b"%PDF") {
        return Ok(());
    }
    Err(ConvertError::NotAPdf {
        input: input.to_string(),
        magic: bytes.iter().take(4).copied().collect(),
    })
}

/// Resolve the input string to PDF bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    let resolved = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    check_pdf_header(&resolved.bytes, &resolved.name)?;
    Ok(resolved)
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, ConvertError> {
    let path = PathBuf::from(path_str);

    if !has_pdf_extension(&path) {
        return Err(ConvertError::InvalidInput {
            input: path_str.to_string(),
            reason: "only .pdf files are accepted".into(),
        });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied { path: path.clone() },
        _ => ConvertError::FileNotFound { path: path.clone() },
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedInput {
        name: path_str.to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ConvertError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| ConvertError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(ResolvedInput {
        name: url.to_string(),
        bytes: bytes.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("a/b/report.pdf")));
        assert!(has_pdf_extension(Path::new("REPORT.PDF")));
        assert!(!has_pdf_extension(Path::new("report.pdf.txt")));
        assert!(!has_pdf_extension(Path::new("report")));
    }

    #[test]
    fn header_may_follow_leading_bytes() {
        assert!(check_pdf_header(b"%PDF-1.7\n", "a").is_ok());
        let mut padded = vec![b' '; 500];
        padded.extend_from_slice(b"%PDF-1.4");
        assert!(check_pdf_header(&padded, "a").is_ok());
    }

    #[test]
    fn header_missing_or_too_late() {
        match check_pdf_header(b"GIF89a....", "pic.pdf") {
            Err(ConvertError::NotAPdf { input, magic }) => {
                assert_eq!(input, "pic.pdf");
                assert_eq!(magic, b"GIF8");
            }
            other => panic!("expected NotAPdf, got {other:?}"),
        }
        let mut late = vec![0u8; HEADER_WINDOW];
        late.extend_from_slice(b"%PDF-1.4");
        assert!(check_pdf_header(&late, "a").is_err());
        assert!(check_pdf_header(b"", "a").is_err());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected_before_reading() {
        let err = resolve_input("/definitely/not/here.docx", 5).await.unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.pdf");
        std::fs::write(&good, b"%PDF-1.4\n%%EOF\n").unwrap();
        let resolved = resolve_input(good.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.bytes, b"%PDF-1.4\n%%EOF\n");

        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"hello world").unwrap();
        let err = resolve_input(bad.to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, ConvertError::NotAPdf { .. }));
    }
}
