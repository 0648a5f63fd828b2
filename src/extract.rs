//! Page-level text extraction for source files.
//!
//! Source adapters hand this module raw bytes plus a content type and get
//! back one string per page. PDF pages come from the document's page tree;
//! plain text is split on form feeds (`\x0C`), the page break emitted by
//! `pdftotext` and most printers' text exports.

use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Maximum input size accepted for extraction.
pub const MAX_INPUT_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("input of {0} bytes exceeds the size limit")]
    TooLarge(usize),
}

/// Map a file extension to the content type used by [`extract_pages`].
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" | "text" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        _ => None,
    }
}

/// Extract page texts from `bytes`, in document order.
///
/// Pages are returned raw; whitespace normalization and blank-page
/// removal happen in the chunker.
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<String>, ExtractError> {
    if bytes.len() > MAX_INPUT_BYTES {
        return Err(ExtractError::TooLarge(bytes.len()));
    }
    match content_type {
        MIME_PDF => extract_pdf_pages(bytes),
        MIME_TEXT | MIME_MARKDOWN => {
            let text = String::from_utf8(bytes.to_vec())?;
            Ok(split_text_pages(&text))
        }
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Split text on form feeds; text without any is a single page.
pub fn split_text_pages(text: &str) -> Vec<String> {
    text.split('\u{000C}').map(str::to_string).collect()
}
