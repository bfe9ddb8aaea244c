//! PDF text extraction
//!
//! Decrypts (when needed) and linearizes a statement PDF into an ordered
//! sequence of text lines for the statement parser. Pages are joined with a
//! newline in page order.

use lopdf::Document;
use tracing::debug;

use crate::error::{Result, StatementError};

/// Extract the text of a PDF as an ordered sequence of lines.
///
/// If the document is encrypted, `password` is required and a failed
/// authentication is fatal for this attachment's extraction.
pub fn extract_text_lines(bytes: &[u8], password: Option<&str>) -> Result<Vec<String>> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| StatementError::PdfExtract(e.to_string()))?;

    if doc.is_encrypted() {
        let password = password.ok_or_else(|| {
            StatementError::PdfDecrypt("document is encrypted but no password is configured".into())
        })?;
        doc.decrypt(password)
            .map_err(|e| StatementError::PdfDecrypt(e.to_string()))?;
        debug!("decrypted statement PDF");
    }

    let mut text = String::new();
    for (page_num, _page_id) in doc.get_pages() {
        let page_text = doc
            .extract_text(&[page_num])
            .map_err(|e| StatementError::PdfExtract(format!("page {}: {}", page_num, e)))?;
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&page_text);
    }

    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_fail_with_extract_error() {
        let result = extract_text_lines(b"not a pdf", None);
        assert!(matches!(result, Err(StatementError::PdfExtract(_))));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(extract_text_lines(&[], None).is_err());
    }
}
