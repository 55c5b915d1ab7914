//! Document loading.
//!
//! Reads a source file and produces its pages in document order. PDF files
//! yield one page per PDF page; text and Markdown files are split on form
//! feeds (the separator `pdftotext` and friends emit between pages).

use std::path::Path;

use super::types::{Document, Page};
use crate::error::{DoclensError, DoclensResult};

/// Page separator for plain text documents.
const FORM_FEED: char = '\u{000C}';

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "text" | "md" | "markdown" => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

/// Load a document from disk.
///
/// Fails with a load error if the file is missing, unreadable, of an
/// unsupported format, or cannot be parsed. No partial result is returned.
pub fn load(path: impl AsRef<Path>) -> DoclensResult<Document> {
    let path = path.as_ref();

    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| DoclensError::load(path, "unsupported document format"))?;

    let bytes = std::fs::read(path).map_err(|e| DoclensError::load(path, e.to_string()))?;

    let pages = match format {
        DocumentFormat::Pdf => pdf_pages(path, &bytes)?,
        DocumentFormat::Text => text_pages(path, &bytes)?,
    };

    tracing::debug!(
        target: "ingest",
        "loaded {} page(s) from {}",
        pages.len(),
        path.display()
    );

    Ok(Document::new(path, pages))
}

fn text_pages(path: &Path, bytes: &[u8]) -> DoclensResult<Vec<Page>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DoclensError::load(path, format!("not valid UTF-8: {e}")))?;

    let mut parts: Vec<&str> = text.split(FORM_FEED).collect();
    // A trailing separator closes the last page rather than opening a new one
    if parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }

    Ok(parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| Page::new(part, (i + 1) as u32, path))
        .collect())
}

fn pdf_pages(path: &Path, bytes: &[u8]) -> DoclensResult<Vec<Page>> {
    let pdf = lopdf::Document::load_mem(bytes)
        .map_err(|e| DoclensError::load(path, format!("invalid PDF: {e}")))?;

    if pdf.is_encrypted() {
        return Err(DoclensError::load(path, "encrypted PDFs are not supported"));
    }

    let mut pages = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        let text = pdf.extract_text(&[page_number]).map_err(|e| {
            DoclensError::load(path, format!("failed to extract page {page_number}: {e}"))
        })?;
        pages.push(Page::new(text, page_number, path));
    }

    Ok(pages)
}
