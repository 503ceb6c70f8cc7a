//! Text extraction from paper files.
//!
//! PDFs are read with lopdf, limited to the opening pages; the
//! abstract, introduction, and conclusions are what the screening
//! prompt needs. Plain-text files pass through unchanged.

use anyhow::{Context, Result};
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Extract text from a paper file.
///
/// `max_pages` bounds how many PDF pages are read; it has no effect on
/// plain-text files. Returns an error when the file yields no
/// extractable text, so callers can skip the paper instead of sending
/// an empty prompt.
pub fn extract_text(path: &Path, max_pages: usize) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let text = match ext.as_str() {
        "pdf" => extract_pdf_text(path, max_pages)?,
        _ => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
    };

    if text.trim().is_empty() {
        anyhow::bail!("No extractable text in {}", path.display());
    }

    Ok(text)
}

/// Extract text from the first `max_pages` pages of a PDF.
fn extract_pdf_text(path: &Path, max_pages: usize) -> Result<String> {
    let doc = Document::load(path)
        .with_context(|| format!("Failed to load PDF {}", path.display()))?;

    let pages = doc.get_pages();
    let page_numbers: Vec<u32> = pages.keys().copied().take(max_pages).collect();
    debug!(
        "Extracting {} of {} pages from {}",
        page_numbers.len(),
        pages.len(),
        path.display()
    );

    doc.extract_text(&page_numbers)
        .with_context(|| format!("Failed to extract text from {}", path.display()))
}
