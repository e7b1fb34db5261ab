//! PDF text extraction via pdfium: one logical document per page.
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not run on an async worker thread, so the
//! extraction is moved onto the blocking pool with `spawn_blocking`.

use crate::error::KeywordError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the text of every page, in page order.
///
/// Pages without a text layer (scans) come back as empty strings and
/// produce no chunks downstream.
pub async fn extract_pages(pdf_path: &Path) -> Result<Vec<String>, KeywordError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || extract_pages_blocking(&path))
        .await
        .map_err(|e| KeywordError::Internal(format!("PDF extraction task panicked: {}", e)))?
}

/// Blocking implementation of page text extraction.
fn extract_pages_blocking(pdf_path: &Path) -> Result<Vec<String>, KeywordError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| KeywordError::CorruptDocument {
            path: pdf_path.to_path_buf(),
            format: "PDF",
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| KeywordError::CorruptDocument {
                path: pdf_path.to_path_buf(),
                format: "PDF",
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        debug!("Page {}: {} chars of text", idx + 1, text.chars().count());
        texts.push(text);
    }

    Ok(texts)
}

/// Bind to `PDFIUM_LIB_PATH` when set, otherwise to the system library.
fn bind_pdfium() -> Result<Pdfium, KeywordError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Binding pdfium from {}", path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| KeywordError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
