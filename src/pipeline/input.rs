//! Text extraction: uploaded PDF bytes → plain text.
//!
//! pdfium reads the text layer page by page. A page whose text cannot be
//! read is skipped with a warning; the pages that worked are concatenated,
//! each followed by a newline. Only a document that yields no text at all
//! is an error, since the analyst prompt has nothing to work on.
//!
//! pdfium is not async-safe, so callers run [`TextSource::extract_text`]
//! inside `spawn_blocking`.

use crate::error::ReportError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Source of plain text for a PDF upload.
pub trait TextSource: Send + Sync {
    /// `name` is the upload's file name, used only in error messages.
    fn extract_text(&self, name: &str, pdf: &[u8]) -> Result<String, ReportError>;
}

/// Production [`TextSource`] backed by pdfium.
///
/// The library is bound on every call, in this order:
/// 1. `PDFIUM_LIB_PATH` (a file or a directory containing libpdfium),
/// 2. libpdfium in the working directory,
/// 3. the system library search path.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextSource;

impl TextSource for PdfiumTextSource {
    fn extract_text(&self, name: &str, pdf: &[u8]) -> Result<String, ReportError> {
        check_pdf_magic(name, pdf)?;

        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ReportError::InputFailed {
                name: name.to_string(),
                detail: format!("pdfium could not open the document: {e:?}"),
            })?;

        let pages = document.pages();
        info!("PDF '{}' loaded: {} pages", name, pages.len());

        let mut full_text = String::new();
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => {
                    let text = text.all();
                    if !text.is_empty() {
                        debug!("Page {}: {} chars", idx + 1, text.len());
                        full_text.push_str(&text);
                        full_text.push('\n');
                    }
                }
                Err(e) => warn!("Page {}: text extraction failed: {:?}", idx + 1, e),
            }
        }

        ensure_usable(name, full_text)
    }
}

/// Reject uploads that are obviously not PDFs before pdfium sees them.
pub fn check_pdf_magic(name: &str, bytes: &[u8]) -> Result<(), ReportError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(ReportError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Fail with [`ReportError::InputFailed`] when `text` has nothing but whitespace.
pub fn ensure_usable(name: &str, text: String) -> Result<String, ReportError> {
    if text.trim().is_empty() {
        return Err(ReportError::InputFailed {
            name: name.to_string(),
            detail: "the PDF has no readable text layer".into(),
        });
    }
    Ok(text)
}

fn bind_pdfium() -> Result<Pdfium, ReportError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ReportError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}
