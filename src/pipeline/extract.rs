//! Fast path: pull the embedded text layer out of a PDF with pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. The whole document is
//! processed on the blocking pool, and a panic inside pdfium surfaces as a
//! join error that is reported like any other extraction failure.
//!
//! Scanned exams usually have no text layer at all; that comes back as an
//! empty or very short string, not an error.

use crate::error::EntryError;
use pdfium_render::prelude::*;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Best-effort text extraction from a local document.
pub trait TextExtractor: Send + Sync {
    /// Extract all text from `pdf_path`.
    ///
    /// Callers treat `Err` the same as "no text"; the error exists for logging.
    fn extract(&self, pdf_path: &Path) -> impl Future<Output = Result<String, EntryError>> + Send;
}

/// [`TextExtractor`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Bind to the library named by `PDFIUM_LIB_PATH`, else the system library.
    pub fn from_env() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Bind to a specific library file or directory.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }
}

impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, pdf_path: &Path) -> Result<String, EntryError> {
        let path = pdf_path.to_path_buf();
        let library = self.library_path.clone();

        tokio::task::spawn_blocking(move || extract_blocking(&path, library.as_deref()))
            .await
            .map_err(|e| EntryError::ExtractionFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("extraction task panicked: {e}"),
            })?
    }
}

fn bind(library: Option<&Path>) -> Result<Pdfium, PdfiumError> {
    let bindings = match library {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))?
        }
        Some(p) => Pdfium::bind_to_library(p)?,
        None => Pdfium::bind_to_system_library()?,
    };
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of text extraction.
fn extract_blocking(pdf_path: &Path, library: Option<&Path>) -> Result<String, EntryError> {
    let failed = |detail: String| EntryError::ExtractionFailed {
        path: pdf_path.to_path_buf(),
        detail,
    };

    let pdfium = bind(library).map_err(|e| failed(format!("cannot bind pdfium: {e:?}")))?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| failed(format!("{e:?}")))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| failed(format!("page {}: {e:?}", idx + 1)))?;
        pages.push(text.all());
    }

    let text = pages.join("\n");
    debug!(
        "Extracted {} chars from {} page(s) of {}",
        text.chars().count(),
        pages.len(),
        pdf_path.display()
    );
    Ok(text)
}
