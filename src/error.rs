//! Error types for the exam-texts library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`HarvestError`] is **fatal**: the run cannot proceed at all (catalog
//!   missing or malformed, ledger unreadable, text artifact not writable).
//!   Returned as `Err(HarvestError)` from [`crate::harvest::harvest`].
//!
//! * [`EntryError`] is **non-fatal**: a single catalog entry failed (network
//!   error, unreadable PDF, OCR tools missing). The entry is skipped or
//!   rejected for this run and the rest of the catalog continues; the error
//!   is carried inside [`crate::output::EntryOutcome`] for reporting.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the exam-texts library.
#[derive(Debug, Error)]
pub enum HarvestError {
    // ── Catalog errors ────────────────────────────────────────────────────
    /// Catalog file was not found at the given path.
    #[error("Catalog file not found: '{path}'\nCheck the --csv path exists and is readable.")]
    CatalogNotFound { path: PathBuf },

    /// Catalog could not be opened or parsed as CSV.
    #[error("Failed to read catalog '{path}': {detail}")]
    CatalogRead { path: PathBuf, detail: String },

    /// A catalog row is missing a column or carries a non-numeric year.
    #[error("Malformed catalog row at line {line}: {detail}")]
    MalformedCatalogRow { line: u64, detail: String },

    // ── Ledger errors ─────────────────────────────────────────────────────
    /// Existing ledger file exists but cannot be parsed.
    #[error("Ledger '{path}' is corrupt: {detail}\nFix or remove the file and run again.")]
    LedgerCorrupt { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a text artifact, directory or the ledger.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum EntryError {
    /// Transport failure or non-success HTTP status.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The text-extraction library could not read the document.
    #[error("Text extraction failed for '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// A required external binary is not on `PATH`.
    #[error("Required tool '{tool}' not found on PATH")]
    ToolUnavailable { tool: String },

    /// The rasterizer could not be started or exited non-zero.
    #[error("Rasterisation failed for '{path}': {detail}")]
    RasterisationFailed { path: PathBuf, detail: String },

    /// The scratch directory for page images could not be created or listed.
    #[error("OCR workspace error: {detail}")]
    WorkspaceFailed { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_row_display() {
        let e = HarvestError::MalformedCatalogRow {
            line: 7,
            detail: "invalid digit found in string".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("line 7"), "got: {msg}");
        assert!(msg.contains("invalid digit"));
    }

    #[test]
    fn download_timeout_display() {
        let e = EntryError::DownloadTimeout {
            url: "http://x/a.pdf".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert!(e.to_string().contains("http://x/a.pdf"));
    }

    #[test]
    fn tool_unavailable_display() {
        let e = EntryError::ToolUnavailable {
            tool: "tesseract".into(),
        };
        assert!(e.to_string().contains("tesseract"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = HarvestError::OutputWriteFailed {
            path: PathBuf::from("/tmp/usable_x.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("usable_x.csv"));
    }

    #[test]
    fn entry_error_serialises() {
        let e = EntryError::WorkspaceFailed {
            detail: "disk full".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("WorkspaceFailed"));
    }
}
