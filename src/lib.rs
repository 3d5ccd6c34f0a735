//! # exam-texts
//!
//! Collect past exam papers listed in a catalog CSV, turn each one into a
//! plain-text artifact, and keep a deduplicated ledger of the papers whose
//! text is long enough to be useful.
//!
//! ## Pipeline Overview
//!
//! ```text
//! catalog.csv
//!  │
//!  ├─ 1. Catalog  load, sort by year (newest first), apply offset/limit
//!  ├─ 2. Cache    reuse an existing text artifact that meets the threshold
//!  ├─ 3. Fetch    download the PDF once (streamed, atomic rename)
//!  ├─ 4. Extract  embedded text layer via pdfium (spawn_blocking)
//!  ├─ 5. OCR      pdftoppm → tesseract, only when the text layer is short
//!  └─ 6. Ledger   merge accepted rows by URL, sort, rewrite usable_{out}.csv
//! ```
//!
//! On-disk layout under the base directory:
//!
//! ```text
//! {base}/pdfs_{out}/{year}_{school}.pdf
//! {base}/texts_{out}/{year}_{school}.text
//! {base}/usable_{out}.csv
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exam_texts::{harvest, HarvestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarvestConfig::builder("catalog.csv", "computer_concepts")
//!         .min_len(1000)
//!         .build()?;
//!     let stats = harvest(&config).await?;
//!     eprintln!("{} accepted, {} ledger rows", stats.accepted(), stats.ledger_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! The fast path needs a pdfium shared library (system-wide, or named by
//! `PDFIUM_LIB_PATH`). The OCR fallback needs `pdftoppm` (poppler-utils) and
//! `tesseract` with the requested language data on `PATH`. A missing tool
//! only affects the entries that need it.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `collect-exam-texts` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod harvest;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{load_catalog, CatalogEntry};
pub use config::{HarvestConfig, HarvestConfigBuilder};
pub use error::{EntryError, HarvestError};
pub use harvest::{harvest, harvest_sync, ArtifactPaths, Harvester};
pub use ledger::Ledger;
pub use output::{EntryOutcome, ExtractionMethod, HarvestStats, ProcessedRecord};
pub use pipeline::command::{CommandOutput, CommandRunner, SystemRunner};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::sanitize::sanitize;
pub use progress::{HarvestProgressCallback, NoopProgressCallback, ProgressCallback};
