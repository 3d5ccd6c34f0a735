//! Pipeline stages for harvesting one catalog entry.
//!
//! Each submodule implements exactly one step; [`crate::harvest`] sequences
//! them and owns the acceptance decision.
//!
//! ## Data Flow
//!
//! ```text
//! cache ──hit──▶ accept (cached)
//!   │miss
//!   ▼
//! fetch ──▶ extract ──long enough──▶ accept (pdf)
//!  (HTTP)   (pdfium)      │short
//!                         ▼
//!                        ocr ──long enough──▶ accept (ocr)
//!                 (pdftoppm + tesseract)
//! ```
//!
//! 1. [`sanitize`]: filesystem-safe token for artifact names
//! 2. [`cache`]   : reuse a text artifact from an earlier run
//! 3. [`fetch`]   : idempotent download of the source PDF
//! 4. [`extract`] : pdfium text layer, on the blocking pool
//! 5. [`ocr`]     : rasterise + recognise over a private temp workspace
//! 6. [`command`] : the process-execution seam used by [`ocr`]

pub mod cache;
pub mod command;
pub mod extract;
pub mod fetch;
pub mod ocr;
pub mod sanitize;
