//! Result types: accepted records, per-entry outcomes and run statistics.

use crate::catalog::CatalogEntry;
use crate::error::EntryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How the text of an accepted record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// An existing text artifact already met the threshold.
    Cached,
    /// Direct text extraction from the PDF.
    Pdf,
    /// Rasterisation followed by OCR.
    Ocr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionMethod::Cached => "cached",
            ExtractionMethod::Pdf => "pdf",
            ExtractionMethod::Ocr => "ocr",
        };
        f.write_str(s)
    }
}

/// One ledger row: a catalog entry plus where and how its text was produced.
///
/// Field order is the ledger's column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub year: i64,
    pub school: String,
    pub subject: String,
    pub download_url: String,
    pub text_file: PathBuf,
    pub method: ExtractionMethod,
    pub text_len: usize,
}

impl ProcessedRecord {
    pub fn new(
        entry: &CatalogEntry,
        text_file: PathBuf,
        method: ExtractionMethod,
        text_len: usize,
    ) -> Self {
        Self {
            year: entry.year,
            school: entry.school.clone(),
            subject: entry.subject.clone(),
            download_url: entry.download_url.clone(),
            text_file,
            method,
            text_len,
        }
    }
}

/// Terminal state of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryOutcome {
    /// Text was produced (or reused) and meets the threshold.
    Accepted(ProcessedRecord),
    /// Text was obtained but is shorter than the threshold.
    Rejected { url: String, text_len: usize },
    /// The entry could not be processed this run.
    Skipped { url: String, error: EntryError },
}

impl EntryOutcome {
    /// The accepted record, if any.
    pub fn record(&self) -> Option<&ProcessedRecord> {
        match self {
            EntryOutcome::Accepted(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<ProcessedRecord> {
        match self {
            EntryOutcome::Accepted(record) => Some(record),
            _ => None,
        }
    }
}

/// Counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestStats {
    /// Entries left after sorting and windowing.
    pub selected: usize,
    /// Accepted from an existing text artifact.
    pub cached: usize,
    /// Accepted via direct PDF text extraction.
    pub extracted: usize,
    /// Accepted via OCR.
    pub recognized: usize,
    /// Text obtained but under the threshold.
    pub rejected: usize,
    /// Entries whose document could not be downloaded.
    pub skipped: usize,
    /// Rows in the ledger after the merge.
    pub ledger_rows: usize,
    pub duration_ms: u64,
}

impl HarvestStats {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Accepted(r) => match r.method {
                ExtractionMethod::Cached => self.cached += 1,
                ExtractionMethod::Pdf => self.extracted += 1,
                ExtractionMethod::Ocr => self.recognized += 1,
            },
            EntryOutcome::Rejected { .. } => self.rejected += 1,
            EntryOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Entries that produced a ledger record this run.
    pub fn accepted(&self) -> usize {
        self.cached + self.extracted + self.recognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&ExtractionMethod::Ocr).unwrap(), "\"ocr\"");
        assert_eq!(ExtractionMethod::Cached.to_string(), "cached");
    }

    #[test]
    fn stats_count_each_outcome() {
        let entry = CatalogEntry {
            year: 2021,
            school: "Alpha High".into(),
            subject: "Math".into(),
            download_url: "http://x/a.pdf".into(),
        };
        let mut stats = HarvestStats::default();
        stats.record(&EntryOutcome::Accepted(ProcessedRecord::new(
            &entry,
            PathBuf::from("t"),
            ExtractionMethod::Pdf,
            1200,
        )));
        stats.record(&EntryOutcome::Rejected {
            url: "u".into(),
            text_len: 3,
        });
        stats.record(&EntryOutcome::Skipped {
            url: "u".into(),
            error: EntryError::ToolUnavailable {
                tool: "pdftoppm".into(),
            },
        });
        assert_eq!(stats.extracted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.accepted(), 1);
    }
}
