//! The ledger: a deduplicated CSV of every entry accepted across runs.
//!
//! Keyed by `download_url`. Merging is last-write-wins, and the whole file is
//! rewritten after every run sorted by `(year, school)` descending, so the
//! uniqueness and ordering invariants hold on disk no matter what the
//! previous file looked like. Rewrites go through a temp file and a rename.
//! Only one writer per output prefix is supported.

use crate::error::HarvestError;
use crate::output::ProcessedRecord;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Ledger column order.
pub const LEDGER_COLUMNS: [&str; 7] = [
    "year",
    "school",
    "subject",
    "download_url",
    "text_file",
    "method",
    "text_len",
];

/// In-memory ledger. At most one record per `download_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<ProcessedRecord>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        if !path.exists() {
            debug!("No existing ledger at {}", path.display());
            return Ok(Self::new());
        }

        let corrupt = |detail: String| HarvestError::LedgerCorrupt {
            path: path.to_path_buf(),
            detail,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| corrupt(e.to_string()))?;

        let mut ledger = Self::new();
        for row in reader.deserialize::<ProcessedRecord>() {
            ledger.upsert(row.map_err(|e| corrupt(e.to_string()))?);
        }
        info!("Loaded {} ledger rows from {}", ledger.len(), path.display());
        Ok(ledger)
    }

    /// Insert or replace the record for its `download_url`.
    ///
    /// Returns `true` when the URL was not present before. A replaced record
    /// keeps its position, so ties in the later sort resolve the same way.
    pub fn upsert(&mut self, record: ProcessedRecord) -> bool {
        match self.index.get(&record.download_url) {
            Some(&pos) => {
                self.records[pos] = record;
                false
            }
            None => {
                self.index.insert(record.download_url.clone(), self.records.len());
                self.records.push(record);
                true
            }
        }
    }

    /// Merge a run's accepted records and restore the sort order.
    ///
    /// Merging the same records twice leaves the ledger unchanged.
    pub fn merge<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ProcessedRecord>,
    {
        let mut added = 0usize;
        let mut replaced = 0usize;
        for record in records {
            if self.upsert(record) {
                added += 1;
            } else {
                replaced += 1;
            }
        }
        self.sort();
        debug!("Ledger merge: {} added, {} replaced", added, replaced);
    }

    /// Sort by `(year, school)` descending; equal keys keep their order.
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| b.school.cmp(&a.school))
        });
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.download_url.clone(), pos))
            .collect();
    }

    pub fn get(&self, download_url: &str) -> Option<&ProcessedRecord> {
        self.index.get(download_url).map(|&pos| &self.records[pos])
    }

    pub fn records(&self) -> &[ProcessedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialise to CSV. The header is written even for an empty ledger.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(LEDGER_COLUMNS)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }

    /// Replace the file at `path` with this ledger.
    pub fn save(&self, path: &Path) -> Result<(), HarvestError> {
        let write_err = |source: std::io::Error| HarvestError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let bytes = self
            .to_csv()
            .map_err(|e| HarvestError::Internal(format!("Ledger serialisation failed: {e}")))?;

        let tmp_path = path.with_extension("csv.tmp");
        std::fs::write(&tmp_path, &bytes).map_err(write_err)?;
        std::fs::rename(&tmp_path, path).map_err(write_err)?;

        info!("Wrote {} ledger rows to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ExtractionMethod;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn rec(year: i64, school: &str, url: &str, method: ExtractionMethod, len: usize) -> ProcessedRecord {
        ProcessedRecord {
            year,
            school: school.into(),
            subject: "Math".into(),
            download_url: url.into(),
            text_file: PathBuf::from(format!("/t/{year}_{school}.text")),
            method,
            text_len: len,
        }
    }

    #[test]
    fn new_url_adds_a_row() {
        let mut ledger = Ledger::new();
        ledger.merge([rec(2020, "A", "u1", ExtractionMethod::Pdf, 1000)]);
        ledger.merge([rec(2021, "B", "u2", ExtractionMethod::Ocr, 1500)]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn existing_url_is_replaced_in_place() {
        let mut ledger = Ledger::new();
        ledger.merge([rec(2020, "A", "u1", ExtractionMethod::Pdf, 1000)]);
        ledger.merge([rec(2020, "A", "u1", ExtractionMethod::Cached, 1100)]);
        assert_eq!(ledger.len(), 1);
        let row = ledger.get("u1").unwrap();
        assert_eq!(row.method, ExtractionMethod::Cached);
        assert_eq!(row.text_len, 1100);
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![
            rec(2019, "C", "u3", ExtractionMethod::Pdf, 2000),
            rec(2021, "A", "u1", ExtractionMethod::Ocr, 1500),
        ];
        let mut once = Ledger::new();
        once.merge([rec(2020, "B", "u2", ExtractionMethod::Pdf, 1000)]);
        once.merge(batch.clone());

        let mut twice = once.clone();
        twice.merge(batch);

        assert_eq!(once.to_csv().unwrap(), twice.to_csv().unwrap());
    }

    #[test]
    fn sorted_by_year_then_school_descending() {
        let mut ledger = Ledger::new();
        ledger.merge([
            rec(2019, "Zeta", "a", ExtractionMethod::Pdf, 1),
            rec(2021, "Alpha", "b", ExtractionMethod::Pdf, 1),
            rec(2021, "Beta", "c", ExtractionMethod::Pdf, 1),
            rec(2020, "Mu", "d", ExtractionMethod::Pdf, 1),
        ]);
        let keys: Vec<(i64, &str)> = ledger
            .records()
            .iter()
            .map(|r| (r.year, r.school.as_str()))
            .collect();
        assert_eq!(keys, vec![(2021, "Beta"), (2021, "Alpha"), (2020, "Mu"), (2019, "Zeta")]);
        assert_eq!(ledger.get("a").unwrap().school, "Zeta");
    }

    #[test]
    fn empty_ledger_still_has_header() {
        let csv = String::from_utf8(Ledger::new().to_csv().unwrap()).unwrap();
        assert_eq!(csv, "year,school,subject,download_url,text_file,method,text_len\n");
    }

    #[test]
    fn save_then_load_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usable_cs.csv");

        let mut ledger = Ledger::new();
        ledger.merge([
            rec(2021, "臺北高中", "u1", ExtractionMethod::Ocr, 1500),
            rec(2020, "Alpha, High", "u2", ExtractionMethod::Cached, 1100),
        ]);
        ledger.save(&path).unwrap();

        let loaded = Ledger::load(&path).unwrap();
        assert_eq!(loaded, ledger);
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn duplicate_rows_on_disk_collapse_to_last() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usable.csv");
        std::fs::write(
            &path,
            "year,school,subject,download_url,text_file,method,text_len\n\
             2020,A,Math,u1,/t/a.text,pdf,1000\n\
             2020,A,Math,u1,/t/a.text,cached,1200\n",
        )
        .unwrap();
        let loaded = Ledger::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("u1").unwrap().method, ExtractionMethod::Cached);
    }

    #[test]
    fn unknown_method_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usable.csv");
        std::fs::write(
            &path,
            "year,school,subject,download_url,text_file,method,text_len\n\
             2020,A,Math,u1,/t/a.text,scan,1000\n",
        )
        .unwrap();
        assert!(matches!(
            Ledger::load(&path),
            Err(HarvestError::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn missing_file_is_empty() {
        let ledger = Ledger::load(Path::new("/no/such/usable.csv")).unwrap();
        assert!(ledger.is_empty());
    }
}
