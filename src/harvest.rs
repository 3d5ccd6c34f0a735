//! Run orchestration: walk the catalog, settle every entry, merge the ledger.
//!
//! Entries are processed strictly one after another. Each one ends in an
//! [`EntryOutcome`]; only accepted outcomes reach the ledger, which is merged
//! and rewritten once after the last entry settles.

use crate::catalog::{load_catalog, sort_by_year_desc, CatalogEntry};
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::ledger::Ledger;
use crate::output::{EntryOutcome, ExtractionMethod, HarvestStats, ProcessedRecord};
use crate::pipeline::cache;
use crate::pipeline::command::{CommandRunner, SystemRunner};
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::fetch::HttpFetcher;
use crate::pipeline::ocr::Recognizer;
use crate::pipeline::sanitize::sanitize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where one entry's source document and text artifact live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub pdf: PathBuf,
    pub text: PathBuf,
}

/// Sequences cache probe, fetch, extraction and OCR for each catalog entry.
///
/// The default type parameters are the production components; tests swap
/// in scripted extractors and process runners via [`Harvester::with_components`].
pub struct Harvester<E = PdfiumExtractor, R = SystemRunner> {
    config: HarvestConfig,
    fetcher: HttpFetcher,
    extractor: E,
    recognizer: Recognizer<R>,
}

impl Harvester {
    /// Production harvester: pdfium extraction and real `pdftoppm`/`tesseract`.
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestError> {
        Self::with_components(config, PdfiumExtractor::from_env(), SystemRunner)
    }
}

impl<E: TextExtractor, R: CommandRunner> Harvester<E, R> {
    pub fn with_components(config: HarvestConfig, extractor: E, runner: R) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::new(config.download_timeout_secs)?;
        let recognizer = Recognizer::new(runner, &config.rasterizer, &config.recognizer, config.dpi);
        Ok(Self {
            config,
            fetcher,
            extractor,
            recognizer,
        })
    }

    /// Deterministic artifact locations: `{year}_{sanitized school}.pdf|.text`.
    pub fn artifact_paths(&self, entry: &CatalogEntry) -> ArtifactPaths {
        let stem = format!("{}_{}", entry.year, sanitize(&entry.school));
        ArtifactPaths {
            pdf: self.config.pdf_dir().join(format!("{stem}.pdf")),
            text: self.config.text_dir().join(format!("{stem}.text")),
        }
    }

    /// Process the whole (sorted, windowed) catalog and rewrite the ledger.
    ///
    /// # Errors
    /// Only fatal conditions: unreadable or malformed catalog, corrupt
    /// ledger, or an output file that cannot be written. Per-entry download
    /// and extraction failures are counted in the returned stats instead.
    pub async fn run(&self) -> Result<HarvestStats, HarvestError> {
        let start = Instant::now();
        let config = &self.config;
        info!(
            "Starting harvest: catalog={} out={} min_len={} ocr={}",
            config.catalog_path.display(),
            config.out,
            config.min_len,
            config.use_ocr
        );

        // ── Step 1: Load, sort and window the catalog ────────────────────────
        let mut entries = load_catalog(&config.catalog_path)?;
        sort_by_year_desc(&mut entries);
        let window = config.window(&entries);
        let total = window.len();
        debug!(
            "Window: offset={} limit={:?} → {} of {} entries",
            config.offset,
            config.limit,
            total,
            entries.len()
        );

        // ── Step 2: Prepare output directories ───────────────────────────────
        for dir in [config.pdf_dir(), config.text_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| HarvestError::OutputWriteFailed { path: dir.clone(), source })?;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_run_start(total);
        }

        // ── Step 3: Settle every entry ───────────────────────────────────────
        let mut stats = HarvestStats {
            selected: total,
            ..HarvestStats::default()
        };
        let mut accepted = Vec::new();

        for (i, entry) in window.iter().enumerate() {
            if let Some(ref cb) = config.progress_callback {
                cb.on_entry_start(i + 1, total, entry);
            }

            let outcome = self.process_entry(entry).await?;
            stats.record(&outcome);

            if let Some(ref cb) = config.progress_callback {
                cb.on_entry_complete(i + 1, total, &outcome);
            }
            if let Some(record) = outcome.into_record() {
                accepted.push(record);
            }
        }

        // ── Step 4: Merge and rewrite the ledger ─────────────────────────────
        let ledger_path = config.ledger_path();
        let mut ledger = Ledger::load(&ledger_path)?;
        ledger.merge(accepted);
        ledger.save(&ledger_path)?;

        stats.ledger_rows = ledger.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Harvest complete: {}/{} accepted ({} cached, {} pdf, {} ocr), {} rejected, {} skipped, {} ledger rows, {}ms",
            stats.accepted(),
            stats.selected,
            stats.cached,
            stats.extracted,
            stats.recognized,
            stats.rejected,
            stats.skipped,
            stats.ledger_rows,
            stats.duration_ms
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_run_complete(&stats);
        }

        Ok(stats)
    }

    /// Drive one entry to a terminal state.
    ///
    /// Returns `Err` only when an accepted text artifact cannot be written.
    pub async fn process_entry(&self, entry: &CatalogEntry) -> Result<EntryOutcome, HarvestError> {
        let min_len = self.config.min_len;
        let url = &entry.download_url;
        let paths = self.artifact_paths(entry);

        if let Some(hit) = cache::probe(&paths.text, min_len).await {
            debug!("Cached: {} ({} chars)", url, hit.text_len);
            return Ok(EntryOutcome::Accepted(ProcessedRecord::new(
                entry,
                paths.text,
                ExtractionMethod::Cached,
                hit.text_len,
            )));
        }

        if let Err(error) = self.fetcher.fetch(url, &paths.pdf).await {
            warn!("Skipping {}: {}", url, error);
            return Ok(EntryOutcome::Skipped {
                url: url.clone(),
                error,
            });
        }

        let mut method = ExtractionMethod::Pdf;
        let mut text = match self.extractor.extract(&paths.pdf).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{}", e);
                String::new()
            }
        };
        let mut text_len = text.chars().count();

        if text_len < min_len && self.config.use_ocr {
            info!(
                "Text layer too short for {} ({} < {}), running OCR",
                url, text_len, min_len
            );
            match self.recognizer.recognize(&paths.pdf, &self.config.ocr_lang).await {
                Ok(recovered) => {
                    text = recovered;
                    method = ExtractionMethod::Ocr;
                }
                Err(e) => {
                    warn!("OCR failed for {}: {}", url, e);
                    text.clear();
                }
            }
            text_len = text.chars().count();
        }

        if text_len < min_len {
            info!("Rejected {}: {} chars < {}", url, text_len, min_len);
            return Ok(EntryOutcome::Rejected {
                url: url.clone(),
                text_len,
            });
        }

        write_text(&paths.text, &text).await?;
        info!("Accepted {} via {} ({} chars)", url, method, text_len);
        Ok(EntryOutcome::Accepted(ProcessedRecord::new(
            entry, paths.text, method, text_len,
        )))
    }
}

/// Run a harvest with the production components.
pub async fn harvest(config: &HarvestConfig) -> Result<HarvestStats, HarvestError> {
    Harvester::new(config.clone())?.run().await
}

/// Synchronous wrapper around [`harvest`].
///
/// Creates a temporary tokio runtime internally.
pub fn harvest_sync(config: &HarvestConfig) -> Result<HarvestStats, HarvestError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| HarvestError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(harvest(config))
}

/// Atomic write: temp file, then rename, so a crash never leaves a
/// truncated artifact that a later cache probe could accept.
async fn write_text(path: &Path, text: &str) -> Result<(), HarvestError> {
    let write_err = |source: std::io::Error| HarvestError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("text.tmp");
    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryError;
    use crate::pipeline::command::CommandOutput;
    use std::ffi::OsString;

    struct NoText;

    impl TextExtractor for NoText {
        async fn extract(&self, pdf_path: &Path) -> Result<String, EntryError> {
            Err(EntryError::ExtractionFailed {
                path: pdf_path.to_path_buf(),
                detail: "no text layer".into(),
            })
        }
    }

    struct NoTools;

    impl CommandRunner for NoTools {
        fn locate(&self, _program: &str) -> Option<PathBuf> {
            None
        }

        async fn run(&self, _program: &Path, _args: &[OsString]) -> std::io::Result<CommandOutput> {
            unreachable!("nothing is located, so nothing runs")
        }
    }

    fn harvester(base: &Path) -> Harvester<NoText, NoTools> {
        let config = HarvestConfig::builder(base.join("catalog.csv"), "cs")
            .base_dir(base)
            .build()
            .unwrap();
        Harvester::with_components(config, NoText, NoTools).unwrap()
    }

    fn entry(school: &str) -> CatalogEntry {
        CatalogEntry {
            year: 2021,
            school: school.into(),
            subject: "Math".into(),
            download_url: "http://127.0.0.1:9/a.pdf".into(),
        }
    }

    #[test]
    fn artifact_paths_are_deterministic() {
        let h = harvester(Path::new("/data"));
        let paths = h.artifact_paths(&entry("Alpha High"));
        assert_eq!(paths.pdf, PathBuf::from("/data/pdfs_cs/2021_Alpha_High.pdf"));
        assert_eq!(paths.text, PathBuf::from("/data/texts_cs/2021_Alpha_High.text"));
    }

    #[tokio::test]
    async fn missing_tools_reject_the_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let h = harvester(dir.path());
        let e = entry("Alpha High");
        let paths = h.artifact_paths(&e);
        std::fs::create_dir_all(paths.pdf.parent().unwrap()).unwrap();
        std::fs::write(&paths.pdf, b"%PDF-1.4").unwrap();

        let outcome = h.process_entry(&e).await.unwrap();
        assert_eq!(
            outcome,
            EntryOutcome::Rejected {
                url: e.download_url.clone(),
                text_len: 0,
            }
        );
        assert!(!paths.text.exists());
    }

    #[tokio::test]
    async fn write_text_replaces_atomically() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("texts_cs").join("2021_A.text");
        write_text(&path, "first").await.unwrap();
        write_text(&path, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("text.tmp").exists());
    }
}
