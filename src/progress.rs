//! Progress-callback trait for per-entry harvesting events.
//!
//! Inject an [`Arc<dyn HarvestProgressCallback>`] via
//! [`crate::config::HarvestConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the catalog. The CLI uses it to drive an
//! `indicatif` progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use exam_texts::{EntryOutcome, HarvestConfig, HarvestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct AcceptCounter {
//!     accepted: AtomicUsize,
//! }
//!
//! impl HarvestProgressCallback for AcceptCounter {
//!     fn on_entry_complete(&self, _index: usize, _total: usize, outcome: &EntryOutcome) {
//!         if outcome.record().is_some() {
//!             self.accepted.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(AcceptCounter { accepted: AtomicUsize::new(0) });
//! let config = HarvestConfig::builder("catalog.csv", "cs")
//!     .progress_callback(counter as Arc<dyn HarvestProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::catalog::CatalogEntry;
use crate::output::{EntryOutcome, HarvestStats};
use std::sync::Arc;

/// Called by the pipeline as it processes each catalog entry.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Entries are processed sequentially, but the trait
/// is `Send + Sync` so it can be shared with other tasks.
pub trait HarvestProgressCallback: Send + Sync {
    /// Called once after the catalog has been sorted and windowed.
    ///
    /// # Arguments
    /// * `total_entries`: number of entries that will be processed
    fn on_run_start(&self, total_entries: usize) {
        let _ = total_entries;
    }

    /// Called before the cache probe for an entry.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position within the window
    /// * `total`: window size
    /// * `entry`: the catalog entry about to be processed
    fn on_entry_start(&self, index: usize, total: usize, entry: &CatalogEntry) {
        let _ = (index, total, entry);
    }

    /// Called when an entry reaches a terminal state.
    fn on_entry_complete(&self, index: usize, total: usize, outcome: &EntryOutcome) {
        let _ = (index, total, outcome);
    }

    /// Called once after the ledger has been rewritten.
    fn on_run_complete(&self, stats: &HarvestStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl HarvestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::HarvestConfig`].
pub type ProgressCallback = Arc<dyn HarvestProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        skips: AtomicUsize,
        finished_rows: AtomicUsize,
    }

    impl HarvestProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_entries: usize) {
            self.started_total.store(total_entries, Ordering::SeqCst);
        }

        fn on_entry_start(&self, _index: usize, _total: usize, _entry: &CatalogEntry) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_entry_complete(&self, _index: usize, _total: usize, outcome: &EntryOutcome) {
            if matches!(outcome, EntryOutcome::Skipped { .. }) {
                self.skips.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_run_complete(&self, stats: &HarvestStats) {
            self.finished_rows.store(stats.ledger_rows, Ordering::SeqCst);
        }
    }

    fn entry() -> CatalogEntry {
        CatalogEntry {
            year: 2021,
            school: "Alpha High".into(),
            subject: "Math".into(),
            download_url: "http://x/a.pdf".into(),
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_entry_start(1, 3, &entry());
        cb.on_entry_complete(
            1,
            3,
            &EntryOutcome::Rejected {
                url: "http://x/a.pdf".into(),
                text_len: 10,
            },
        );
        cb.on_run_complete(&HarvestStats::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_run_start(2);
        tracker.on_entry_start(1, 2, &entry());
        tracker.on_entry_complete(
            1,
            2,
            &EntryOutcome::Skipped {
                url: "http://x/a.pdf".into(),
                error: EntryError::DownloadFailed {
                    url: "http://x/a.pdf".into(),
                    reason: "HTTP 404".into(),
                },
            },
        );
        tracker.on_run_complete(&HarvestStats {
            ledger_rows: 4,
            ..HarvestStats::default()
        });

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.finished_rows.load(Ordering::SeqCst), 4);
    }
}
