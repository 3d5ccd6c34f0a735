//! Cache probe: reuse a text artifact left by an earlier run.
//!
//! Runs before any download, extraction or OCR so a repeated pass over an
//! unchanged catalog touches neither the network nor the OCR tools.

use std::path::Path;
use tracing::debug;

/// A text artifact on disk that already meets the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHit {
    /// Length of the cached text in characters.
    pub text_len: usize,
}

/// Check whether `text_path` holds at least `min_len` characters of text.
///
/// Missing, unreadable or non-UTF-8 files are a miss, never an error.
pub async fn probe(text_path: &Path, min_len: usize) -> Option<CacheHit> {
    let text = match tokio::fs::read_to_string(text_path).await {
        Ok(text) => text,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Cache probe could not read {}: {}", text_path.display(), e);
            }
            return None;
        }
    };

    let text_len = text.chars().count();
    if text_len >= min_len {
        debug!("Cache hit: {} ({} chars)", text_path.display(), text_len);
        Some(CacheHit { text_len })
    } else {
        debug!(
            "Cached text too short: {} ({} < {})",
            text_path.display(),
            text_len,
            min_len
        );
        None
    }
}
