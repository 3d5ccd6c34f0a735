//! Catalog input: the list of exam documents to harvest.
//!
//! The catalog is a CSV with a header row naming at least `year`, `school`,
//! `subject` and `download_url`. Extra columns are ignored. Every row must
//! carry an integer year because processing order is derived from it; a
//! single bad row aborts the run before any network traffic happens.

use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One catalog row. Identity is `download_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(deserialize_with = "trimmed_year")]
    pub year: i64,
    pub school: String,
    pub subject: String,
    pub download_url: String,
}

/// Years may carry surrounding whitespace (`" 2021"`); other fields are kept verbatim.
fn trimmed_year<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid year '{raw}': {e}")))
}

/// Load and parse every row of the catalog at `path`.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, HarvestError> {
    if !path.exists() {
        return Err(HarvestError::CatalogNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| HarvestError::CatalogRead {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let entries = read_entries(&mut reader, path)?;
    info!("Loaded {} catalog rows from {}", entries.len(), path.display());
    Ok(entries)
}

fn read_entries<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
) -> Result<Vec<CatalogEntry>, HarvestError> {
    let mut entries = Vec::new();
    for row in reader.deserialize::<CatalogEntry>() {
        let entry = row.map_err(|e| {
            if e.is_io_error() {
                HarvestError::CatalogRead {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                }
            } else {
                HarvestError::MalformedCatalogRow {
                    line: e.position().map(|p| p.line()).unwrap_or(0),
                    detail: e.to_string(),
                }
            }
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Order entries newest year first. Rows sharing a year keep catalog order.
pub fn sort_by_year_desc(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| b.year.cmp(&a.year));
    debug!("Sorted {} catalog rows by year (descending)", entries.len());
}
