//! Fetcher: idempotent download of a source document to a fixed local path.
//!
//! A destination that already exists with non-zero size is treated as
//! downloaded. The body is streamed into a sibling `.part` file that is
//! renamed into place only after the last chunk, so an interrupted transfer
//! never masquerades as a cached document on the next run.

use crate::error::{EntryError, HarvestError};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// What [`HttpFetcher::fetch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The destination was already present and non-empty.
    Reused,
    /// The document was downloaded.
    Downloaded { bytes: u64 },
}

/// Downloads documents over HTTP(S). Create once, reuse for every entry.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HarvestError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Ensure `dest` holds the document at `url`.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchStatus, EntryError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_failure(url, parent, e))?;
        }

        if let Ok(meta) = tokio::fs::metadata(dest).await {
            if meta.is_file() && meta.len() > 0 {
                debug!("Reusing downloaded document: {}", dest.display());
                return Ok(FetchStatus::Reused);
            }
        }

        info!("Downloading {} → {}", url, dest.display());
        let part = part_path(dest);
        let result = self.download(url, &part).await;
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| self.io_failure(url, dest, e))?;

        debug!("Downloaded {} bytes to {}", bytes, dest.display());
        Ok(FetchStatus::Downloaded { bytes })
    }

    async fn download(&self, url: &str, part: &Path) -> Result<u64, EntryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_failure(url, e))?;

        if !response.status().is_success() {
            return Err(EntryError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| self.io_failure(url, part, e))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_failure(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| self.io_failure(url, part, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| self.io_failure(url, part, e))?;

        Ok(written)
    }

    fn transport_failure(&self, url: &str, e: reqwest::Error) -> EntryError {
        if e.is_timeout() {
            EntryError::DownloadTimeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            EntryError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    fn io_failure(&self, url: &str, path: &Path, e: std::io::Error) -> EntryError {
        EntryError::DownloadFailed {
            url: url.to_string(),
            reason: format!("cannot write '{}': {}", path.display(), e),
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/d/2021_A.pdf")),
            PathBuf::from("/d/2021_A.pdf.part")
        );
    }

    #[tokio::test]
    async fn downloads_and_creates_parent_dirs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("pdfs_cs").join("2021_A.pdf");
        let fetcher = HttpFetcher::new(10).unwrap();

        let status = fetcher
            .fetch(&format!("{}/a.pdf", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(status, FetchStatus::Downloaded { bytes: 13 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4 body");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn existing_non_empty_file_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("2021_A.pdf");
        std::fs::write(&dest, b"old").unwrap();

        let fetcher = HttpFetcher::new(10).unwrap();
        let status = fetcher
            .fetch(&format!("{}/a.pdf", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(status, FetchStatus::Reused);
        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
    }

    #[tokio::test]
    async fn empty_file_is_downloaded_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("2021_A.pdf");
        std::fs::write(&dest, b"").unwrap();

        let fetcher = HttpFetcher::new(10).unwrap();
        fetcher
            .fetch(&format!("{}/a.pdf", server.uri()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn http_error_is_download_failed_and_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("2021_A.pdf");
        let fetcher = HttpFetcher::new(10).unwrap();

        match fetcher
            .fetch(&format!("{}/missing.pdf", server.uri()), &dest)
            .await
        {
            Err(EntryError::DownloadFailed { reason, .. }) => assert!(reason.contains("404")),
            other => panic!("expected DownloadFailed, got {other:?}"),
        }
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(1).unwrap();
        let result = fetcher
            .fetch(&format!("{}/slow.pdf", server.uri()), &dir.path().join("s.pdf"))
            .await;
        assert!(matches!(
            result,
            Err(EntryError::DownloadTimeout { secs: 1, .. })
        ));
    }
}
