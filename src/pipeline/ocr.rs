//! Recognition fallback: rasterise every page with `pdftoppm`, OCR each
//! image with `tesseract`, and stitch the page texts together.
//!
//! ## Workspace lifetime
//!
//! Page images live in a [`tempfile::TempDir`] owned by the
//! [`Recognizer::recognize`] call. The directory is removed when that value
//! drops, on success, on an early `?` return, and on unwind.
//!
//! ## Per-page failures
//!
//! A page whose OCR process cannot be started contributes an empty string
//! and the loop moves on to the next page. The failure is logged at `warn`.
//! A non-zero exit still contributes whatever the engine printed.

use crate::config::PAGE_SEG_MODE;
use crate::error::EntryError;
use crate::pipeline::command::CommandRunner;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// File-name prefix handed to the rasterizer; it appends `-N.png`.
const PAGE_PREFIX: &str = "page";

/// Drives the rasterizer and the OCR engine through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct Recognizer<R> {
    runner: R,
    rasterizer: String,
    recognizer: String,
    dpi: u32,
}

impl<R: CommandRunner> Recognizer<R> {
    pub fn new(runner: R, rasterizer: impl Into<String>, recognizer: impl Into<String>, dpi: u32) -> Self {
        Self {
            runner,
            rasterizer: rasterizer.into(),
            recognizer: recognizer.into(),
            dpi,
        }
    }

    /// OCR every page of `pdf_path` using `lang` as the tesseract language hint.
    ///
    /// # Errors
    /// * [`EntryError::ToolUnavailable`]: either program is not on `PATH`
    /// * [`EntryError::WorkspaceFailed`]: the scratch directory could not be used
    /// * [`EntryError::RasterisationFailed`]: the rasterizer failed to start or exited non-zero
    pub async fn recognize(&self, pdf_path: &Path, lang: &str) -> Result<String, EntryError> {
        let rasterizer = self.resolve(&self.rasterizer)?;
        let engine = self.resolve(&self.recognizer)?;

        let workspace = TempDir::new().map_err(|e| EntryError::WorkspaceFailed {
            detail: e.to_string(),
        })?;

        self.rasterise(&rasterizer, pdf_path, workspace.path()).await?;

        let images = list_page_images(workspace.path()).await?;
        info!(
            "OCR: {} page image(s) for {}",
            images.len(),
            pdf_path.display()
        );

        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            pages.push(self.recognise_page(&engine, image, lang).await);
        }

        let text = pages.join("\n\n").trim_end().to_string();
        debug!(
            "OCR recovered {} chars from {}",
            text.chars().count(),
            pdf_path.display()
        );
        Ok(text)
    }

    fn resolve(&self, program: &str) -> Result<PathBuf, EntryError> {
        self.runner
            .locate(program)
            .ok_or_else(|| EntryError::ToolUnavailable {
                tool: program.to_string(),
            })
    }

    async fn rasterise(
        &self,
        rasterizer: &Path,
        pdf_path: &Path,
        workspace: &Path,
    ) -> Result<(), EntryError> {
        let args: Vec<OsString> = vec![
            "-r".into(),
            self.dpi.to_string().into(),
            "-png".into(),
            pdf_path.as_os_str().to_owned(),
            workspace.join(PAGE_PREFIX).into_os_string(),
        ];

        let output = self.runner.run(rasterizer, &args).await.map_err(|e| {
            EntryError::RasterisationFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("cannot start {}: {}", rasterizer.display(), e),
            }
        })?;

        if !output.success() {
            return Err(EntryError::RasterisationFailed {
                path: pdf_path.to_path_buf(),
                detail: format!(
                    "{} exited with {:?}: {}",
                    rasterizer.display(),
                    output.status,
                    output.stderr.trim()
                ),
            });
        }
        Ok(())
    }

    async fn recognise_page(&self, engine: &Path, image: &Path, lang: &str) -> String {
        let args: Vec<OsString> = vec![
            image.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            lang.into(),
            "--psm".into(),
            PAGE_SEG_MODE.to_string().into(),
        ];

        match self.runner.run(engine, &args).await {
            Ok(output) => {
                if !output.success() {
                    warn!(
                        "OCR exited with {:?} on {}: {}",
                        output.status,
                        image.display(),
                        output.stderr.trim()
                    );
                }
                output.stdout
            }
            Err(e) => {
                warn!("OCR could not run on {}: {}", image.display(), e);
                String::new()
            }
        }
    }
}

/// Page images produced by the rasterizer, in page order.
///
/// `pdftoppm` zero-pads page numbers to a common width, so lexicographic
/// order is page order.
async fn list_page_images(workspace: &Path) -> Result<Vec<PathBuf>, EntryError> {
    let workspace_err = |e: std::io::Error| EntryError::WorkspaceFailed {
        detail: format!("cannot list '{}': {}", workspace.display(), e),
    };

    let mut dir = tokio::fs::read_dir(workspace).await.map_err(workspace_err)?;
    let mut images = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(workspace_err)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(&format!("{PAGE_PREFIX}-")) && name.ends_with(".png") {
            images.push(entry.path());
        }
    }
    images.sort();
    Ok(images)
}
