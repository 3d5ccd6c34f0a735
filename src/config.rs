//! Configuration for a harvesting run.
//!
//! Every knob lives in [`HarvestConfig`], built via its
//! [`HarvestConfigBuilder`]. The base directory is an explicit field rather
//! than something derived from the executable location, so every component
//! receives the layout it writes to as a plain value.

use crate::error::HarvestError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Resolution passed to the rasterizer (`pdftoppm -r`).
pub const DEFAULT_DPI: u32 = 200;

/// Tesseract page-segmentation mode 6: a single uniform block of text.
pub const PAGE_SEG_MODE: u8 = 6;

/// Default OCR language hint: traditional Chinese plus English.
pub const DEFAULT_OCR_LANG: &str = "chi_tra+eng";

/// Default acceptance threshold in characters.
pub const DEFAULT_MIN_LEN: usize = 1000;

/// Configuration for one pass over a catalog.
///
/// # Example
/// ```rust
/// use exam_texts::HarvestConfig;
///
/// let config = HarvestConfig::builder("catalog.csv", "computer_concepts")
///     .base_dir("exams")
///     .min_len(800)
///     .use_ocr(false)
///     .build()
///     .unwrap();
/// assert!(config.ledger_path().ends_with("usable_computer_concepts.csv"));
/// ```
#[derive(Clone)]
pub struct HarvestConfig {
    /// Input catalog CSV (`year,school,subject,download_url`).
    pub catalog_path: PathBuf,

    /// Root under which `pdfs_{out}/`, `texts_{out}/` and `usable_{out}.csv` live.
    pub base_dir: PathBuf,

    /// Output prefix naming this corpus, e.g. `computer_concepts`.
    pub out: String,

    /// Minimum text length (characters) for an entry to be accepted. Default: 1000.
    pub min_len: usize,

    /// Run the OCR fallback when the fast path is short. Default: true.
    pub use_ocr: bool,

    /// Number of entries to skip after sorting. Default: 0.
    pub offset: usize,

    /// Maximum number of entries to process; `None` (or 0) means no limit.
    pub limit: Option<usize>,

    /// Language hint handed to tesseract (`-l`). Default: `chi_tra+eng`.
    pub ocr_lang: String,

    /// Rasterizer program name or path. Default: `pdftoppm`.
    pub rasterizer: String,

    /// Recognition engine program name or path. Default: `tesseract`.
    pub recognizer: String,

    /// Rasterisation DPI. Default: 200.
    pub dpi: u32,

    /// Download timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-entry progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("catalog_path", &self.catalog_path)
            .field("base_dir", &self.base_dir)
            .field("out", &self.out)
            .field("min_len", &self.min_len)
            .field("use_ocr", &self.use_ocr)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("ocr_lang", &self.ocr_lang)
            .field("rasterizer", &self.rasterizer)
            .field("recognizer", &self.recognizer)
            .field("dpi", &self.dpi)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn HarvestProgressCallback>"),
            )
            .finish()
    }
}

impl HarvestConfig {
    /// Create a builder for the two required inputs: catalog path and output prefix.
    pub fn builder(catalog_path: impl Into<PathBuf>, out: impl Into<String>) -> HarvestConfigBuilder {
        HarvestConfigBuilder {
            config: Self {
                catalog_path: catalog_path.into(),
                base_dir: PathBuf::from("exams"),
                out: out.into(),
                min_len: DEFAULT_MIN_LEN,
                use_ocr: true,
                offset: 0,
                limit: None,
                ocr_lang: DEFAULT_OCR_LANG.to_string(),
                rasterizer: "pdftoppm".to_string(),
                recognizer: "tesseract".to_string(),
                dpi: DEFAULT_DPI,
                download_timeout_secs: 120,
                progress_callback: None,
            },
        }
    }

    /// Directory holding downloaded source documents.
    pub fn pdf_dir(&self) -> PathBuf {
        self.base_dir.join(format!("pdfs_{}", self.out))
    }

    /// Directory holding accepted text artifacts.
    pub fn text_dir(&self) -> PathBuf {
        self.base_dir.join(format!("texts_{}", self.out))
    }

    /// The ledger CSV.
    pub fn ledger_path(&self) -> PathBuf {
        self.base_dir.join(format!("usable_{}.csv", self.out))
    }

    /// Apply `offset`/`limit` to an already-sorted slice.
    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = match self.limit {
            Some(n) if n > 0 => start.saturating_add(n).min(items.len()),
            _ => items.len(),
        };
        &items[start..end]
    }
}

/// Builder for [`HarvestConfig`].
pub struct HarvestConfigBuilder {
    config: HarvestConfig,
}

impl fmt::Debug for HarvestConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl HarvestConfigBuilder {
    pub fn base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.base_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.config.min_len = n;
        self
    }

    pub fn use_ocr(mut self, v: bool) -> Self {
        self.config.use_ocr = v;
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.config.offset = n;
        self
    }

    pub fn limit(mut self, n: Option<usize>) -> Self {
        self.config.limit = n;
        self
    }

    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    pub fn rasterizer(mut self, program: impl Into<String>) -> Self {
        self.config.rasterizer = program.into();
        self
    }

    pub fn recognizer(mut self, program: impl Into<String>) -> Self {
        self.config.recognizer = program.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<HarvestConfig, HarvestError> {
        let c = &self.config;
        if c.out.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "Output prefix must not be empty".into(),
            ));
        }
        if c.out.contains('/') || c.out.contains('\\') {
            return Err(HarvestError::InvalidConfig(format!(
                "Output prefix must not contain path separators, got '{}'",
                c.out
            )));
        }
        if c.use_ocr && c.ocr_lang.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "OCR language hint must not be empty".into(),
            ));
        }
        if c.rasterizer.trim().is_empty() || c.recognizer.trim().is_empty() {
            return Err(HarvestError::InvalidConfig(
                "Rasterizer and recognizer program names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
