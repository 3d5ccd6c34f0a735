//! CLI binary for exam-texts.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `HarvestConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use exam_texts::{
    harvest, CatalogEntry, EntryOutcome, HarvestConfig, HarvestProgressCallback, HarvestStats,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar for the run, one log line per settled entry.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` reports how many entries were selected.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading catalog…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} papers  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Collecting");
    }
}

/// Keep log lines on one terminal row.
fn clip(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

impl HarvestProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_entries: usize) {
        self.activate_bar(total_entries);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_entries} catalog entries…"))
        ));
    }

    fn on_entry_start(&self, _index: usize, _total: usize, entry: &CatalogEntry) {
        self.bar
            .set_message(clip(&format!("{} {}", entry.year, entry.school), 40));
    }

    fn on_entry_complete(&self, index: usize, total: usize, outcome: &EntryOutcome) {
        let line = match outcome {
            EntryOutcome::Accepted(r) => format!(
                "  {} {:>3}/{:<3}  {:<6}  {}  {}",
                green("✓"),
                index,
                total,
                r.method,
                dim(&format!("{:>6} chars", r.text_len)),
                clip(&format!("{} {}", r.year, r.school), 50),
            ),
            EntryOutcome::Rejected { url, text_len } => format!(
                "  {} {:>3}/{:<3}  {}  {}",
                yellow("–"),
                index,
                total,
                dim(&format!("too short ({text_len} chars)")),
                dim(&clip(url, 60)),
            ),
            EntryOutcome::Skipped { error, .. } => format!(
                "  {} {:>3}/{:<3}  {}",
                red("✗"),
                index,
                total,
                red(&clip(&error.to_string(), 80)),
            ),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_run_complete(&self, stats: &HarvestStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}/{} papers usable  ({} cached, {} pdf, {} ocr)",
            if stats.skipped == 0 { green("✔") } else { cyan("⚠") },
            bold(&stats.accepted().to_string()),
            stats.selected,
            stats.cached,
            stats.extracted,
            stats.recognized,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Collect every paper in the catalog
  collect-exam-texts --csv catalog.csv --out computer_concepts

  # Newest 20 papers, text layer only
  collect-exam-texts --csv catalog.csv --out computer_concepts --limit 20 --no-ocr

  # Resume further down the catalog with a lower threshold
  collect-exam-texts --csv catalog.csv --out cs --offset 100 --min-len 600

  # Machine-readable run statistics
  collect-exam-texts --csv catalog.csv --out cs --json > stats.json

OUTPUT LAYOUT (under --base-dir):
  pdfs_{out}/{year}_{school}.pdf     downloaded papers
  texts_{out}/{year}_{school}.text   extracted or recognised text
  usable_{out}.csv                   ledger of papers that met --min-len

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   pdfium shared library (file or directory); default: system library
  RUST_LOG          tracing filter, overrides -v/-q

EXTERNAL TOOLS (OCR fallback only):
  pdftoppm    poppler-utils
  tesseract   with the language data named by --ocr-lang
"#;

/// Download exam PDFs from a catalog and keep the ones with usable text.
#[derive(Parser, Debug)]
#[command(
    name = "collect-exam-texts",
    version,
    about = "Download exam PDFs from a catalog CSV and extract their text",
    long_about = "Download every exam paper listed in a catalog CSV (year,school,subject,download_url), \
extract its text layer, fall back to OCR for scanned papers, and keep a deduplicated ledger of the \
papers whose text meets a minimum length.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Catalog CSV with columns year,school,subject,download_url.
    #[arg(long = "csv", env = "EXAM_TEXTS_CSV")]
    csv: PathBuf,

    /// Output prefix naming this corpus (e.g. computer_concepts).
    #[arg(long, env = "EXAM_TEXTS_OUT")]
    out: String,

    /// Process at most this many entries after sorting (0 = no limit).
    #[arg(long, env = "EXAM_TEXTS_LIMIT")]
    limit: Option<usize>,

    /// Skip this many entries after sorting.
    #[arg(long, env = "EXAM_TEXTS_OFFSET", default_value_t = 0)]
    offset: usize,

    /// Minimum text length, in characters, for a paper to be kept.
    #[arg(long, env = "EXAM_TEXTS_MIN_LEN", default_value_t = 1000)]
    min_len: usize,

    /// Never run the OCR fallback.
    #[arg(long, env = "EXAM_TEXTS_NO_OCR")]
    no_ocr: bool,

    /// Directory holding the pdfs_/texts_ folders and the ledger.
    #[arg(long, env = "EXAM_TEXTS_BASE_DIR", default_value = "exams")]
    base_dir: PathBuf,

    /// Tesseract language hint.
    #[arg(long, env = "EXAM_TEXTS_OCR_LANG", default_value = "chi_tra+eng")]
    ocr_lang: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "EXAM_TEXTS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Rasterizer program (name on PATH or full path).
    #[arg(long, env = "EXAM_TEXTS_RASTERIZER", default_value = "pdftoppm")]
    rasterizer: String,

    /// OCR engine program (name on PATH or full path).
    #[arg(long, env = "EXAM_TEXTS_RECOGNIZER", default_value = "tesseract")]
    recognizer: String,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "EXAM_TEXTS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EXAM_TEXTS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXAM_TEXTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EXAM_TEXTS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn HarvestProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let stats = harvest(&config).await.context("Harvest failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        if !show_progress {
            eprintln!(
                "Collected {}/{} papers in {}ms ({} cached, {} pdf, {} ocr)",
                stats.accepted(),
                stats.selected,
                stats.duration_ms,
                stats.cached,
                stats.extracted,
                stats.recognized,
            );
        }
        if stats.rejected + stats.skipped > 0 {
            eprintln!(
                "   {} too short  /  {} skipped",
                dim(&stats.rejected.to_string()),
                dim(&stats.skipped.to_string()),
            );
        }
        eprintln!(
            "   {} rows  →  {}",
            stats.ledger_rows,
            bold(&config.ledger_path().display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `HarvestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<HarvestConfig> {
    let mut builder = HarvestConfig::builder(&cli.csv, cli.out.clone())
        .base_dir(&cli.base_dir)
        .min_len(cli.min_len)
        .use_ocr(!cli.no_ocr)
        .offset(cli.offset)
        .limit(cli.limit)
        .ocr_lang(cli.ocr_lang.clone())
        .rasterizer(cli.rasterizer.clone())
        .recognizer(cli.recognizer.clone())
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
