//! CLI binary for edgequake-convert.
//!
//! A thin shim over the library crate: reads the input files, guesses their
//! declared MIME types, queues one job per file and writes each result next
//! to its input (or into `--out-dir`).

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_convert::{
    convert::write_output_atomic, pdfium_available, targets_for_file, ConversionConfig,
    JobProgressCallback, JobQueue, JobStatus, JobSummary, ProgressCallback, SourceFile,
    TargetFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// finished job. Jobs finish out of order, so start times are keyed by id.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<u64, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_ms(&self, job_id: u64) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&job_id))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_jobs: usize) {
        self.bar.set_length(total_jobs as u64);
        self.bar.reset_eta();
    }

    fn on_job_start(&self, job_id: u64, file_name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(job_id, Instant::now());
        }
        self.bar.set_message(file_name.to_string());
    }

    fn on_job_complete(&self, job_id: u64, file_name: &str, output_len: usize) {
        let elapsed_ms = self.elapsed_ms(job_id);
        self.bar.println(format!(
            "  {} {:<32}  {:<12}  {}",
            green("✓"),
            file_name,
            dim(&format!("{output_len:>8} bytes")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_job_error(&self, job_id: u64, file_name: &str, error: &str) {
        let elapsed_ms = self.elapsed_ms(job_id);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} {:<32}  {}  {}",
            red("✗"),
            file_name,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_jobs: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} failed)",
                if failed == total_jobs {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_jobs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # iPhone photo to JPEG (written next to the input as holiday.jpg)
  edgeconv --to jpg holiday.heic

  # Several spreadsheets to CSV in another directory
  edgeconv --to text/csv --out-dir exports/ q1.xlsx q2.ods

  # Notes and web pages to PDF
  edgeconv --to pdf notes.txt letter.rtf page.html

  # Which targets can this file be converted to?
  edgeconv --list-targets report.docx

  # Machine-readable results
  edgeconv --to png --json scan.tiff > result.json

SUPPORTED CONVERSIONS:
  Source                        Targets
  ────────────────────────────  ─────────────────────────────
  heic heif tiff png jpg …      jpg png webp bmp gif pdf
  docx                          pdf html
  xlsx xls ods csv              csv html pdf
  txt html rtf                  pdf
  pdf                           txt (needs the pdfium library)

ENVIRONMENT VARIABLES:
  EDGECONV_TO             Default for --to
  EDGECONV_OUT_DIR        Default for --out-dir
  EDGECONV_CONCURRENCY    Default for --concurrency
  EDGECONV_PDF_PASSWORD   Password for encrypted PDF inputs
  PDFIUM_LIB_PATH         Directory or path of libpdfium (PDF inputs only)
  RUST_LOG                Override the log filter
"#;

/// Convert images, documents, spreadsheets, text and PDF files locally.
#[derive(Parser, Debug)]
#[command(
    name = "edgeconv",
    version,
    about = "Convert images, documents, spreadsheets, text and PDF files locally",
    long_about = "Convert local files between formats without uploading them anywhere. \
Images (HEIC, TIFF, PNG, JPEG, WebP, …) become JPEG/PNG/WebP/BMP/GIF or PDF; Word documents \
become PDF or HTML; spreadsheets become CSV, HTML or PDF; text, HTML and RTF become PDF; PDF \
becomes plain text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target format: a MIME type (image/jpeg) or an extension (jpg, pdf, csv).
    #[arg(short, long, env = "EDGECONV_TO")]
    to: Option<String>,

    /// Write outputs here instead of next to each input.
    #[arg(short, long, env = "EDGECONV_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Print the targets each input can be converted to, then exit.
    #[arg(long)]
    list_targets: bool,

    /// Output structured JSON instead of the human-readable summary.
    #[arg(long, env = "EDGECONV_JSON")]
    json: bool,

    /// Number of files converted at once.
    #[arg(short, long, env = "EDGECONV_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// User password for encrypted PDF inputs.
    #[arg(long, env = "EDGECONV_PDF_PASSWORD")]
    password: Option<String>,

    /// Directory or full path of the pdfium shared library.
    #[arg(long, env = "EDGECONV_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "EDGECONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EDGECONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EDGECONV_QUIET")]
    quiet: bool,
}

/// One line of `--json` output.
#[derive(Serialize)]
struct JobReport {
    #[serde(flatten)]
    summary: JobSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct TargetListing<'a> {
    file: String,
    targets: Vec<TargetListingEntry<'a>>,
}

#[derive(Serialize)]
struct TargetListingEntry<'a> {
    mime: &'static str,
    extension: &'static str,
    label: &'a str,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs when active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_targets;
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

    // ── List-targets mode ────────────────────────────────────────────────
    if cli.list_targets {
        return list_targets(&cli);
    }

    let Some(target_arg) = cli.to.as_deref() else {
        bail!("No target format given; pass --to <mime|extension> or use --list-targets");
    };
    let target = TargetFormat::parse(target_arg).with_context(|| {
        let known: Vec<&str> = TargetFormat::ALL.iter().map(|t| t.extension()).collect();
        format!(
            "Unknown target format '{target_arg}' (known: {})",
            known.join(", ")
        )
    })?;

    // ── Read inputs ──────────────────────────────────────────────────────
    let mut queue = JobQueue::new();
    let mut input_paths: HashMap<u64, PathBuf> = HashMap::new();
    for path in &cli.inputs {
        let source = read_source(path).await?;
        if !cli.quiet && !cli.json && pdf_without_pdfium(&cli, &source) {
            eprintln!(
                "{} {}: pdfium library not found; set PDFIUM_LIB_PATH or --pdfium-lib",
                cyan("⚠"),
                path.display()
            );
        }
        let id = queue.add(source, target.mime());
        input_paths.insert(id, path.clone());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn JobProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let started = Instant::now();
    let batch = queue.run_all(&config).await;

    // ── Write outputs ────────────────────────────────────────────────────
    let mut reports = Vec::with_capacity(queue.len());
    let mut written: HashSet<PathBuf> = HashSet::new();
    let ids: Vec<u64> = queue.jobs().iter().map(|j| j.id()).collect();
    for id in ids {
        let Some(job) = queue.get_mut(id) else { continue };
        let mut output_path = None;

        if job.status() == JobStatus::Done {
            let input = input_paths.get(&id).cloned().unwrap_or_default();
            let name = job
                .output_name()
                .unwrap_or_else(|| format!("converted.{}", target.extension()));
            let wanted = destination_for(&input, &name, cli.out_dir.as_deref());
            let dest = unique_destination(&wanted, &mut written);
            if dest != wanted && !cli.quiet && !cli.json {
                eprintln!(
                    "{} {}: {} is already an output of this run; writing {}",
                    cyan("⚠"),
                    input.display(),
                    wanted.display(),
                    dest.display()
                );
            }
            let bytes = job.take_bytes().unwrap_or_default();

            tokio::task::block_in_place(|| write_output_atomic(&dest, &bytes))
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            output_path = Some(dest);
        }

        reports.push(JobReport {
            summary: job.summary(),
            output_path,
        });
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&reports).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        for report in &reports {
            match (&report.output_path, &report.summary.error) {
                (Some(path), _) if !show_progress => {
                    eprintln!(
                        "{} {} → {}",
                        green("✓"),
                        report.summary.file_name,
                        bold(&path.display().to_string())
                    );
                }
                (None, Some(failure)) if !show_progress => {
                    eprintln!(
                        "{} {}: {}",
                        red("✗"),
                        report.summary.file_name,
                        failure.message
                    );
                }
                _ => {}
            }
        }
        eprintln!(
            "   {}/{} converted  —  {}ms total",
            batch.succeeded,
            batch.total,
            dim(&started.elapsed().as_millis().to_string()),
        );
    }

    if batch.failed > 0 {
        bail!("{} of {} conversion(s) failed", batch.failed, batch.total);
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder().concurrency(cli.concurrency);

    if let Some(ref pwd) = cli.password {
        builder = builder.pdf_password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Read a file and pair it with the MIME type its extension suggests.
async fn read_source(path: &Path) -> Result<SourceFile> {
    let declared = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or_default()
        .to_string();
    SourceFile::from_path(path, declared)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn pdf_without_pdfium(cli: &Cli, source: &SourceFile) -> bool {
    source.extension().as_deref() == Some("pdf")
        && !pdfium_available(cli.pdfium_lib.as_deref())
}

/// Where to write `output_name` for `input`. Never returns the input path.
fn destination_for(input: &Path, output_name: &str, out_dir: Option<&Path>) -> PathBuf {
    let dir = match out_dir {
        Some(d) => d.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let dest = dir.join(output_name);
    if dest == input {
        let p = Path::new(output_name);
        let stem = p.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let ext = p.extension().map(|s| s.to_string_lossy()).unwrap_or_default();
        return dir.join(format!("{stem}.converted.{ext}"));
    }
    dest
}

/// `wanted`, or `stem-2.ext`, `stem-3.ext`, … when an earlier job in the
/// batch already claimed it. The returned path is recorded in `taken`.
fn unique_destination(wanted: &Path, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut dest = wanted.to_path_buf();
    let stem = wanted.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = wanted.extension().map(|s| s.to_string_lossy().into_owned());
    let mut n = 2;
    while taken.contains(&dest) {
        let name = match &ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        dest = wanted.with_file_name(name);
        n += 1;
    }
    taken.insert(dest.clone());
    dest
}

fn list_targets(cli: &Cli) -> Result<()> {
    let listings: Vec<TargetListing<'_>> = cli
        .inputs
        .iter()
        .map(|path| {
            let declared = mime_guess::from_path(path).first_raw().unwrap_or_default();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let targets = targets_for_file(&name, declared)
                .iter()
                .map(|e| TargetListingEntry {
                    mime: e.target.mime(),
                    extension: e.target.extension(),
                    label: e.label,
                })
                .collect();
            TargetListing {
                file: path.display().to_string(),
                targets,
            }
        })
        .collect();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&listings).context("Failed to serialise targets")?
        );
        return Ok(());
    }

    for listing in &listings {
        println!("{}", bold(&listing.file));
        if listing.targets.is_empty() {
            println!("  {}", dim("(unsupported file type)"));
        }
        for t in &listing.targets {
            println!("  {:<6} {:<14} {}", t.extension, t.label, dim(t.mime));
        }
    }
    Ok(())
}
