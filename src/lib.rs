//! # edgequake-convert
//!
//! Convert local files between formats without sending them anywhere:
//! photos (HEIC, TIFF, PNG, JPEG, …), Word documents, spreadsheets, text,
//! HTML, RTF and PDF.
//!
//! ## Why this crate?
//!
//! Everyday conversions ("this iPhone photo as a JPEG", "this workbook as
//! CSV", "these notes as a PDF") usually mean uploading the file to a web
//! service. This crate does the decoding, layout and encoding in-process,
//! so the bytes never leave the machine. Most codecs are pure Rust; two
//! formats lean on native libraries loaded on the host:
//!
//! - PDF text extraction binds **pdfium** at runtime (see [`pdfium_available`])
//! - HEIC/HEIF decoding links **libheif** behind the `heic` feature
//!
//! ## Pipeline Overview
//!
//! ```text
//! SourceFile (name, declared MIME, bytes)
//!  │
//!  ├─ 1. Classify  name + declared type → Category
//!  ├─ 2. Gate      (Category, target) must be in the compatibility table
//!  ├─ 3. Route     Category + name → SourceFormat, matched exhaustively
//!  ├─ 4. Decode    bytes → Intermediate (pixels | markup | text | sheet)
//!  ├─ 5. Encode    Intermediate → target bytes (raster, PDF, CSV, HTML, text)
//!  └─ 6. Output    ConversionOutput + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_convert::{convert, targets_for_file, SourceFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = SourceFile::from_path("scan.tiff", "image/tiff").await?;
//!
//!     for entry in targets_for_file(source.name(), source.declared_mime()) {
//!         println!("can convert to {} ({})", entry.label, entry.target.mime());
//!     }
//!
//!     let output = convert(&source, "image/jpeg").await?;
//!     std::fs::write(output.file_name_for(source.name()), &output.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `edgeconv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `heic`  | off     | Decode HEIC/HEIF through the native libheif library |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-convert = { version = "0.1", default-features = false }
//! ```
//!
//! ## Supported Conversions
//!
//! | Source category | Targets |
//! |-----------------|---------|
//! | image           | JPEG, PNG, WebP, BMP, GIF, PDF (HEIC/HEIF needs `heic`) |
//! | document        | PDF, HTML |
//! | spreadsheet     | CSV, HTML, PDF |
//! | text            | PDF, DOCX (listed, rejected by the router) |
//! | pdf             | plain text (needs pdfium) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compat;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod intermediate;
pub mod jobs;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod source;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compat::{compatible_targets, targets_for_file, CompatibilityEntry};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_blocking, convert_to_file, convert_with_config};
pub use error::{ConvertError, ErrorKind};
pub use format::{classify, extension_for_mime, Category, TargetFormat};
pub use intermediate::{Intermediate, PixelBuffer, Sheet};
pub use jobs::{BatchSummary, ConversionJob, JobFailure, JobQueue, JobStatus, JobSummary};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::decode::pdf::pdfium_available;
pub use pipeline::encode::layout::live_surfaces;
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::{SourceFile, SourceFormat};
pub use stream::{convert_stream, JobOutcome, JobRequest, JobStream};
