//! Conversion entry points and the format router.
//!
//! ## Routing
//!
//! A request passes three gates before any bytes are decoded:
//!
//! 1. the input is within `max_input_bytes`
//! 2. the file classifies into a [`Category`](crate::format::Category) and
//!    the target MIME type is known
//! 3. the (category, target) pair is in the compatibility table
//!
//! The router then derives the [`SourceFormat`] and matches it exhaustively:
//!
//! | Source             | Decoder            | Targets                          |
//! |--------------------|--------------------|----------------------------------|
//! | HEIC / HEIF        | libheif (primary)  | jpeg png webp bmp gif pdf        |
//! | TIFF               | first page         | jpeg png webp bmp gif pdf        |
//! | other raster       | image              | jpeg png webp bmp gif pdf        |
//! | DOCX               | zip + quick-xml    | html pdf                         |
//! | DOC                | rejected           | none                             |
//! | xlsx xls ods / csv | calamine / csv     | csv html pdf                     |
//! | html / rtf / txt   | text               | pdf                              |
//! | PDF                | pdfium             | plain text                       |
//!
//! A conversion either returns complete, non-empty bytes or an error.

use crate::compat::is_compatible;
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::{classify, TargetFormat};
use crate::intermediate::Intermediate;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::decode::{docx, heic, pdf, raster, sheet, text, tiff};
use crate::pipeline::encode::{encode, EncodeOptions};
use crate::policy::{DOCX_VIRTUAL_WIDTH, HTML_VIRTUAL_WIDTH, SHEET_VIRTUAL_WIDTH};
use crate::source::{SourceFile, SourceFormat};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert `source` to the format named by `target_mime`.
///
/// Runs the pipeline on tokio's blocking pool with the default configuration.
///
/// # Example
/// ```rust,no_run
/// use edgequake_convert::{convert, SourceFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = SourceFile::from_path("scan.tiff", "image/tiff").await?;
/// let output = convert(&source, "image/png").await?;
/// std::fs::write(output.file_name_for(source.name()), &output.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    source: &SourceFile,
    target_mime: &str,
) -> Result<ConversionOutput, ConvertError> {
    convert_with_config(source, target_mime, &ConversionConfig::default()).await
}

/// [`convert`] with an explicit configuration.
pub async fn convert_with_config(
    source: &SourceFile,
    target_mime: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let source = source.clone();
    let target_mime = target_mime.to_string();
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_blocking(&source, &target_mime, &config))
        .await
        .map_err(|e| ConvertError::TaskFailed(format!("conversion task panicked: {e}")))?
}

/// Synchronous conversion on the calling thread.
pub fn convert_blocking(
    source: &SourceFile,
    target_mime: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    info!(
        "Converting '{}' ({} bytes) → {}",
        source.name(),
        source.len(),
        target_mime
    );

    // ── Gate 1: size ─────────────────────────────────────────────────────
    if source.len() > config.max_input_bytes {
        return Err(ConvertError::InputTooLarge {
            file: source.name().to_string(),
            size: source.len(),
            limit: config.max_input_bytes,
        });
    }

    // ── Gate 2: classification and target ────────────────────────────────
    let category = classify(source.name(), source.declared_mime()).ok_or_else(|| {
        ConvertError::UnsupportedConversion {
            file: source.name().to_string(),
            source_kind: describe_unclassified(source),
            target: target_mime.to_string(),
        }
    })?;

    let target = TargetFormat::from_mime(target_mime).ok_or_else(|| {
        ConvertError::UnsupportedConversion {
            file: source.name().to_string(),
            source_kind: category.to_string(),
            target: target_mime.to_string(),
        }
    })?;

    // ── Gate 3: compatibility table ──────────────────────────────────────
    if !is_compatible(category, target) {
        return Err(ConvertError::UnsupportedConversion {
            file: source.name().to_string(),
            source_kind: category.to_string(),
            target: target.mime().to_string(),
        });
    }

    let source_format = SourceFormat::detect(category, source);
    debug!(
        "'{}': category={}, format={}, target={}",
        source.name(),
        category,
        source_format,
        target.label()
    );

    let bytes = route(source, source_format, target, config)?;
    if bytes.is_empty() {
        return Err(ConvertError::encode(
            target.label(),
            "conversion produced no output",
        ));
    }

    let stats = ConversionStats {
        input_bytes: source.len(),
        output_bytes: bytes.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Converted '{}' → {} ({} bytes, {}ms)",
        source.name(),
        target.label(),
        stats.output_bytes,
        stats.duration_ms
    );

    Ok(ConversionOutput {
        bytes,
        target,
        category,
        source_format,
        stats,
    })
}

/// Convert and write the result to `output_path` atomically.
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `output_path`, so readers never see a partial file.
pub async fn convert_to_file(
    source: &SourceFile,
    target_mime: &str,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let output = convert_with_config(source, target_mime, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let bytes = output.bytes.clone();

    tokio::task::spawn_blocking(move || write_output_atomic(&path, &bytes))
        .await
        .map_err(|e| ConvertError::TaskFailed(format!("write task panicked: {e}")))??;

    Ok(output)
}

/// Write `bytes` to `path` through a temporary sibling file and rename.
pub fn write_output_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let io_err = |source: std::io::Error| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Router ───────────────────────────────────────────────────────────────

fn route(
    source: &SourceFile,
    format: SourceFormat,
    target: TargetFormat,
    config: &ConversionConfig,
) -> Result<Vec<u8>, ConvertError> {
    let data = source.bytes();
    let title = document_title(source.name());
    let titled = EncodeOptions::titled(title.as_deref());
    let laid_out = |virtual_width: f32| titled.with_virtual_width(virtual_width);

    match format {
        // ── Images ───────────────────────────────────────────────────────
        SourceFormat::Heic | SourceFormat::Tiff | SourceFormat::Raster => {
            if !(target.is_raster() || target == TargetFormat::Pdf) {
                return Err(unsupported_target(format, target));
            }
            let pixels = match format {
                SourceFormat::Heic => heic::decode_heic(data)?,
                SourceFormat::Tiff => tiff::decode_tiff(data)?,
                _ => raster::decode_raster(data)?,
            };
            encode(&Intermediate::Pixels(pixels), target, &titled)
        }

        // ── Documents ────────────────────────────────────────────────────
        SourceFormat::Docx => match target {
            TargetFormat::Html | TargetFormat::Pdf => {
                let markup = docx::decode_docx(data, config.max_input_bytes)?;
                encode(&Intermediate::Markup(markup), target, &laid_out(DOCX_VIRTUAL_WIDTH))
            }
            _ => Err(unsupported_target(format, target)),
        },
        SourceFormat::LegacyDoc => Err(ConvertError::decode(
            "DOC",
            "legacy binary Word documents cannot be read; save the file as .docx",
        )),

        // ── Spreadsheets ─────────────────────────────────────────────────
        SourceFormat::Workbook | SourceFormat::Csv => match target {
            TargetFormat::Csv | TargetFormat::Html | TargetFormat::Pdf => {
                let sheet = if format == SourceFormat::Csv {
                    sheet::decode_csv(data)?
                } else {
                    sheet::decode_workbook(data)?
                };
                encode(&Intermediate::Sheet(sheet), target, &laid_out(SHEET_VIRTUAL_WIDTH))
            }
            _ => Err(unsupported_target(format, target)),
        },

        // ── Text ─────────────────────────────────────────────────────────
        SourceFormat::Html | SourceFormat::PlainText | SourceFormat::Rtf => match target {
            TargetFormat::Pdf => {
                let intermediate = match format {
                    SourceFormat::Html => Intermediate::Markup(text::decode_html(data)),
                    SourceFormat::Rtf => Intermediate::PlainText(text::decode_rtf(data)),
                    _ => Intermediate::PlainText(text::decode_plain_text(data)),
                };
                encode(&intermediate, target, &laid_out(HTML_VIRTUAL_WIDTH))
            }
            _ => Err(unsupported_target(format, target)),
        },

        // ── PDF ──────────────────────────────────────────────────────────
        SourceFormat::Pdf => match target {
            TargetFormat::PlainText => {
                let text = pdf::decode_pdf_text(
                    data,
                    config.pdfium_library_path.as_deref(),
                    config.pdf_password.as_deref(),
                )?;
                encode(&Intermediate::PlainText(text), target, &titled)
            }
            _ => Err(unsupported_target(format, target)),
        },
    }
}

fn unsupported_target(format: SourceFormat, target: TargetFormat) -> ConvertError {
    ConvertError::UnsupportedTarget {
        source_format: format.to_string(),
        target: target.mime().to_string(),
    }
}

fn document_title(name: &str) -> Option<String> {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

fn describe_unclassified(source: &SourceFile) -> String {
    match (source.extension(), source.declared_mime()) {
        (Some(ext), "") => format!(".{ext} file"),
        (_, mime) if !mime.is_empty() => mime.to_string(),
        _ => "unrecognised file".to_string(),
    }
}
