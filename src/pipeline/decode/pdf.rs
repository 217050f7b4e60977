//! PDF source → plain text via pdfium.
//!
//! ## Library binding
//!
//! pdfium is a shared library loaded at runtime. Candidates are tried in
//! order:
//!
//! 1. `ConversionConfig::pdfium_library_path` (a file, or a directory
//!    holding the platform library name)
//! 2. the `PDFIUM_LIB_PATH` environment variable (same rules)
//! 3. the system library search path
//!
//! When none binds, the conversion fails with an external-library error
//! naming the last attempt.
//!
//! ## Output
//!
//! Text of every page in reading order, pages separated by one blank line.

use crate::error::ConvertError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a pdfium library file or directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

#[cfg(target_os = "windows")]
const PLATFORM_LIBRARY: &str = "pdfium.dll";
#[cfg(target_os = "macos")]
const PLATFORM_LIBRARY: &str = "libpdfium.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const PLATFORM_LIBRARY: &str = "libpdfium.so";

/// Extract the text of every page.
pub fn decode_pdf_text(
    bytes: &[u8],
    library_path: Option<&Path>,
    password: Option<&str>,
) -> Result<String, ConvertError> {
    let pdfium = bind_pdfium(library_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| load_error(e, password.is_some()))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut page_texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| {
                ConvertError::external(
                    "pdfium",
                    format!("reading text of page {}", idx + 1),
                    format!("{e:?}"),
                )
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.chars().count());
        page_texts.push(text.trim_end().to_string());
    }

    Ok(page_texts.join("\n\n"))
}

/// Whether a pdfium library can be bound with the given override.
pub fn pdfium_available(library_path: Option<&Path>) -> bool {
    bind_pdfium(library_path).is_ok()
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, ConvertError> {
    let mut last_error = String::from("no candidate library");

    let env_path = std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from);
    for candidate in library_path.map(Path::to_path_buf).into_iter().chain(env_path) {
        let file = library_file(&candidate);
        match Pdfium::bind_to_library(file.to_string_lossy().into_owned()) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", file.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => last_error = format!("{}: {e:?}", file.display()),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound system pdfium");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => Err(ConvertError::external(
            "pdfium",
            "binding the pdfium library",
            format!(
                "{last_error}; system library: {e:?} (set {PDFIUM_LIB_PATH_ENV} or configure a library path)"
            ),
        )),
    }
}

fn library_file(candidate: &Path) -> PathBuf {
    if candidate.is_dir() {
        candidate.join(PLATFORM_LIBRARY)
    } else {
        candidate.to_path_buf()
    }
}

fn load_error(e: PdfiumError, had_password: bool) -> ConvertError {
    let detail = format!("{e:?}");
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ConvertError::decode("PDF", "incorrect password")
        } else {
            ConvertError::decode("PDF", "document is encrypted; a password is required")
        }
    } else {
        ConvertError::decode("PDF", detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_candidate_gets_platform_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(library_file(dir.path()), dir.path().join(PLATFORM_LIBRARY));
        let file = dir.path().join("custom.so");
        assert_eq!(library_file(&file), file);
    }

    #[test]
    fn missing_library_is_external_error() {
        // Only meaningful where no system pdfium is installed.
        let bogus = Path::new("/nonexistent/libpdfium-test.so");
        if let Err(err) = bind_pdfium(Some(bogus)) {
            assert_eq!(err.kind(), crate::error::ErrorKind::ExternalLibraryError);
            assert!(err.to_string().contains("pdfium"));
        }
    }
}
