//! Configuration types for file conversion.
//!
//! [`ConversionConfig`] carries the knobs that do not change conversion
//! output: how many jobs run at once, input size limits, where to find the
//! pdfium library and the password for encrypted PDF sources. Output-shaping
//! values (JPEG quality, page margins, layout widths) are fixed constants in
//! [`crate::policy`] and are deliberately absent here.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default cap on a single input file: 256 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 256 * 1024 * 1024;

/// Configuration for conversions and job batches.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_convert::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .concurrency(8)
///     .max_input_bytes(50 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 8);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Number of jobs converted at the same time by [`crate::jobs::JobQueue`]
    /// and [`crate::stream::convert_stream`]. Default: 4.
    ///
    /// Jobs share nothing, so this only bounds CPU and memory use.
    pub concurrency: usize,

    /// Inputs larger than this are rejected before decoding. Default: 256 MiB.
    pub max_input_bytes: usize,

    /// Directory or full path of the pdfium shared library.
    ///
    /// When `None`, `PDFIUM_LIB_PATH` is consulted, then the system library
    /// search path. Only PDF sources need pdfium.
    pub pdfium_library_path: Option<PathBuf>,

    /// User password for encrypted PDF sources.
    pub pdf_password: Option<String>,

    /// Optional per-job progress callback for batch runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            pdfium_library_path: None,
            pdf_password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("concurrency", &self.concurrency)
            .field("max_input_bytes", &self.max_input_bytes)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("pdf_password", &self.pdf_password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn max_input_bytes(mut self, n: usize) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_input_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_input_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
        assert!(c.pdfium_library_path.is_none());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = ConversionConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn zero_size_limit_rejected() {
        assert!(ConversionConfig::builder().max_input_bytes(0).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder()
            .pdf_password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
