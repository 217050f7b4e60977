//! Error types for the edgequake-convert library.
//!
//! Every failure surfaces as a [`ConvertError`]. The conversion core never
//! retries and never returns partial output: a call either yields complete
//! bytes in the requested format or one of these errors.
//!
//! Callers that only care about the broad failure class (e.g. to decide what
//! to show in a job list) use [`ConvertError::kind`], which maps each variant
//! onto the closed [`ErrorKind`] taxonomy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Broad failure class of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The (category, target) pair is not in the compatibility table.
    UnsupportedConversion,
    /// The source is recognised but its branch cannot produce the target.
    UnsupportedTarget,
    /// Source bytes are malformed or corrupt.
    DecodeError,
    /// The intermediate form could not be serialised to the target.
    EncodeError,
    /// An underlying codec library failed.
    ExternalLibraryError,
    /// Invalid library configuration.
    Config,
    /// Reading input or writing output on the file system failed.
    Io,
    /// A job state transition was rejected.
    Job,
}

/// All errors returned by the edgequake-convert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Routing errors ────────────────────────────────────────────────────
    /// File could not be classified, target MIME type is unknown, or the
    /// pair is absent from the compatibility table.
    #[error("Cannot convert '{file}' ({source_kind}) to '{target}'")]
    UnsupportedConversion {
        file: String,
        source_kind: String,
        target: String,
    },

    /// The branch handling this source does not produce the requested target.
    #[error("{source_format} sources cannot be converted to '{target}'")]
    UnsupportedTarget {
        source_format: String,
        target: String,
    },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Source bytes could not be decoded.
    #[error("Failed to decode {format} input: {detail}")]
    Decode { format: String, detail: String },

    /// The intermediate representation could not be encoded.
    #[error("Failed to encode {target} output: {detail}")]
    Encode { target: String, detail: String },

    /// A codec library reported an error.
    #[error("{library} failed while {context}: {detail}")]
    ExternalLibrary {
        library: &'static str,
        context: String,
        detail: String,
    },

    /// A blocking conversion task panicked or was aborted.
    #[error("Conversion task failed: {0}")]
    TaskFailed(String),

    // ── Input / output errors ─────────────────────────────────────────────
    /// Input exceeds `ConversionConfig::max_input_bytes`.
    #[error("Input '{file}' is {size} bytes, above the {limit}-byte limit")]
    InputTooLarge { file: String, size: usize, limit: usize },

    /// Reading or writing a file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Job errors ────────────────────────────────────────────────────────
    /// A job was asked to leave a terminal state or skip a step.
    #[error("Job {id}: illegal transition {from} → {to}")]
    InvalidJobTransition {
        id: u64,
        from: &'static str,
        to: &'static str,
    },
}

impl ConvertError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::UnsupportedConversion { .. } => ErrorKind::UnsupportedConversion,
            ConvertError::UnsupportedTarget { .. } => ErrorKind::UnsupportedTarget,
            ConvertError::Decode { .. } => ErrorKind::DecodeError,
            ConvertError::Encode { .. } => ErrorKind::EncodeError,
            ConvertError::ExternalLibrary { .. } | ConvertError::TaskFailed(_) => {
                ErrorKind::ExternalLibraryError
            }
            ConvertError::InputTooLarge { .. } | ConvertError::InvalidConfig(_) => ErrorKind::Config,
            ConvertError::Io { .. } => ErrorKind::Io,
            ConvertError::InvalidJobTransition { .. } => ErrorKind::Job,
        }
    }

    pub(crate) fn decode(format: impl Into<String>, detail: impl ToString) -> Self {
        ConvertError::Decode {
            format: format.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn encode(target: impl Into<String>, detail: impl ToString) -> Self {
        ConvertError::Encode {
            target: target.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn external(
        library: &'static str,
        context: impl Into<String>,
        detail: impl ToString,
    ) -> Self {
        ConvertError::ExternalLibrary {
            library,
            context: context.into(),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_conversion_display() {
        let e = ConvertError::UnsupportedConversion {
            file: "archive.zip".into(),
            source_kind: "unclassified".into(),
            target: "application/pdf".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("archive.zip"), "got: {msg}");
        assert!(msg.contains("application/pdf"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::UnsupportedConversion);
    }

    #[test]
    fn external_library_display() {
        let e = ConvertError::external("lopdf", "saving document", "broken pipe");
        assert_eq!(e.to_string(), "lopdf failed while saving document: broken pipe");
        assert_eq!(e.kind(), ErrorKind::ExternalLibraryError);
    }

    #[test]
    fn task_failure_is_external_library_kind() {
        let e = ConvertError::TaskFailed("panicked".into());
        assert_eq!(e.kind(), ErrorKind::ExternalLibraryError);
    }

    #[test]
    fn decode_and_encode_kinds() {
        assert_eq!(ConvertError::decode("TIFF", "no IFD").kind(), ErrorKind::DecodeError);
        assert_eq!(ConvertError::encode("CSV", "empty").kind(), ErrorKind::EncodeError);
    }

    #[test]
    fn job_transition_display() {
        let e = ConvertError::InvalidJobTransition {
            id: 7,
            from: "done",
            to: "converting",
        };
        assert!(e.to_string().contains("Job 7"));
        assert_eq!(e.kind(), ErrorKind::Job);
    }
}
