//! Error types for the conversion pipeline.
//!
//! Contract errors (`UnsupportedFormat`, `InputNotFound`, `InvalidParameter`)
//! abort an operation before any file is touched. Decode and encode failures
//! are contained per file and end up in a `ConversionResult`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// Extension is not in the format registry (or cannot be written)
    #[error("Unsupported format '{extension}'. Supported: {supported}")]
    UnsupportedFormat { extension: String, supported: String },

    /// Path missing, or not the kind the selected mode expects
    #[error("Input not found: {path} ({reason})")]
    InputNotFound { path: PathBuf, reason: String },

    /// The imaging backend could not parse the file
    #[error("Failed to decode {path}: {message}")]
    DecodeFailure { path: PathBuf, message: String },

    /// Writing the output failed
    #[error("Failed to encode {path}: {message}")]
    EncodeFailure { path: PathBuf, message: String },

    /// Malformed resize string, out-of-range quality, bad target extension
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type ConvertResult<T> = Result<T, ConvertError>;

impl ConvertError {
    pub fn unsupported(extension: impl Into<String>, supported: &[String]) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
            supported: supported.join(", "),
        }
    }

    pub fn not_found(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures that are contained to a single file
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailure { .. } | Self::EncodeFailure { .. }
        )
    }
}
