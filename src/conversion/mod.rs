pub mod batch;
pub mod convert;
pub mod encode;
pub mod engine;
pub mod formats;
mod heif;
pub mod resize;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConvertError, ConvertResult};

pub use batch::{BatchInput, BatchProgress, BatchRunner, BatchTally, FailedConversion};
pub use engine::ConversionEngine;
pub use formats::{Capability, Codec, FormatEntry, FormatRegistry};
pub use resize::TargetSize;

/// Quality range accepted for lossy encoders
pub const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=100;

/// Per-conversion knobs. Absent values mean "encoder default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    pub quality: Option<u8>,
    pub target_size: Option<TargetSize>,
}

impl ConversionOptions {
    /// Build from raw front-end values, rejecting anything out of range
    pub fn from_raw(quality: Option<u32>, resize: Option<&str>) -> ConvertResult<Self> {
        let quality = match quality {
            Some(q) => Some(
                u8::try_from(q)
                    .ok()
                    .filter(|q| QUALITY_RANGE.contains(q))
                    .ok_or_else(|| quality_error(q))?,
            ),
            None => None,
        };
        let target_size = resize.map(str::parse::<TargetSize>).transpose()?;

        let options = Self {
            quality,
            target_size,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> ConvertResult<()> {
        if let Some(q) = self.quality {
            if !QUALITY_RANGE.contains(&q) {
                return Err(quality_error(q as u32));
            }
        }
        if let Some(size) = self.target_size {
            TargetSize::new(size.width, size.height)?;
        }
        Ok(())
    }
}

fn quality_error(q: u32) -> ConvertError {
    ConvertError::invalid(format!("Quality must be between 1 and 100, got {}", q))
}

/// One conversion to perform. Built per call, not retained.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub options: ConversionOptions,
}

impl ConversionRequest {
    pub fn new(input_path: &Path, output_path: &Path, options: ConversionOptions) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            options,
        }
    }
}

/// Outcome of one file, immutable once built
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ConversionResult {
    pub(crate) fn success(request: &ConversionRequest, elapsed: Duration) -> Self {
        Self {
            input_path: request.input_path.clone(),
            output_path: request.output_path.clone(),
            error: None,
            elapsed,
        }
    }

    pub(crate) fn failure(request: &ConversionRequest, error: String, elapsed: Duration) -> Self {
        Self {
            input_path: request.input_path.clone(),
            output_path: request.output_path.clone(),
            error: Some(error),
            elapsed,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
