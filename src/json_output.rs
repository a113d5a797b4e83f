//! JSON output for scripting and GUI integration
//!
//! When the --json flag is enabled, progress and status information is
//! emitted as JSON lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::conversion::{BatchTally, ConversionResult, FormatRegistry};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// Progress update
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// File conversion completed
    FileCompleted {
        input_path: String,
        output_path: String,
        processing_time_ms: u128,
    },
    /// File conversion failed
    FileFailed { input_path: String, error: String },
    /// Conversion summary
    Summary {
        total_files: usize,
        converted: usize,
        failed: usize,
        duration_secs: f64,
    },
    /// Request rejected before any file was touched
    Error { message: String },
    /// One registered extension, for --list-formats
    Format {
        extension: String,
        codec: String,
        writable: bool,
    },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn progress(current: usize, total: usize, input: &Path) {
        Self::Progress {
            current,
            total,
            message: format!("Converting {}", input.display()),
        }
        .emit();
    }

    /// Completed or failed message for one result
    pub fn from_result(result: &ConversionResult) -> Self {
        match &result.error {
            None => Self::FileCompleted {
                input_path: result.input_path.display().to_string(),
                output_path: result.output_path.display().to_string(),
                processing_time_ms: result.elapsed.as_millis(),
            },
            Some(error) => Self::FileFailed {
                input_path: result.input_path.display().to_string(),
                error: error.clone(),
            },
        }
    }

    pub fn summary(tally: &BatchTally) -> Self {
        Self::Summary {
            total_files: tally.total(),
            converted: tally.converted_count,
            failed: tally.failed_count,
            duration_secs: tally.elapsed.as_secs_f64(),
        }
    }

    /// One `Format` message per registered extension, in extension order
    pub fn formats(registry: &FormatRegistry) -> Vec<Self> {
        registry
            .entries()
            .into_iter()
            .map(|entry| Self::Format {
                writable: entry.codec.is_writable(),
                codec: entry.codec.to_string(),
                extension: entry.extension,
            })
            .collect()
    }

    pub fn error(message: impl Into<String>) {
        Self::Error {
            message: message.into(),
        }
        .emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Capability;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_messages_are_tagged() {
        let msg = JsonMessage::Progress {
            current: 1,
            total: 3,
            message: "Converting a.png".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.starts_with(r#"{"type":"progress""#));

        let parsed: JsonMessage =
            serde_json::from_str(r#"{"type":"filefailed","input_path":"x.png","error":"bad"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            JsonMessage::FileFailed {
                input_path: "x.png".to_string(),
                error: "bad".to_string()
            }
        );
    }

    #[test]
    fn test_from_result() {
        let ok = ConversionResult {
            input_path: PathBuf::from("a.png"),
            output_path: PathBuf::from("a.jpg"),
            error: None,
            elapsed: Duration::from_millis(12),
        };
        assert!(matches!(
            JsonMessage::from_result(&ok),
            JsonMessage::FileCompleted {
                processing_time_ms: 12,
                ..
            }
        ));

        let failed = ConversionResult {
            error: Some("Failed to decode".to_string()),
            ..ok
        };
        assert!(matches!(
            JsonMessage::from_result(&failed),
            JsonMessage::FileFailed { .. }
        ));
    }

    #[test]
    fn test_format_listing() {
        let messages = JsonMessage::formats(&FormatRegistry::new(Capability::Unavailable));
        assert_eq!(messages.len(), 8);
        assert!(messages.iter().all(|m| matches!(m, JsonMessage::Format { writable: true, .. })));

        let json = serde_json::to_string(&messages[0]).unwrap();
        assert_eq!(
            json,
            r#"{"type":"format","extension":".bmp","codec":"BMP","writable":true}"#
        );

        let with_heif = JsonMessage::formats(&FormatRegistry::new(Capability::Available));
        assert!(with_heif.contains(&JsonMessage::Format {
            extension: ".heic".to_string(),
            codec: "HEIF".to_string(),
            writable: cfg!(feature = "heic"),
        }));
    }

    #[test]
    fn test_summary_counts() {
        let tally = BatchTally {
            converted_count: 3,
            failed_count: 1,
            ..Default::default()
        };
        assert!(matches!(
            JsonMessage::summary(&tally),
            JsonMessage::Summary {
                total_files: 4,
                converted: 3,
                failed: 1,
                ..
            }
        ));
    }
}
