// Library exports for reuse by the GUI and other applications
pub mod cli;
pub mod config_file;
pub mod conversion;
pub mod error;
pub mod json_output;
pub mod utils;

// Re-export commonly used types
pub use conversion::{
    BatchInput, BatchProgress, BatchRunner, BatchTally, Capability, Codec, ConversionEngine,
    ConversionOptions, ConversionRequest, ConversionResult, FormatRegistry, TargetSize,
};
pub use error::{ConvertError, ConvertResult};
pub use json_output::JsonMessage;
