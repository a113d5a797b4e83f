use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

use super::convert::{flatten_alpha, normalize_color_mode, ColorMode};
use super::encode::encode_to_path;
use super::formats::{Codec, FormatRegistry};
use super::resize::resize_exact;
use super::{heif, ConversionRequest, ConversionResult};
use crate::error::{ConvertError, ConvertResult};

/// Converts one image at a time. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct ConversionEngine {
    registry: FormatRegistry,
}

impl ConversionEngine {
    pub fn new(registry: FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Check the request contract without touching the filesystem beyond a stat.
    ///
    /// Returns the input and output codecs.
    pub fn check_request(&self, request: &ConversionRequest) -> ConvertResult<(Codec, Codec)> {
        request.options.validate()?;

        let input = &request.input_path;
        if !input.exists() {
            return Err(ConvertError::not_found(input, "path does not exist"));
        }
        if !input.is_file() {
            return Err(ConvertError::not_found(input, "not a file"));
        }

        let input_codec = self.registry.codec_for_path(input)?;
        let output_ext = request
            .output_path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ConvertError::unsupported(
                    format!("{} (no extension)", request.output_path.display()),
                    &self.registry.writable_extensions(),
                )
            })?;
        let output_codec = self.registry.writable_codec_for(output_ext)?;

        Ok((input_codec, output_codec))
    }

    /// Convert a single file.
    ///
    /// Contract violations come back as `Err` before any I/O. Decode and encode
    /// failures are contained in the returned `ConversionResult`.
    pub fn convert(&self, request: &ConversionRequest) -> ConvertResult<ConversionResult> {
        let (input_codec, output_codec) = self.check_request(request)?;
        let start = Instant::now();

        debug!(
            "Converting {} ({}) -> {} ({})",
            request.input_path.display(),
            input_codec,
            request.output_path.display(),
            output_codec
        );

        let outcome = self.run_pipeline(request, input_codec, output_codec);
        let elapsed = start.elapsed();

        match outcome {
            Ok(()) => Ok(ConversionResult::success(request, elapsed)),
            Err(err) => {
                warn!("{}", err);
                Ok(ConversionResult::failure(request, err.to_string(), elapsed))
            }
        }
    }

    fn run_pipeline(
        &self,
        request: &ConversionRequest,
        input_codec: Codec,
        output_codec: Codec,
    ) -> ConvertResult<()> {
        let input = request.input_path.as_path();
        let output = request.output_path.as_path();

        let img = decode(input, input_codec)?;
        debug!(
            "Decoded {}x{} {:?}",
            img.width(),
            img.height(),
            img.color()
        );

        let mut img = normalize_color_mode(img);

        let has_alpha = ColorMode::of(&img).is_some_and(|mode| mode.has_alpha());
        if !output_codec.supports_alpha() && has_alpha {
            debug!("Flattening alpha onto white for {}", output_codec);
            img = flatten_alpha(img);
        }

        if let Some(size) = request.options.target_size {
            debug!("Resizing to {}", size);
            img = resize_exact(&img, size).map_err(|e| ConvertError::EncodeFailure {
                path: output.to_path_buf(),
                message: format!("{:#}", e),
            })?;
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConvertError::EncodeFailure {
                path: output.to_path_buf(),
                message: format!("Failed to create output directory: {}", e),
            })?;
        }

        let quality = if output_codec.supports_quality() {
            request.options.quality
        } else {
            None
        };

        if let Err(e) = encode_to_path(img, output_codec, output, quality) {
            // Don't leave a truncated file behind
            let _ = std::fs::remove_file(output);
            return Err(ConvertError::EncodeFailure {
                path: output.to_path_buf(),
                message: format!("{:#}", e),
            });
        }

        Ok(())
    }
}

fn decode(path: &Path, codec: Codec) -> ConvertResult<DynamicImage> {
    let decoded = match codec.image_format() {
        Some(format) => image::ImageReader::open(path)
            .map_err(|e| e.to_string())
            .and_then(|mut reader| {
                reader.set_format(format);
                reader.decode().map_err(|e| e.to_string())
            }),
        None => heif::decode(path),
    };

    decoded.map_err(|message| ConvertError::DecodeFailure {
        path: path.to_path_buf(),
        message,
    })
}
