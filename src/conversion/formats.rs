use std::collections::BTreeMap;
use std::path::Path;
use strum_macros::{Display, EnumIter};
use tracing::{debug, warn};

use crate::error::{ConvertError, ConvertResult};

/// Canonical codec identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Codec {
    #[strum(serialize = "JPEG")]
    Jpeg,
    #[strum(serialize = "PNG")]
    Png,
    #[strum(serialize = "WEBP")]
    WebP,
    #[strum(serialize = "GIF")]
    Gif,
    #[strum(serialize = "BMP")]
    Bmp,
    #[strum(serialize = "TIFF")]
    Tiff,
    #[strum(serialize = "HEIF")]
    Heif,
}

impl Codec {
    /// Backend format used for decoding and encoding, `None` for HEIF
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Png => Some(image::ImageFormat::Png),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Gif => Some(image::ImageFormat::Gif),
            Self::Bmp => Some(image::ImageFormat::Bmp),
            Self::Tiff => Some(image::ImageFormat::Tiff),
            Self::Heif => None,
        }
    }

    /// HEIF needs the libheif encoder compiled in
    pub fn is_writable(&self) -> bool {
        match self {
            Self::Heif => cfg!(feature = "heic"),
            _ => true,
        }
    }

    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    pub fn supports_quality(&self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Heif)
    }
}

/// Runtime availability of an optional codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable,
}

impl Capability {
    /// Check HEIF support once at startup. Failure degrades silently.
    pub fn detect_heif() -> Self {
        match super::heif::check_available() {
            Ok(()) => {
                debug!("HEIF decoder available");
                Self::Available
            }
            Err(reason) => {
                debug!("HEIF decoder unavailable: {}", reason);
                Self::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    pub extension: String,
    pub codec: Codec,
}

const BASE_FORMATS: &[(&str, Codec)] = &[
    (".jpg", Codec::Jpeg),
    (".jpeg", Codec::Jpeg),
    (".png", Codec::Png),
    (".webp", Codec::WebP),
    (".gif", Codec::Gif),
    (".bmp", Codec::Bmp),
    (".tiff", Codec::Tiff),
    (".tif", Codec::Tiff),
];

const HEIF_FORMATS: &[(&str, Codec)] = &[(".heic", Codec::Heif), (".heif", Codec::Heif)];

/// Normalize an extension to lowercase with a leading dot
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Read-only mapping from extension to codec, built once per process
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    entries: BTreeMap<String, Codec>,
    heif: Capability,
}

impl FormatRegistry {
    pub fn new(heif: Capability) -> Self {
        let mut entries: BTreeMap<String, Codec> = BASE_FORMATS
            .iter()
            .map(|(ext, codec)| (ext.to_string(), *codec))
            .collect();

        if heif.is_available() {
            entries.extend(HEIF_FORMATS.iter().map(|(ext, codec)| (ext.to_string(), *codec)));
        } else {
            warn!("HEIC/HEIF support not available, .heic/.heif files will be rejected");
        }

        Self { entries, heif }
    }

    /// Registry with the HEIF capability detected from the environment
    pub fn detect() -> Self {
        Self::new(Capability::detect_heif())
    }

    pub fn heif_capability(&self) -> Capability {
        self.heif
    }

    pub fn entries(&self) -> Vec<FormatEntry> {
        self.entries
            .iter()
            .map(|(extension, codec)| FormatEntry {
                extension: extension.clone(),
                codec: *codec,
            })
            .collect()
    }

    /// Sorted, dot-prefixed, lowercase
    pub fn supported_extensions(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn writable_extensions(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, codec)| codec.is_writable())
            .map(|(ext, _)| ext.clone())
            .collect()
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        self.entries.contains_key(&normalize_extension(extension))
    }

    pub fn codec_for(&self, extension: &str) -> ConvertResult<Codec> {
        self.entries
            .get(&normalize_extension(extension))
            .copied()
            .ok_or_else(|| ConvertError::unsupported(extension, &self.supported_extensions()))
    }

    pub fn writable_codec_for(&self, extension: &str) -> ConvertResult<Codec> {
        match self.codec_for(extension) {
            Ok(codec) if codec.is_writable() => Ok(codec),
            _ => Err(ConvertError::unsupported(
                extension,
                &self.writable_extensions(),
            )),
        }
    }

    pub fn codec_for_path(&self, path: &Path) -> ConvertResult<Codec> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ConvertError::unsupported(
                    format!("{} (no extension)", path.display()),
                    &self.supported_extensions(),
                )
            })?;
        self.codec_for(ext)
    }

    /// True when the path's extension is in the registry
    pub fn is_supported_path(&self, path: &Path) -> bool {
        self.codec_for_path(path).is_ok()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::detect()
    }
}
