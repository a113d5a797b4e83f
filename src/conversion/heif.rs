// HEIC/HEIF decoding and encoding through libheif, compiled in with the
// `heic` feature. Without the feature the availability check fails and the
// registry omits .heic/.heif.

use image::DynamicImage;
use std::path::Path;

#[cfg(feature = "heic")]
pub fn check_available() -> Result<(), String> {
    libheif_rs::HeifContext::new()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "heic"))]
pub fn check_available() -> Result<(), String> {
    Err("built without the `heic` feature".to_string())
}

#[cfg(feature = "heic")]
pub fn decode(path: &Path) -> Result<DynamicImage, String> {
    use image::{RgbImage, RgbaImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let path_str = path
        .to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str).map_err(|e| e.to_string())?;
    let handle = ctx.primary_image_handle().map_err(|e| e.to_string())?;

    let has_alpha = handle.has_alpha_channel();
    let chroma = if has_alpha {
        RgbChroma::Rgba
    } else {
        RgbChroma::Rgb
    };
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| e.to_string())?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| "decoder returned no interleaved plane".to_string())?;

    let channels = if has_alpha { 4 } else { 3 };
    let row_len = plane.width as usize * channels;
    let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }

    let image = if has_alpha {
        RgbaImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgba8)
    } else {
        RgbImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgb8)
    };
    image.ok_or_else(|| "decoded plane has unexpected size".to_string())
}

#[cfg(not(feature = "heic"))]
pub fn decode(path: &Path) -> Result<DynamicImage, String> {
    Err(format!(
        "cannot decode {}: built without the `heic` feature",
        path.display()
    ))
}

/// HEVC quality when none is given
#[cfg(feature = "heic")]
pub const DEFAULT_HEIF_QUALITY: u8 = 90;

#[cfg(feature = "heic")]
pub fn encode(img: &DynamicImage, path: &Path, quality: Option<u8>) -> Result<(), String> {
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    let path_str = path
        .to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))?;

    let (width, height) = (img.width(), img.height());
    let has_alpha = img.color().has_alpha();
    let (chroma, channels, pixels) = if has_alpha {
        (RgbChroma::Rgba, 4, img.to_rgba8().into_raw())
    } else {
        (RgbChroma::Rgb, 3, img.to_rgb8().into_raw())
    };

    let mut image =
        Image::new(width, height, ColorSpace::Rgb(chroma)).map_err(|e| e.to_string())?;
    image
        .create_plane(Channel::Interleaved, width, height, 8)
        .map_err(|e| e.to_string())?;
    {
        let planes = image.planes_mut();
        let plane = planes
            .interleaved
            .ok_or_else(|| "encoder image has no interleaved plane".to_string())?;
        let row_len = width as usize * channels;
        for (dst, src) in plane
            .data
            .chunks_mut(plane.stride)
            .zip(pixels.chunks(row_len))
        {
            dst[..row_len].copy_from_slice(src);
        }
    }

    let lib_heif = LibHeif::new();
    let mut ctx = HeifContext::new().map_err(|e| e.to_string())?;
    let mut encoder = lib_heif
        .encoder_for_format(CompressionFormat::Hevc)
        .map_err(|e| e.to_string())?;
    encoder
        .set_quality(EncoderQuality::Lossy(
            quality.unwrap_or(DEFAULT_HEIF_QUALITY),
        ))
        .map_err(|e| e.to_string())?;
    ctx.encode_image(&image, &mut encoder, None)
        .map_err(|e| e.to_string())?;
    ctx.write_to_file(path_str).map_err(|e| e.to_string())
}

#[cfg(not(feature = "heic"))]
pub fn encode(_img: &DynamicImage, path: &Path, _quality: Option<u8>) -> Result<(), String> {
    Err(format!(
        "cannot encode {}: built without the `heic` feature",
        path.display()
    ))
}
