use anyhow::{Context, Result};
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use std::fmt;
use std::str::FromStr;

use crate::error::ConvertError;

/// Exact output dimensions for a resize, both non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 {
            return Err(ConvertError::invalid(
                "Width and height must be greater than 0",
            ));
        }
        Ok(Self { width, height })
    }
}

impl FromStr for TargetSize {
    type Err = ConvertError;

    /// Parse `WIDTHxHEIGHT`, e.g. `800x600`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(['x', 'X']).collect();
        if parts.len() != 2 {
            return Err(ConvertError::invalid(format!(
                "Invalid resize format '{}'. Use WIDTHxHEIGHT (e.g., 800x600)",
                s
            )));
        }

        let width = parts[0]
            .trim()
            .parse::<u32>()
            .map_err(|_| ConvertError::invalid(format!("Invalid width: '{}'", parts[0])))?;
        let height = parts[1]
            .trim()
            .parse::<u32>()
            .map_err(|_| ConvertError::invalid(format!("Invalid height: '{}'", parts[1])))?;

        Self::new(width, height)
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resample to exactly `size` with Lanczos3, ignoring the source aspect ratio.
///
/// Expects an already normalized color mode (RGB, RGBA, L, LA).
pub fn resize_exact(img: &DynamicImage, size: TargetSize) -> Result<DynamicImage> {
    let (src_width, src_height) = (img.width(), img.height());
    if src_width == size.width && src_height == size.height {
        return Ok(img.clone());
    }
    if src_width == 0 || src_height == 0 {
        return Err(anyhow::anyhow!("Source image has zero size"));
    }

    let (pixel_type, src_pixels) = match img {
        DynamicImage::ImageLuma8(buf) => (PixelType::U8, buf.as_raw().clone()),
        DynamicImage::ImageLumaA8(buf) => (PixelType::U8x2, buf.as_raw().clone()),
        DynamicImage::ImageRgba8(buf) => (PixelType::U8x4, buf.as_raw().clone()),
        other => (PixelType::U8x3, other.to_rgb8().into_raw()),
    };

    let src_image = Image::from_vec_u8(src_width, src_height, src_pixels, pixel_type)
        .context("Failed to wrap source pixels")?;
    let mut dst_image = Image::new(size.width, size.height, pixel_type);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .context("Resize failed")?;

    let pixels = dst_image.into_vec();
    let resized = match pixel_type {
        PixelType::U8 => GrayImage::from_raw(size.width, size.height, pixels)
            .map(DynamicImage::ImageLuma8),
        PixelType::U8x2 => GrayAlphaImage::from_raw(size.width, size.height, pixels)
            .map(DynamicImage::ImageLumaA8),
        PixelType::U8x4 => RgbaImage::from_raw(size.width, size.height, pixels)
            .map(DynamicImage::ImageRgba8),
        _ => RgbImage::from_raw(size.width, size.height, pixels).map(DynamicImage::ImageRgb8),
    };

    resized.ok_or_else(|| anyhow::anyhow!("Resized buffer has unexpected length"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn create_test_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_parse_target_size() {
        assert_eq!(
            "800x600".parse::<TargetSize>().unwrap(),
            TargetSize { width: 800, height: 600 }
        );
        assert_eq!("200X100".parse::<TargetSize>().unwrap().to_string(), "200x100");
    }

    #[test]
    fn test_parse_target_size_invalid() {
        assert!("invalid".parse::<TargetSize>().is_err());
        assert!("800".parse::<TargetSize>().is_err());
        assert!("0x480".parse::<TargetSize>().is_err());
        assert!("-5x10".parse::<TargetSize>().is_err());
        assert!("10x10x10".parse::<TargetSize>().is_err());
    }

    #[test]
    fn test_resize_ignores_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(create_test_image(123, 457));
        let resized = resize_exact(&img, TargetSize::new(200, 100).unwrap()).unwrap();
        assert_eq!((resized.width(), resized.height()), (200, 100));
        assert!(matches!(resized, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_resize_keeps_alpha_mode() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(40, 40, Rgba([9, 9, 9, 100])));
        let resized = resize_exact(&img, TargetSize::new(10, 30).unwrap()).unwrap();
        assert_eq!((resized.width(), resized.height()), (10, 30));
        assert!(matches!(resized, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_resize_grayscale() {
        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(16, 8, image::Luma([77u8])));
        let resized = resize_exact(&gray, TargetSize::new(4, 4).unwrap()).unwrap();
        assert!(matches!(resized, DynamicImage::ImageLuma8(_)));
        assert_eq!(resized.to_luma8().get_pixel(2, 2)[0], 77);
    }

    #[test]
    fn test_same_size_is_a_copy() {
        let img = DynamicImage::ImageRgb8(create_test_image(20, 10));
        let resized = resize_exact(&img, TargetSize::new(20, 10).unwrap()).unwrap();
        assert_eq!(resized, img);
    }
}
