use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use super::formats::Codec;
use super::heif;

/// WebP quality when none is given
pub const DEFAULT_WEBP_QUALITY: u8 = 80;

/// Encode `img` to `path` in the given codec.
///
/// JPEG with a quality goes through an encoder with optimized Huffman tables.
/// WebP is always lossy. Formats without a quality concept ignore it.
pub fn encode_to_path(
    img: DynamicImage,
    codec: Codec,
    path: &Path,
    quality: Option<u8>,
) -> Result<()> {
    if codec == Codec::Heif {
        return heif::encode(&img, path, quality).map_err(|e| anyhow!(e));
    }

    let format = codec
        .image_format()
        .ok_or_else(|| anyhow!("{} cannot be written", codec))?;

    let img = prepare_for_codec(img, codec);

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match (codec, quality) {
        (Codec::Jpeg, Some(q)) => {
            debug!("Encoding JPEG with quality {}", q);
            write_jpeg(&img, &mut writer, q)
                .with_context(|| format!("Failed to write JPEG: {}", path.display()))?;
        }
        (Codec::WebP, q) => {
            let q = q.unwrap_or(DEFAULT_WEBP_QUALITY);
            debug!("Encoding WebP with quality {}", q);
            write_webp(&img, &mut writer, q)
                .with_context(|| format!("Failed to write WebP: {}", path.display()))?;
        }
        _ => {
            img.write_to(&mut writer, format)
                .with_context(|| format!("Failed to write {}: {}", codec, path.display()))?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", path.display()))?;
    Ok(())
}

fn write_jpeg<W: Write>(img: &DynamicImage, writer: W, quality: u8) -> Result<()> {
    let (width, height) = match (u16::try_from(img.width()), u16::try_from(img.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(anyhow!("JPEG is limited to 65535x65535 pixels")),
    };

    let mut encoder = jpeg_encoder::Encoder::new(writer, quality);
    encoder.set_optimized_huffman_tables(true);

    let encoded = match img {
        DynamicImage::ImageLuma8(gray) => {
            encoder.encode(gray.as_raw(), width, height, jpeg_encoder::ColorType::Luma)
        }
        other => {
            let rgb = other.to_rgb8();
            encoder.encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        }
    };
    encoded.map_err(|e| anyhow!("{}", e))
}

fn write_webp<W: Write>(img: &DynamicImage, mut writer: W, quality: u8) -> Result<()> {
    let encoder = webp::Encoder::from_image(img).map_err(|e| anyhow!("{}", e))?;
    let memory = encoder.encode(f32::from(quality));
    writer.write_all(&memory)?;
    Ok(())
}

/// Match the pixel layouts each encoder accepts
fn prepare_for_codec(img: DynamicImage, codec: Codec) -> DynamicImage {
    match (codec, &img) {
        (Codec::Jpeg, DynamicImage::ImageRgba8(_) | DynamicImage::ImageLumaA8(_)) => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        (Codec::Gif, DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_)) => {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        (Codec::WebP, DynamicImage::ImageLuma8(_)) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (Codec::WebP | Codec::Tiff, DynamicImage::ImageLumaA8(_)) => {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn gray_alpha(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLumaA8(ImageBuffer::from_fn(width, height, |x, y| {
            LumaA([(x * 20 % 256) as u8, if y == 0 { 0 } else { 255 }])
        }))
    }

    #[test]
    fn test_lossless_round_trip_is_pixel_identical() {
        let dir = TempDir::new().unwrap();
        let img = gradient(31, 17);

        for (codec, name) in [
            (Codec::Png, "out.png"),
            (Codec::Bmp, "out.bmp"),
            (Codec::Tiff, "out.tiff"),
        ] {
            let path = dir.path().join(name);
            encode_to_path(img.clone(), codec, &path, None).unwrap();
            let decoded = image::open(&path).unwrap();
            assert_eq!(decoded.to_rgb8(), img.to_rgb8(), "{} differs", codec);
            assert!(matches!(decoded, DynamicImage::ImageRgb8(_)), "{} mode", codec);
        }
    }

    #[test]
    fn test_lossy_round_trip_keeps_dimensions_and_mode() {
        let dir = TempDir::new().unwrap();
        let img = gradient(40, 24);

        for (codec, name) in [(Codec::Jpeg, "out.jpg"), (Codec::WebP, "out.webp")] {
            let path = dir.path().join(name);
            encode_to_path(img.clone(), codec, &path, Some(80)).unwrap();
            let decoded = image::open(&path).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (40, 24));
            assert!(matches!(decoded, DynamicImage::ImageRgb8(_)), "{} mode", codec);
        }
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let dir = TempDir::new().unwrap();
        let img = gradient(128, 128);
        let low = dir.path().join("low.jpg");
        let high = dir.path().join("high.jpg");

        encode_to_path(img.clone(), Codec::Jpeg, &low, Some(10)).unwrap();
        encode_to_path(img, Codec::Jpeg, &high, Some(95)).unwrap();

        let low_len = std::fs::metadata(&low).unwrap().len();
        let high_len = std::fs::metadata(&high).unwrap().len();
        assert!(low_len < high_len);
    }

    #[test]
    fn test_webp_quality_changes_output() {
        let dir = TempDir::new().unwrap();
        let img = gradient(128, 128);
        let low = dir.path().join("low.webp");
        let high = dir.path().join("high.webp");

        encode_to_path(img.clone(), Codec::WebP, &low, Some(5)).unwrap();
        encode_to_path(img.clone(), Codec::WebP, &high, Some(95)).unwrap();

        let low_bytes = std::fs::read(&low).unwrap();
        let high_bytes = std::fs::read(&high).unwrap();
        assert_ne!(low_bytes, high_bytes);
        assert!(low_bytes.len() < high_bytes.len());
        assert_ne!(image::open(&low).unwrap().to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn test_quality_ignored_for_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("q.png");
        encode_to_path(gradient(8, 8), Codec::Png, &path, Some(5)).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8(), gradient(8, 8).to_rgb8());
    }

    #[test]
    fn test_grayscale_gif_is_encodable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray.gif");
        let gray: GrayImage = ImageBuffer::from_pixel(6, 6, Luma([128u8]));
        encode_to_path(DynamicImage::ImageLuma8(gray), Codec::Gif, &path, None).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 6));
    }

    #[test]
    fn test_grayscale_jpeg_with_quality() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray.jpg");
        let gray: GrayImage = ImageBuffer::from_pixel(16, 16, Luma([100u8]));
        encode_to_path(DynamicImage::ImageLuma8(gray), Codec::Jpeg, &path, Some(90)).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn test_gray_alpha_is_encodable_everywhere_alpha_fits() {
        let dir = TempDir::new().unwrap();
        for (codec, name) in [
            (Codec::Png, "la.png"),
            (Codec::Tiff, "la.tiff"),
            (Codec::WebP, "la.webp"),
            (Codec::Gif, "la.gif"),
            (Codec::Bmp, "la.bmp"),
        ] {
            let path = dir.path().join(name);
            encode_to_path(gray_alpha(8, 8), codec, &path, None)
                .unwrap_or_else(|e| panic!("{} failed: {:#}", codec, e));
            let decoded = image::open(&path).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (8, 8), "{}", codec);
        }

        let tiff = image::open(dir.path().join("la.tiff")).unwrap().to_rgba8();
        assert_eq!(tiff.get_pixel(2, 0)[3], 0);
        assert_eq!(tiff.get_pixel(2, 3)[3], 255);
    }

    #[cfg(not(feature = "heic"))]
    #[test]
    fn test_heif_encode_needs_feature() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.heic");
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert!(encode_to_path(img, Codec::Heif, &path, None).is_err());
        assert!(!path.exists());
    }
}
