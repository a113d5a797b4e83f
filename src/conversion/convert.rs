use image::{DynamicImage, GrayImage, Rgb, RgbImage};

/// Color modes the pipeline carries through resize and encode unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Gray,
    GrayAlpha,
}

impl ColorMode {
    /// `None` for anything outside the 8-bit set (16-bit, float, ...)
    pub fn of(img: &DynamicImage) -> Option<Self> {
        match img {
            DynamicImage::ImageRgb8(_) => Some(Self::Rgb),
            DynamicImage::ImageRgba8(_) => Some(Self::Rgba),
            DynamicImage::ImageLuma8(_) => Some(Self::Gray),
            DynamicImage::ImageLumaA8(_) => Some(Self::GrayAlpha),
            _ => None,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba | Self::GrayAlpha)
    }
}

/// Reduce high bit depth and float images to the 8-bit variant of the same
/// color model. Alpha survives so it can be flattened or kept later.
pub fn normalize_color_mode(img: DynamicImage) -> DynamicImage {
    if ColorMode::of(&img).is_some() {
        return img;
    }
    match img {
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// Composite onto opaque white using the alpha channel as the blend mask.
///
/// Images without alpha are returned untouched.
pub fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgba8(rgba) => {
            let (width, height) = rgba.dimensions();
            let flattened = RgbImage::from_fn(width, height, |x, y| {
                let p = rgba.get_pixel(x, y);
                let a = p[3];
                Rgb([
                    blend_on_white(p[0], a),
                    blend_on_white(p[1], a),
                    blend_on_white(p[2], a),
                ])
            });
            DynamicImage::ImageRgb8(flattened)
        }
        DynamicImage::ImageLumaA8(la) => {
            let (width, height) = la.dimensions();
            let flattened = GrayImage::from_fn(width, height, |x, y| {
                let p = la.get_pixel(x, y);
                image::Luma([blend_on_white(p[0], p[1])])
            });
            DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(flattened).to_rgb8())
        }
        other => other,
    }
}

fn blend_on_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
