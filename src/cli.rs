use clap::Parser;
use std::path::PathBuf;

use crate::conversion::formats::normalize_extension;
use crate::conversion::{ConversionOptions, TargetSize};
use crate::error::ConvertResult;

#[derive(Parser, Debug)]
#[command(
    name = "photo-converter",
    version,
    about = "Convert images between JPEG, PNG, WebP, GIF, BMP, TIFF and HEIC/HEIF",
    long_about = "
Photo Converter

Converts a single image, or every image in a folder, to another raster format.
Transparent images written as JPEG are placed on a white background.

Example Usage:
  # Single file
  photo-converter photo.png photo.jpg

  # Single file with quality and exact resize (aspect ratio is not kept)
  photo-converter photo.heic photo.jpg -q 95 --resize 1920x1080

  # Whole folder to WebP (output defaults to <folder>/converted)
  photo-converter ~/Pictures --batch -f webp

  # Folder to JPEG in another directory, verbose
  photo-converter ~/Pictures --batch -o ~/converted -f jpg -q 85 -v

  # Show what this build can read and write
  photo-converter --list-formats"
)]
pub struct Args {
    /// Input image file, or a directory with --batch
    #[arg(value_name = "INPUT", required_unless_present = "list_formats")]
    pub input_path: Option<PathBuf>,

    /// Output file for single-file conversion
    #[arg(value_name = "OUTPUT")]
    pub output_path: Option<PathBuf>,

    /// Process all images in the input directory
    #[arg(long = "batch")]
    pub batch: bool,

    /// Output directory for batch processing (default: INPUT/converted)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Target format for batch conversion (jpg, png, webp, ...)
    #[arg(short = 'f', long = "format", value_name = "EXT")]
    pub format: Option<String>,

    /// Quality for lossy formats (1-100)
    #[arg(short = 'q', long = "quality", value_name = "N")]
    pub quality: Option<u32>,

    /// Resize images to exactly WIDTHxHEIGHT, e.g. 800x600
    #[arg(long = "resize", value_name = "WIDTHxHEIGHT")]
    pub resize: Option<String>,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// JSON file with default values for options not given on the command line
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Emit JSON lines instead of styled output
    #[arg(long = "json")]
    pub json: bool,

    /// List supported formats and exit
    #[arg(long = "list-formats")]
    pub list_formats: bool,
}

impl Args {
    /// Parse the resize string into a target size
    pub fn parse_resize(&self) -> ConvertResult<Option<TargetSize>> {
        self.resize
            .as_deref()
            .map(str::parse::<TargetSize>)
            .transpose()
    }

    /// Validated conversion options from quality and resize
    pub fn conversion_options(&self) -> ConvertResult<ConversionOptions> {
        ConversionOptions::from_raw(self.quality, self.resize.as_deref())
    }

    /// Target format, dot-prefixed and lowercase
    pub fn normalized_format(&self) -> Option<String> {
        self.format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(normalize_extension)
    }

    /// Batch output directory, defaulting to INPUT/converted
    pub fn batch_output_dir(&self) -> Option<PathBuf> {
        self.output_dir.clone().or_else(|| {
            self.input_path
                .as_ref()
                .map(|input| input.join("converted"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_mode() {
        let args = Args::try_parse_from([
            "photo-converter",
            "in.png",
            "out.jpg",
            "-q",
            "80",
            "--resize",
            "800x600",
        ])
        .unwrap();
        assert_eq!(args.input_path, Some(PathBuf::from("in.png")));
        assert_eq!(args.output_path, Some(PathBuf::from("out.jpg")));
        assert!(!args.batch);

        let options = args.conversion_options().unwrap();
        assert_eq!(options.quality, Some(80));
        assert_eq!(options.target_size, Some(TargetSize::new(800, 600).unwrap()));
    }

    #[test]
    fn test_parse_batch_mode() {
        let args =
            Args::try_parse_from(["photo-converter", "photos", "--batch", "-f", "WEBP"]).unwrap();
        assert!(args.batch);
        assert_eq!(args.normalized_format(), Some(".webp".to_string()));
        assert_eq!(
            args.batch_output_dir(),
            Some(PathBuf::from("photos").join("converted"))
        );
    }

    #[test]
    fn test_parse_resize_invalid() {
        let args =
            Args::try_parse_from(["photo-converter", "a.png", "b.png", "--resize", "800"]).unwrap();
        assert!(args.parse_resize().is_err());
        assert!(args.conversion_options().is_err());
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let args =
            Args::try_parse_from(["photo-converter", "a.png", "b.jpg", "-q", "150"]).unwrap();
        assert!(args.conversion_options().is_err());
    }

    #[test]
    fn test_input_required_unless_listing() {
        assert!(Args::try_parse_from(["photo-converter"]).is_err());
        let args = Args::try_parse_from(["photo-converter", "--list-formats"]).unwrap();
        assert!(args.list_formats);
        assert!(args.input_path.is_none());
    }
}
