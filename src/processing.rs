use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, MAX_IMAGE_DIMENSION, ZOPFLI_ITERATIONS,
};
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use crate::quality::{image_quality, Quality};
use crate::resize::{plan_image_resize, ResizeConstraints};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageReader, RgbImage};
use oxipng::{Deflaters, Options};
use rayon::prelude::*;
use std::fs;
use std::io::{BufWriter, Cursor, Write};
use std::num::NonZeroU8;
use std::path::Path;
use tracing::debug;

/// What the image backend produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOutcome {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub resized: bool,
}

/// Decode, flatten, downscale and re-encode an image.
///
/// # Arguments
/// * `input_path` - Source image, decoded by content sniffing
/// * `output_path` - Destination; `.jpg`/`.jpeg` selects JPEG, anything else PNG
/// * `quality` - Quality percentage, passed to JPEG as its quality factor
/// * `constraints` - Optional max width/height; only ever shrinks
///
/// # Returns
/// * `Ok(ImageOutcome)` - Final dimensions and format
/// * `Err(CompressionError)` - Decode, limit, encode or write failure. The
///   destination is only created once encoding has fully succeeded.
pub fn compress_image(
    input_path: &Path,
    output_path: &Path,
    quality: Quality,
    constraints: ResizeConstraints,
) -> Result<ImageOutcome> {
    let img = load_image(input_path)?;
    let img = flatten_transparency(img);
    let (img, resized) = apply_resize(img, constraints);

    let format = OutputFormat::for_destination(output_path);
    save_image(&img, output_path, format, quality)?;

    Ok(ImageOutcome {
        width: img.width(),
        height: img.height(),
        format,
        resized,
    })
}

/// Loads an image, enforcing the dimension limit.
///
/// The format is guessed from content, so a mislabelled extension still decodes.
pub fn load_image(input_path: &Path) -> Result<DynamicImage> {
    if !input_path.is_file() {
        return Err(CompressionError::NotFound(input_path.display().to_string()));
    }

    let img = ImageReader::open(input_path)?
        .with_guessed_format()?
        .decode()?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::ImageTooLarge(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok(img)
}

/// Composite any alpha channel onto an opaque white background.
///
/// Transparency is not preserved. Images without alpha pass through untouched.
pub fn flatten_transparency(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    let dst: &mut [u8] = &mut rgb;
    dst.par_chunks_exact_mut(3)
        .zip(rgba.as_raw().par_chunks_exact(4))
        .for_each(|(out, px)| {
            let alpha = u32::from(px[3]);
            for c in 0..3 {
                let blended = u32::from(px[c]) * alpha + 255 * (255 - alpha);
                out[c] = ((blended + 127) / 255) as u8;
            }
        });

    DynamicImage::ImageRgb8(rgb)
}

/// Apply the resize plan with a Lanczos filter. Returns whether it resized.
pub fn apply_resize(img: DynamicImage, constraints: ResizeConstraints) -> (DynamicImage, bool) {
    match plan_image_resize(img.width(), img.height(), constraints) {
        Some(plan) => {
            debug!(
                from_width = img.width(),
                from_height = img.height(),
                to_width = plan.width,
                to_height = plan.height,
                "resizing image"
            );
            (
                img.resize_exact(plan.width, plan.height, FilterType::Lanczos3),
                true,
            )
        }
        None => (img, false),
    }
}

/// Encode to a temporary file beside `output` and move it into place.
pub fn save_image(
    img: &DynamicImage,
    output: &Path,
    format: OutputFormat,
    quality: Quality,
) -> Result<()> {
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let encoded = match format {
        OutputFormat::Jpeg => encode_jpeg(img, image_quality(quality))?,
        OutputFormat::Png => encode_png(img, quality)?,
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(parent)?;
    staged.write_all(&encoded)?;
    staged.flush()?;
    staged
        .persist(output)
        .map_err(|e| CompressionError::Io(e.error))?;

    debug!(path = %output.display(), bytes = encoded.len(), %format, "image written");
    Ok(())
}

fn encode_jpeg(img: &DynamicImage, quality_factor: u8) -> Result<Vec<u8>> {
    // The baseline encoder only takes 8-bit gray or RGB
    let owned;
    let img = match img.color() {
        ColorType::L8 | ColorType::Rgb8 => img,
        _ => {
            owned = DynamicImage::ImageRgb8(img.to_rgb8());
            &owned
        }
    };

    let mut buf = Vec::new();
    {
        let writer = BufWriter::new(&mut buf);
        let encoder = JpegEncoder::new_with_quality(writer, quality_factor);
        img.write_with_encoder(encoder)?;
    }
    Ok(buf)
}

fn encode_png(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    img.write_to(&mut Cursor::new(&mut raw), image::ImageFormat::Png)?;

    oxipng::optimize_from_memory(&raw, &png_options(quality))
        .map_err(|e| CompressionError::PngOptimization(e.to_string()))
}

/// Higher quality spends more effort on the lossless deflate pass.
fn png_options(quality: Quality) -> Options {
    let mut options = Options::from_preset(2);
    options.force = true;

    options.deflate = if quality.get() >= 90 {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if quality.get() >= 70 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn q(pct: i64) -> Quality {
        Quality::new(pct).unwrap()
    }

    fn write_png(dir: &Path, name: &str, img: DynamicImage) -> std::path::PathBuf {
        let path = dir.join(name);
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_flatten_transparency_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let flat = flatten_transparency(DynamicImage::ImageRgba8(rgba));

        assert_eq!(flat.color(), ColorType::Rgb8);
        let rgb = flat.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_flatten_half_alpha_blends() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 128]));

        let rgb = flatten_transparency(DynamicImage::ImageRgba8(rgba)).to_rgb8();

        assert_eq!(rgb.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn test_flatten_leaves_opaque_images_alone() {
        let img = DynamicImage::new_luma8(4, 4);
        assert_eq!(flatten_transparency(img).color(), ColorType::L8);
    }

    #[test]
    fn test_apply_resize_width_only() {
        let img = DynamicImage::new_rgb8(2000, 1500);
        let (img, resized) = apply_resize(img, ResizeConstraints::new(Some(1000), None));
        assert!(resized);
        assert_eq!(img.dimensions(), (1000, 750));
    }

    #[test]
    fn test_apply_resize_never_enlarges() {
        let img = DynamicImage::new_rgb8(200, 100);
        let (img, resized) = apply_resize(img, ResizeConstraints::new(Some(400), Some(400)));
        assert!(!resized);
        assert_eq!(img.dimensions(), (200, 100));
    }

    #[test]
    fn test_compress_png_to_jpeg_with_resize() {
        let dir = TempDir::new().unwrap();
        let input = write_png(dir.path(), "in.png", DynamicImage::new_rgba8(400, 200));
        let output = dir.path().join("out.jpg");

        let outcome =
            compress_image(&input, &output, q(70), ResizeConstraints::new(Some(100), None))
                .unwrap();

        assert_eq!(outcome.format, OutputFormat::Jpeg);
        assert_eq!((outcome.width, outcome.height), (100, 50));
        assert!(outcome.resized);

        let reloaded = image::open(&output).unwrap();
        assert_eq!(reloaded.dimensions(), (100, 50));
        assert_eq!(
            ImageReader::open(&output)
                .unwrap()
                .with_guessed_format()
                .unwrap()
                .format(),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn test_non_jpeg_destination_is_png() {
        let dir = TempDir::new().unwrap();
        let input = write_png(dir.path(), "in.png", DynamicImage::new_rgb8(32, 32));
        let output = dir.path().join("out.webp");

        let outcome = compress_image(&input, &output, q(50), ResizeConstraints::default()).unwrap();

        assert_eq!(outcome.format, OutputFormat::Png);
        assert!(!outcome.resized);
        let format = ImageReader::open(&output)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_corrupt_input_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.png");
        fs::write(&input, b"definitely not a png").unwrap();
        let output = dir.path().join("out.png");

        let result = compress_image(&input, &output, q(80), ResizeConstraints::default());

        assert!(matches!(result, Err(CompressionError::ImageProcessing(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = compress_image(
            &dir.path().join("nope.png"),
            &dir.path().join("out.png"),
            q(80),
            ResizeConstraints::default(),
        );
        assert!(matches!(result, Err(CompressionError::NotFound(_))));
    }

    #[test]
    fn test_png_options_follow_quality() {
        assert!(matches!(png_options(q(95)).deflate, Deflaters::Zopfli { .. }));
        assert!(matches!(
            png_options(q(75)).deflate,
            Deflaters::Libdeflater { compression: 12 }
        ));
        assert!(matches!(
            png_options(q(40)).deflate,
            Deflaters::Libdeflater { compression: 8 }
        ));
    }
}
