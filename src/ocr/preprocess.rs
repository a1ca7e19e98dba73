//! Image cleanup ahead of OCR.
//!
//! Flyers are busy, colourful and often low contrast. Converting to
//! grayscale, stretching contrast and sharpening edges gives Tesseract a much
//! easier time. The processed image is written to a temporary PNG that lives
//! as long as the returned [`PreparedImage`].

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::backend::OcrError;

/// Blur radius of the unsharp mask.
const SHARPEN_SIGMA: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    pub enabled: bool,
    /// Contrast factor around the mean; 1.0 leaves the image unchanged.
    pub contrast: f32,
    /// Sharpness factor; 1.0 leaves the image unchanged.
    pub sharpen: f32,
    pub equalize: bool,
    /// Block radius of the adaptive threshold; 0 disables thresholding.
    pub threshold_radius: u32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            contrast: 1.8,
            sharpen: 2.0,
            equalize: true,
            threshold_radius: 0,
        }
    }
}

/// An image ready for OCR: either the original file or a processed copy.
#[derive(Debug)]
pub enum PreparedImage {
    Original(PathBuf),
    Processed(NamedTempFile),
}

impl PreparedImage {
    pub fn path(&self) -> &Path {
        match self {
            PreparedImage::Original(path) => path,
            PreparedImage::Processed(file) => file.path(),
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, PreparedImage::Processed(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    options: PreprocessOptions,
}

impl Preprocessor {
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Prepare `path` for OCR.
    ///
    /// Images that fail to decode are handed over untouched so the OCR
    /// engine can report on them itself.
    pub fn prepare(&self, path: &Path) -> Result<PreparedImage, OcrError> {
        if !self.options.enabled {
            return Ok(PreparedImage::Original(path.to_path_buf()));
        }

        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Could not decode {} for preprocessing: {}", path.display(), e);
                return Ok(PreparedImage::Original(path.to_path_buf()));
            }
        };

        let processed = self.process(&img);

        let file = tempfile::Builder::new()
            .prefix("flyersort-")
            .suffix(".png")
            .tempfile()?;
        DynamicImage::ImageLuma8(processed)
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| OcrError::ImageError(format!("Failed to write preprocessed image: {}", e)))?;

        debug!("Preprocessed {} -> {}", path.display(), file.path().display());
        Ok(PreparedImage::Processed(file))
    }

    /// Run the filter chain on a decoded image.
    pub fn process(&self, img: &DynamicImage) -> GrayImage {
        let mut gray = img.to_luma8();

        if self.options.equalize {
            gray = equalize_histogram(&gray);
        }
        if (self.options.contrast - 1.0).abs() > f32::EPSILON {
            stretch_contrast(&mut gray, self.options.contrast);
        }
        if (self.options.sharpen - 1.0).abs() > f32::EPSILON {
            gray = sharpen(&gray, self.options.sharpen);
        }
        if self.options.threshold_radius > 0 {
            gray = adaptive_threshold(&gray, self.options.threshold_radius);
        }
        gray
    }
}

/// Scale every pixel's distance from the mean intensity by `factor`.
fn stretch_contrast(img: &mut GrayImage, factor: f32) {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return;
    }
    let sum: u64 = img.pixels().map(|p| u64::from(p.0[0])).sum();
    let mean = sum as f32 / count as f32;

    for pixel in img.pixels_mut() {
        let value = mean + (f32::from(pixel.0[0]) - mean) * factor;
        pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// Unsharp mask: blend the image away from a blurred copy by `factor`.
fn sharpen(img: &GrayImage, factor: f32) -> GrayImage {
    let blurred = gaussian_blur_f32(img, SHARPEN_SIGMA);
    let mut out = img.clone();
    for (pixel, soft) in out.pixels_mut().zip(blurred.pixels()) {
        let base = f32::from(soft.0[0]);
        let value = base + (f32::from(pixel.0[0]) - base) * factor;
        pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn gradient() -> DynamicImage {
        let img = RgbImage::from_fn(32, 32, |x, _| {
            let v = 100 + (x as u8);
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_contrast_widens_range() {
        let mut img = GrayImage::from_fn(4, 1, |x, _| Luma([100 + 10 * x as u8]));
        stretch_contrast(&mut img, 2.0);
        let values: Vec<u8> = img.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![85, 105, 125, 145]);
    }

    #[test]
    fn test_contrast_clamps() {
        let mut img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        stretch_contrast(&mut img, 5.0);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_threshold_produces_binary_image() {
        let pre = Preprocessor::new(PreprocessOptions {
            threshold_radius: 3,
            ..Default::default()
        });
        let out = pre.process(&gradient());
        assert_eq!(out.dimensions(), (32, 32));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_prepare_writes_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("flyer.png");
        gradient().save(&src).unwrap();

        let prepared = Preprocessor::default().prepare(&src).unwrap();
        assert!(prepared.is_processed());
        assert!(prepared.path().exists());
        assert!(image::open(prepared.path()).is_ok());
    }

    #[test]
    fn test_undecodable_image_falls_back_to_original() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("broken.png");
        std::fs::write(&src, b"not really a png").unwrap();

        let prepared = Preprocessor::default().prepare(&src).unwrap();
        assert!(!prepared.is_processed());
        assert_eq!(prepared.path(), src.as_path());
    }

    #[test]
    fn test_disabled_passes_through() {
        let pre = Preprocessor::new(PreprocessOptions {
            enabled: false,
            ..Default::default()
        });
        let prepared = pre.prepare(Path::new("/nonexistent.png")).unwrap();
        assert!(!prepared.is_processed());
    }
}
