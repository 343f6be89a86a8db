//! Bookmark thumbnails.
//!
//! Images that are already large and wide enough are stored as they are.
//! Anything else is letterboxed: the image is centered over a blurred,
//! brightened copy of itself scaled to fill the thumbnail frame.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use image::{DynamicImage, ImageFormat, RgbImage, Rgb};
//! use shelfmark_core::thumbnail::{ThumbnailConfig, render_thumbnail};
//!
//! let mut png = Vec::new();
//! DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 80, Rgb([10, 20, 30])))
//!     .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
//!     .unwrap();
//!
//! let jpeg = render_thumbnail(&png, &ThumbnailConfig::default()).unwrap();
//! let thumb = image::load_from_memory(&jpeg).unwrap();
//! assert_eq!((thumb.width(), thumb.height()), (600, 400));
//! ```

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use crate::{Result, ShelfmarkError};

/// Content types accepted for thumbnails.
const SUPPORTED_TYPES: [&str; 4] = ["image/jpeg", "image/pjpeg", "image/jpg", "image/png"];

/// Thumbnail geometry and background effect.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,

    /// Images at least `width`x`height` with a wider aspect ratio than this are kept as they are.
    pub min_aspect: f64,

    /// Gaussian sigma of the background blur, in thumbnail pixels.
    pub blur: f32,

    /// Background brightness increase in percent.
    pub brightness: i32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self { width: 600, height: 400, min_aspect: 1.3, blur: 150.0, brightness: 30 }
    }
}

impl ThumbnailConfig {
    pub fn builder() -> ThumbnailConfigBuilder {
        ThumbnailConfigBuilder::default()
    }
}

/// Builder for [`ThumbnailConfig`].
#[derive(Debug, Default)]
pub struct ThumbnailConfigBuilder {
    config: ThumbnailConfig,
}

impl ThumbnailConfigBuilder {
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self
    }

    pub fn min_aspect(mut self, ratio: f64) -> Self {
        self.config.min_aspect = ratio;
        self
    }

    pub fn blur(mut self, sigma: f32) -> Self {
        self.config.blur = sigma;
        self
    }

    pub fn brightness(mut self, percent: i32) -> Self {
        self.config.brightness = percent;
        self
    }

    pub fn build(self) -> ThumbnailConfig {
        self.config
    }
}

/// Whether a downloaded image of `content_type` can become a thumbnail.
pub fn is_supported_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    SUPPORTED_TYPES.iter().any(|t| content_type.contains(t))
}

/// Decodes `bytes` and renders the JPEG thumbnail.
///
/// # Errors
///
/// Returns [`ShelfmarkError::Image`] when the bytes do not decode or the
/// JPEG cannot be encoded.
pub fn render_thumbnail(bytes: &[u8], config: &ThumbnailConfig) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());
    let ratio = f64::from(width) / f64::from(height.max(1));

    let output = if width >= config.width && height >= config.height && ratio > config.min_aspect {
        debug!(width, height, "thumbnail kept as is");
        img
    } else {
        debug!(width, height, "thumbnail letterboxed");
        letterbox(&img, config)
    };

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(output.to_rgb8()).write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
    Ok(jpeg)
}

fn letterbox(img: &DynamicImage, config: &ThumbnailConfig) -> DynamicImage {
    let (width, height) = (config.width, config.height);

    let mut flat = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut flat, &img.to_rgba8(), 0, 0);

    let background = DynamicImage::ImageRgba8(flat).resize_to_fill(width, height, FilterType::Lanczos3);
    // Blurring a quarter-size copy keeps large sigmas affordable.
    let background = background
        .resize_exact((width / 4).max(1), (height / 4).max(1), FilterType::Triangle)
        .blur(config.blur / 4.0)
        .resize_exact(width, height, FilterType::Triangle)
        .brighten(255 * config.brightness / 100);

    let foreground = if img.width() > width || img.height() > height {
        img.resize(width, height, FilterType::Lanczos3)
    } else {
        img.clone()
    };

    let mut canvas = background.to_rgba8();
    let x = (i64::from(width) - i64::from(foreground.width())) / 2;
    let y = (i64::from(height) - i64::from(foreground.height())) / 2;
    imageops::overlay(&mut canvas, &foreground.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

/// Writes a rendered thumbnail to `path` through a temp file and a rename.
pub fn save_thumbnail(path: &Path, jpeg: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| ShelfmarkError::NotFound(path.display().to_string()))?;
    fs::create_dir_all(dir)?;

    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp = dir.join(format!(".{name}.tmp"));
    fs::write(&temp, jpeg)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rstest::rstest;
    use tempfile::TempDir;

    fn png(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        png(DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))))
    }

    fn near(actual: u8, expected: u8) -> bool {
        actual.abs_diff(expected) <= 12
    }

    #[rstest]
    #[case("image/jpeg", true)]
    #[case("image/png", true)]
    #[case("image/pjpeg", true)]
    #[case("IMAGE/JPEG; charset=binary", true)]
    #[case("image/gif", false)]
    #[case("image/webp", false)]
    #[case("text/html", false)]
    fn test_is_supported_type(#[case] content_type: &str, #[case] expected: bool) {
        assert_eq!(is_supported_type(content_type), expected);
    }

    #[test]
    fn test_large_wide_image_kept() {
        let jpeg = render_thumbnail(&solid(800, 500, [200, 0, 0]), &ThumbnailConfig::default()).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (800, 500));
    }

    #[rstest]
    #[case(100, 100)]
    #[case(600, 600)]
    #[case(1200, 300)]
    #[case(500, 380)]
    fn test_other_images_letterboxed(#[case] width: u32, #[case] height: u32) {
        let jpeg = render_thumbnail(&solid(width, height, [0, 0, 200]), &ThumbnailConfig::default()).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (600, 400));
    }

    #[test]
    fn test_letterbox_background_is_brightened() {
        let jpeg = render_thumbnail(&solid(100, 100, [0, 0, 0]), &ThumbnailConfig::default()).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap().to_rgb8();

        let corner = thumb.get_pixel(5, 5);
        assert!(corner.0.iter().all(|&c| near(c, 76)), "corner {corner:?}");
        let center = thumb.get_pixel(300, 200);
        assert!(center.0.iter().all(|&c| near(c, 0)), "center {center:?}");
    }

    #[test]
    fn test_transparent_image_flattened_on_white() {
        let clear = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 0]));
        let jpeg = render_thumbnail(&png(DynamicImage::ImageRgba8(clear)), &ThumbnailConfig::default()).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        assert!(thumb.get_pixel(5, 5).0.iter().all(|&c| c > 240));
    }

    #[test]
    fn test_custom_size() {
        let config = ThumbnailConfig::builder().size(60, 40).blur(4.0).build();
        let jpeg = render_thumbnail(&solid(10, 10, [0, 120, 0]), &config).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (60, 40));
    }

    #[test]
    fn test_undecodable_bytes() {
        let err = render_thumbnail(b"<html>not an image</html>", &ThumbnailConfig::default()).unwrap_err();
        assert!(matches!(err, ShelfmarkError::Image(_)));
    }

    #[test]
    fn test_save_thumbnail_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thumb").join("3");
        save_thumbnail(&path, b"first").unwrap();
        save_thumbnail(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
