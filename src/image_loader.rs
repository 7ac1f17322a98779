//! Image loading for template and scan files
//!
//! This module provides a single entry point for decoding image files into the
//! RGB buffers the reader works on. The reading pipeline itself never touches
//! the file system; front-ends call [`load_image`] and pass the pixels on.
//!
//! ## Supported Formats
//!
//! Formats decoded by the `image` crate with its default features:
//! - JPEG, PNG, GIF (first frame), WebP, TIFF, BMP, PNM, TGA, QOI
//!
//! Alpha channels are dropped and 16-bit images are reduced to 8 bits.

use image::{ImageFormat, ImageReader, RgbImage};
use std::path::Path;
use tracing::debug;

use crate::{Result, ScanError};

/// Load an image from disk as 8-bit RGB
///
/// The format is guessed from the file contents, so a scan saved with the
/// wrong extension still loads.
///
/// # Errors
///
/// Returns `ScanError::ImageLoadError` if the file cannot be opened or decoded.
///
/// # Example
///
/// ```rust,no_run
/// use optic_form_reader::image_loader::load_image;
/// use std::path::Path;
///
/// let scan = load_image(Path::new("scan_01.jpg"))?;
/// println!("Loaded scan: {}x{}", scan.width(), scan.height());
/// # Ok::<(), optic_form_reader::ScanError>(())
/// ```
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| {
            ScanError::image_load(
                format!("Failed to open image file: {}", path.display()),
                image::ImageError::IoError(e),
            )
        })?
        .with_guessed_format()
        .map_err(|e| {
            ScanError::image_load(
                format!("Failed to read image file: {}", path.display()),
                image::ImageError::IoError(e),
            )
        })?;

    let image = reader.decode().map_err(|e| {
        ScanError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    let rgb = image.to_rgb8();
    debug!(
        path = %path.display(),
        width = rgb.width(),
        height = rgb.height(),
        "loaded image"
    );
    Ok(rgb)
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "jpg", "jpeg", "png", "gif", "webp", "tiff", "tif", "bmp", "pbm", "pgm", "ppm", "pnm",
        "tga", "qoi",
    ]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}

/// Check if a path looks like a supported image file
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_supported_extension)
        && ImageFormat::from_path(path).is_ok()
}
