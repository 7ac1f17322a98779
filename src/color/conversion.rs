//! Color space conversion utilities
//!
//! Provides the two pixel representations the reader works with:
//! - RGB to HSV, for matching template zones against their color ranges
//! - RGB to luminance (BT.601), for bubble detection and mark classification

use image::{GrayImage, Luma, RgbImage};
use palette::{FromColor, Hsv, Srgb};

use crate::constants::luminance::{BLUE_WEIGHT, GREEN_WEIGHT, RED_WEIGHT};
use crate::detection::BoundingBox;
use crate::region::HsvRange;

/// Convert RGB (0-255) to HSV
///
/// Hue is reported in degrees, saturation and value in [0, 1].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    Hsv::from_color(srgb)
}

/// Luminance of an RGB pixel on a 0-255 scale
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = RED_WEIGHT * r as f32 + GREEN_WEIGHT * g as f32 + BLUE_WEIGHT * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// Luminance plane of a whole image
pub fn luminance_image(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([luminance(r, g, b)])
    })
}

/// Luminance plane of the part of `image` covered by `bbox`
///
/// The box is clipped to the image; pixel (0, 0) of the result is the box
/// origin.
pub fn luminance_crop(image: &RgbImage, bbox: &BoundingBox) -> GrayImage {
    let clipped = bbox.clip_to(image.width(), image.height());
    GrayImage::from_fn(clipped.width, clipped.height, |x, y| {
        let [r, g, b] = image.get_pixel(clipped.x + x, clipped.y + y).0;
        Luma([luminance(r, g, b)])
    })
}

/// Binary mask (255 = inside) of pixels whose HSV color lies in `range`
pub fn hsv_mask(image: &RgbImage, range: &HsvRange) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        if range.contains(&rgb_to_hsv(r, g, b)) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    #[test]
    fn test_rgb_to_hsv_primaries() {
        let red = rgb_to_hsv(255, 0, 0);
        assert_abs_diff_eq!(red.hue.into_positive_degrees(), 0.0, epsilon = 0.01);
        assert_abs_diff_eq!(red.saturation, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(red.value, 1.0, epsilon = 1e-4);

        let green = rgb_to_hsv(0, 255, 0);
        assert_abs_diff_eq!(green.hue.into_positive_degrees(), 120.0, epsilon = 0.01);

        let blue = rgb_to_hsv(0, 0, 255);
        assert_abs_diff_eq!(blue.hue.into_positive_degrees(), 240.0, epsilon = 0.01);
    }

    #[test]
    fn test_rgb_to_hsv_neutral() {
        let gray = rgb_to_hsv(128, 128, 128);
        assert_abs_diff_eq!(gray.saturation, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(gray.value, 128.0 / 255.0, epsilon = 1e-4);
    }

    #[test]
    fn test_luminance_extremes() {
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 255, 255), 255);
        // Green dominates perceived brightness
        assert!(luminance(0, 255, 0) > luminance(255, 0, 0));
        assert!(luminance(255, 0, 0) > luminance(0, 0, 255));
    }

    #[test]
    fn test_luminance_crop_offsets() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        image.put_pixel(6, 7, Rgb([0, 0, 0]));

        let crop = luminance_crop(&image, &BoundingBox::new(5, 5, 4, 4));
        assert_eq!(crop.dimensions(), (4, 4));
        assert_eq!(crop.get_pixel(1, 2).0[0], 0);
        assert_eq!(crop.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_luminance_crop_is_clipped() {
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let crop = luminance_crop(&image, &BoundingBox::new(8, 8, 5, 5));
        assert_eq!(crop.dimensions(), (2, 2));
    }

    #[test]
    fn test_hsv_mask_selects_zone_color() {
        let mut image = RgbImage::from_pixel(4, 1, Rgb([255, 255, 255]));
        image.put_pixel(1, 0, Rgb(Region::Answers.reference_color()));
        image.put_pixel(2, 0, Rgb(Region::Group.reference_color()));

        let mask = hsv_mask(&image, &Region::Answers.default_range());
        let values: Vec<u8> = mask.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 255, 0, 0]);
    }
}
