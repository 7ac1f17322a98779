//! Zone localization by color
//!
//! Finds the bounding box of a semantic zone on the template:
//! - Classifies every pixel against the region's HSV range
//! - Traces the outer borders of the resulting mask
//! - Keeps the component with the largest enclosed area

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, Contour};
use tracing::debug;

use super::BoundingBox;
use crate::color::hsv_mask;
use crate::config::LocalizationConfig;
use crate::region::{HsvRange, Region};
use crate::{Result, ScanError};

/// Zone locator implementing color-range segmentation
#[derive(Debug, Clone, Default)]
pub struct RegionLocator {
    ranges: LocalizationConfig,
}

impl RegionLocator {
    /// Create a locator with the default zone colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a locator with custom color ranges
    pub fn with_config(ranges: LocalizationConfig) -> Self {
        Self { ranges }
    }

    /// Color range `region` is located by
    pub fn range(&self, region: Region) -> &HsvRange {
        self.ranges.range(region)
    }

    /// Locate `region` on the template
    ///
    /// # Errors
    ///
    /// Returns `ScanError::RegionNotFound` if no pixel of the template falls
    /// inside the region's color range.
    pub fn locate(&self, template: &RgbImage, region: Region) -> Result<BoundingBox> {
        let mask = hsv_mask(template, self.ranges.range(region));
        let (bbox, area) = largest_component(&mask).ok_or(ScanError::RegionNotFound { region })?;

        debug!(
            region = %region,
            x = bbox.x,
            y = bbox.y,
            width = bbox.width,
            height = bbox.height,
            area,
            "located zone"
        );
        Ok(bbox)
    }
}

/// Bounding box and enclosed area of the largest external component
///
/// Ties keep the component traced first.
fn largest_component(mask: &GrayImage) -> Option<(BoundingBox, f64)> {
    let mut best: Option<(BoundingBox, f64)> = None;

    for contour in find_contours::<u32>(mask) {
        // External borders only: components nested in holes are ignored
        if contour.parent.is_some() {
            continue;
        }
        let area = contour_area(&contour);
        if best.map_or(true, |(_, best_area)| area > best_area) {
            let Some(bbox) = BoundingBox::enclosing(contour.points.iter().map(|p| (p.x, p.y)))
            else {
                continue;
            };
            best = Some((bbox, area));
        }
    }

    best
}

/// Area enclosed by a traced border (shoelace formula)
pub(crate) fn contour_area(contour: &Contour<u32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn paint(image: &mut RgbImage, region: Region, x: i32, y: i32, w: u32, h: u32) {
        draw_filled_rect_mut(
            image,
            Rect::at(x, y).of_size(w, h),
            Rgb(region.reference_color()),
        );
    }

    #[test]
    fn test_locate_single_zone() {
        let mut template = RgbImage::from_pixel(200, 150, Rgb([255, 255, 255]));
        paint(&mut template, Region::Answers, 30, 40, 60, 80);

        let bbox = RegionLocator::new()
            .locate(&template, Region::Answers)
            .unwrap();
        assert_eq!(bbox, BoundingBox::new(30, 40, 60, 80));
    }

    #[test]
    fn test_largest_component_wins() {
        let mut template = RgbImage::from_pixel(200, 150, Rgb([255, 255, 255]));
        paint(&mut template, Region::Group, 5, 5, 10, 10);
        paint(&mut template, Region::Group, 50, 60, 40, 30);
        paint(&mut template, Region::Group, 150, 5, 20, 20);

        let bbox = RegionLocator::new().locate(&template, Region::Group).unwrap();
        assert_eq!(bbox, BoundingBox::new(50, 60, 40, 30));
    }

    #[test]
    fn test_zone_with_holes_keeps_outer_box() {
        let mut template = RgbImage::from_pixel(120, 120, Rgb([255, 255, 255]));
        paint(&mut template, Region::StudentNumber, 10, 10, 100, 100);
        draw_filled_rect_mut(
            &mut template,
            Rect::at(30, 30).of_size(20, 20),
            Rgb([255, 255, 255]),
        );

        let bbox = RegionLocator::new()
            .locate(&template, Region::StudentNumber)
            .unwrap();
        assert_eq!(bbox, BoundingBox::new(10, 10, 100, 100));
    }

    #[test]
    fn test_other_colors_are_ignored() {
        let mut template = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        paint(&mut template, Region::Answers, 10, 10, 30, 30);

        let err = RegionLocator::new()
            .locate(&template, Region::Semester)
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::RegionNotFound {
                region: Region::Semester
            }
        ));
    }

    #[test]
    fn test_blank_template_fails() {
        let template = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        for region in Region::ALL {
            assert!(RegionLocator::new().locate(&template, region).is_err());
        }
    }

    #[test]
    fn test_contour_area_of_square() {
        let mut mask = GrayImage::new(20, 20);
        for y in 5..15 {
            for x in 5..15 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
        let contours = find_contours::<u32>(&mask);
        assert_eq!(contours.len(), 1);
        // Border pixel centers span 9 pixels in each direction
        assert!((contour_area(&contours[0]) - 81.0).abs() < 1e-9);
    }
}
