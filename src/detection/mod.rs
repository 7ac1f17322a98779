//! Template geometry detection module
//!
//! This module locates the color-coded zones of a template and recovers the
//! bubble grid inside each zone.

pub mod bubbles;
pub mod region;

use serde::{Deserialize, Serialize};

pub use bubbles::{BubbleCenter, Grid, GridDetector};
pub use region::RegionLocator;

/// Axis-aligned box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every point, or `None` for no points
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut points = points.into_iter();
        let (x0, y0) = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Intersection with a `width` x `height` image; may be empty
    pub fn clip_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self::new(
            x,
            y,
            self.right().min(width) - x,
            self.bottom().min(height) - y,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_points() {
        let bbox = BoundingBox::enclosing([(3, 4), (10, 2), (5, 9)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(3, 2, 8, 8));
        assert_eq!(bbox.right(), 11);
        assert_eq!(bbox.bottom(), 10);
        assert!(BoundingBox::enclosing(Vec::new()).is_none());
    }

    #[test]
    fn test_single_point_box() {
        let bbox = BoundingBox::enclosing([(7, 7)]).unwrap();
        assert_eq!(bbox.area(), 1);
    }

    #[test]
    fn test_clip_to_image() {
        let bbox = BoundingBox::new(90, 40, 20, 20);
        assert_eq!(bbox.clip_to(100, 50), BoundingBox::new(90, 40, 10, 10));
        assert!(BoundingBox::new(120, 0, 5, 5).clip_to(100, 50).is_empty());
    }
}
