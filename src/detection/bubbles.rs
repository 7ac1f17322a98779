//! Bubble detection and grid recovery
//!
//! Finds circular bubble candidates inside a located zone and arranges them
//! into the zone's row/column grid:
//! - Smooths the zone's luminance to suppress sensor noise
//! - Marks print that stands out from the zone background
//! - Keeps blobs with bubble-sized radius and a disc-like outline
//! - Suppresses candidates closer than the minimum center distance
//! - Sorts along one axis and chunks into fixed-size rows, then validates
//!   that every chunk is a coherent column or row of the lattice

use image::imageops::crop_imm;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::region::contour_area;
use super::BoundingBox;
use crate::color::{hsv_mask, luminance_crop};
use crate::config::DetectionConfig;
use crate::region::{GridLayout, HsvRange, Orientation, Region};
use crate::{Result, ScanError};

/// Bubble center in full-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BubbleCenter {
    pub x: u32,
    pub y: u32,
}

impl BubbleCenter {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Rows of bubble centers with identical length
///
/// For the student number each row is one digit position (top to bottom);
/// for the answers each row is one question (left to right); a control strip
/// is a single row. Serialized as the plain list of rows; deserialization
/// applies the same checks as [`Grid::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<BubbleCenter>>", into = "Vec<Vec<BubbleCenter>>")]
pub struct Grid {
    rows: Vec<Vec<BubbleCenter>>,
}

impl Grid {
    /// Build a grid from rows of equal, non-zero length
    pub fn new(rows: Vec<Vec<BubbleCenter>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 || rows.iter().any(|row| row.len() != width) {
            let lengths: Vec<usize> = rows.iter().map(Vec::len).collect();
            return Err(ScanError::invalid_parameter("grid row lengths", format!("{:?}", lengths)));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<BubbleCenter>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows[0].len()
    }

    /// Every center, row by row
    pub fn centers(&self) -> impl Iterator<Item = &BubbleCenter> {
        self.rows.iter().flatten()
    }
}

impl TryFrom<Vec<Vec<BubbleCenter>>> for Grid {
    type Error = ScanError;

    fn try_from(rows: Vec<Vec<BubbleCenter>>) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<Grid> for Vec<Vec<BubbleCenter>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

/// Circular blob accepted by the shape filter, in crop coordinates
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f32,
    y: f32,
    radius: f32,
}

impl Candidate {
    fn distance(&self, other: &Candidate) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Bubble grid detector with fixed radius bounds and center spacing
#[derive(Debug, Clone, Default)]
pub struct GridDetector {
    config: DetectionConfig,
}

impl GridDetector {
    /// Create a detector with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom parameters
    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Detect the bubble grid of `region` inside `bbox` on the template
    ///
    /// # Errors
    ///
    /// - `ScanError::InsufficientCircles` if fewer bubbles than the region's
    ///   grid holds are found
    /// - `ScanError::GridShapeMismatch` if the bubbles cannot be arranged into
    ///   the region's rows and columns
    pub fn detect(
        &self,
        template: &RgbImage,
        bbox: &BoundingBox,
        region: Region,
        zone: &HsvRange,
    ) -> Result<Grid> {
        let centers = self.find_bubbles(template, bbox, zone);
        debug!(region = %region, candidates = centers.len(), "detected bubble candidates");
        arrange(region, centers)
    }

    /// Find bubble centers inside `bbox`, in full-image coordinates
    ///
    /// Centers come out in no particular order. The background level is taken
    /// from the pixels inside `zone` only, so it holds even where bubbles
    /// cover most of the zone.
    pub fn find_bubbles(
        &self,
        image: &RgbImage,
        bbox: &BoundingBox,
        zone: &HsvRange,
    ) -> Vec<BubbleCenter> {
        let clipped = bbox.clip_to(image.width(), image.height());
        if clipped.is_empty() {
            return Vec::new();
        }

        let crop = luminance_crop(image, &clipped);
        let smoothed = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&crop, self.config.blur_sigma)
        } else {
            crop
        };

        let zone_color =
            crop_imm(image, clipped.x, clipped.y, clipped.width, clipped.height).to_image();
        let background = median_level(&smoothed, Some(&hsv_mask(&zone_color, zone)));
        let print = self.print_mask(&smoothed, background);
        let mut candidates: Vec<Candidate> = find_contours::<u32>(&print)
            .iter()
            .filter(|contour| matches!(contour.border_type, BorderType::Outer))
            .filter_map(|contour| self.measure(contour))
            .collect();

        // Larger blobs win when two candidates are too close together
        candidates.sort_by(|a, b| b.radius.total_cmp(&a.radius));
        let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if kept
                .iter()
                .all(|other| other.distance(&candidate) >= self.config.min_center_distance)
            {
                kept.push(candidate);
            }
        }

        kept.iter()
            .map(|c| {
                BubbleCenter::new(
                    clipped.x + c.x.round() as u32,
                    clipped.y + c.y.round() as u32,
                )
            })
            .collect()
    }

    /// Pixels that differ from the zone background by more than the contrast
    fn print_mask(&self, gray: &GrayImage, background: u8) -> GrayImage {
        let contrast = self.config.background_contrast;
        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let level = gray.get_pixel(x, y).0[0];
            if level.abs_diff(background) > contrast {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Accept a traced blob if it is bubble sized and roughly a disc
    fn measure(&self, contour: &Contour<u32>) -> Option<Candidate> {
        let bbox = BoundingBox::enclosing(contour.points.iter().map(|p| (p.x, p.y)))?;
        // Extent between outermost pixel centers
        let span_x = (bbox.width - 1) as f32;
        let span_y = (bbox.height - 1) as f32;
        if span_x < 1.0 || span_y < 1.0 {
            return None;
        }

        if span_x.max(span_y) / span_x.min(span_y) > self.config.max_aspect_ratio {
            return None;
        }

        let radius = (span_x + span_y) / 4.0;
        if radius < self.config.min_radius || radius > self.config.max_radius {
            return None;
        }

        let fill = contour_area(contour) as f32 / (span_x * span_y);
        if fill < self.config.min_fill_ratio || fill > self.config.max_fill_ratio {
            return None;
        }

        Some(Candidate {
            x: bbox.x as f32 + span_x / 2.0,
            y: bbox.y as f32 + span_y / 2.0,
            radius,
        })
    }
}

/// Gray level with half the pixels at or below it
///
/// With a mask only the pixels set in it count. An empty mask falls back to
/// the whole image.
fn median_level(gray: &GrayImage, mask: Option<&GrayImage>) -> u8 {
    let mut histogram = [0u64; 256];
    let mut total = 0u64;
    if let Some(mask) = mask {
        for (pixel, selected) in gray.pixels().zip(mask.pixels()) {
            if selected.0[0] > 0 {
                histogram[pixel.0[0] as usize] += 1;
                total += 1;
            }
        }
    }
    if total == 0 {
        for pixel in gray.pixels() {
            histogram[pixel.0[0] as usize] += 1;
        }
        total = gray.width() as u64 * gray.height() as u64;
    }

    let half = total.div_ceil(2);
    let mut seen = 0;
    for (level, count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= half {
            return level as u8;
        }
    }
    u8::MAX
}

/// Arrange unordered centers into the grid shape of `region`
///
/// Control strips keep the first `count` centers along their axis and drop the
/// rest as detector noise. Lattice grids need the exact bubble count: one
/// spurious circle would shift every later chunk.
pub fn arrange(region: Region, mut centers: Vec<BubbleCenter>) -> Result<Grid> {
    let layout = region.layout();
    let expected = layout.expected_count();
    if centers.len() < expected {
        return Err(ScanError::InsufficientCircles {
            region,
            found: centers.len(),
            expected,
        });
    }

    let rows = match layout {
        GridLayout::Strip { count, orientation } => {
            match orientation {
                Orientation::Vertical => centers.sort_by_key(|c| (c.y, c.x)),
                Orientation::Horizontal => centers.sort_by_key(|c| (c.x, c.y)),
            }
            if centers.len() > count {
                warn!(
                    region = %region,
                    discarded = centers.len() - count,
                    "dropping extra circles in control strip"
                );
                centers.truncate(count);
            }
            vec![centers]
        }
        GridLayout::Columns {
            columns,
            per_column,
        } => {
            require_exact(region, centers.len(), expected)?;
            centers.sort_by_key(|c| (c.x, c.y));
            let chunks = chunk(centers, per_column, |c| c.y);
            check_lattice(region, &chunks, columns, |c| c.x, "column")?;
            chunks
        }
        GridLayout::Rows { rows, per_row } => {
            require_exact(region, centers.len(), expected)?;
            centers.sort_by_key(|c| (c.y, c.x));
            let chunks = chunk(centers, per_row, |c| c.x);
            check_lattice(region, &chunks, rows, |c| c.y, "row")?;
            chunks
        }
    };

    Grid::new(rows).map_err(|_| ScanError::GridShapeMismatch {
        region,
        reason: "rows of unequal length".to_string(),
    })
}

fn require_exact(region: Region, found: usize, expected: usize) -> Result<()> {
    if found != expected {
        return Err(ScanError::GridShapeMismatch {
            region,
            reason: format!("found {} circles, expected exactly {}", found, expected),
        });
    }
    Ok(())
}

/// Split sorted centers into consecutive chunks, each ordered by `within`
fn chunk<K: Ord>(
    centers: Vec<BubbleCenter>,
    size: usize,
    within: impl Fn(&BubbleCenter) -> K,
) -> Vec<Vec<BubbleCenter>> {
    centers
        .chunks(size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.sort_by_key(|c| within(c));
            chunk
        })
        .collect()
}

/// Check there are `expected` full chunks and that each chunk is a distinct
/// lattice line: the gap to the next chunk along `axis` must exceed the
/// spread inside either chunk.
fn check_lattice(
    region: Region,
    chunks: &[Vec<BubbleCenter>],
    expected: usize,
    axis: impl Fn(&BubbleCenter) -> u32,
    line: &str,
) -> Result<()> {
    let size = chunks.first().map_or(0, Vec::len);
    if chunks.len() != expected || chunks.iter().any(|c| c.len() != size) {
        return Err(ScanError::GridShapeMismatch {
            region,
            reason: format!("found {} {}s, expected {}", chunks.len(), line, expected),
        });
    }

    let extent = |chunk: &[BubbleCenter]| {
        let min = chunk.iter().map(&axis).min().unwrap_or(0);
        let max = chunk.iter().map(&axis).max().unwrap_or(0);
        (min, max)
    };

    for (i, pair) in chunks.windows(2).enumerate() {
        let (lo_a, hi_a) = extent(&pair[0][..]);
        let (lo_b, hi_b) = extent(&pair[1][..]);
        let spread = (hi_a - lo_a).max(hi_b - lo_b);
        let gap = lo_b.saturating_sub(hi_a);
        if gap <= spread {
            return Err(ScanError::GridShapeMismatch {
                region,
                reason: format!(
                    "{}s {} and {} overlap (gap {} px, spread {} px)",
                    line,
                    i + 1,
                    i + 2,
                    gap,
                    spread
                ),
            });
        }
    }
    Ok(())
}
