//! Mark classification
//!
//! Decides for every logical row of a grid whether zero, one or several of its
//! bubbles are inked on the scanned sheet. Darkness is measured as the mean
//! luminance of a small square patch centered on each bubble.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClassificationConfig;
use crate::constants::layout::{BLANK_MARK, MULTIPLE_MARK};
use crate::detection::{BoundingBox, BubbleCenter, Grid};
use crate::region::SlotEncoding;

/// Classification of one grid row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkOutcome {
    /// Exactly one bubble filled, at this position within the row
    Filled(usize),
    /// No bubble filled
    Blank,
    /// More than one bubble filled
    Ambiguous,
}

impl MarkOutcome {
    /// Build the outcome from the filled positions of a row
    pub fn from_filled(filled: &[usize]) -> Self {
        match filled {
            [] => MarkOutcome::Blank,
            [index] => MarkOutcome::Filled(*index),
            _ => MarkOutcome::Ambiguous,
        }
    }

    /// Character written into a decoded string
    ///
    /// Blank rows read `X` and ambiguous rows `M`. A filled index outside the
    /// encoding's alphabet reads as blank.
    pub fn symbol(&self, encoding: SlotEncoding) -> char {
        match *self {
            MarkOutcome::Filled(index) => encoding.symbol(index).unwrap_or(BLANK_MARK),
            MarkOutcome::Blank => BLANK_MARK,
            MarkOutcome::Ambiguous => MULTIPLE_MARK,
        }
    }

    /// Filled position, if exactly one bubble is filled
    pub fn index(&self) -> Option<usize> {
        match *self {
            MarkOutcome::Filled(index) => Some(index),
            _ => None,
        }
    }
}

/// Encode a sequence of row outcomes as a string
pub fn encode(outcomes: &[MarkOutcome], encoding: SlotEncoding) -> String {
    outcomes.iter().map(|o| o.symbol(encoding)).collect()
}

/// Mean-luminance threshold classifier
#[derive(Debug, Clone, Default)]
pub struct MarkClassifier {
    config: ClassificationConfig,
}

impl MarkClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassificationConfig) -> Self {
        Self { config }
    }

    /// Classify every row of `grid` on the luminance plane of a scan
    pub fn classify(&self, scan: &GrayImage, grid: &Grid) -> Vec<MarkOutcome> {
        let outcomes: Vec<MarkOutcome> = grid
            .rows()
            .iter()
            .map(|row| {
                let filled: Vec<usize> = row
                    .iter()
                    .enumerate()
                    .filter(|(_, center)| self.is_filled(scan, center))
                    .map(|(index, _)| index)
                    .collect();
                MarkOutcome::from_filled(&filled)
            })
            .collect();

        debug!(
            rows = outcomes.len(),
            blank = outcomes.iter().filter(|o| **o == MarkOutcome::Blank).count(),
            ambiguous = outcomes.iter().filter(|o| **o == MarkOutcome::Ambiguous).count(),
            "classified grid"
        );
        outcomes
    }

    /// Whether the bubble at `center` is darker than the threshold
    ///
    /// A patch entirely outside the scan is skipped and never counts as filled.
    pub fn is_filled(&self, scan: &GrayImage, center: &BubbleCenter) -> bool {
        self.patch_mean(scan, center)
            .is_some_and(|mean| mean < self.config.intensity_threshold)
    }

    /// Mean luminance of the patch around `center`, clipped to the scan
    ///
    /// The patch spans `[c - h, c + h)` on both axes. Clipping is the same on
    /// all four edges, so a patch overhanging the top or left edge is averaged
    /// over its in-image part just like one overhanging the bottom or right.
    pub fn patch_mean(&self, scan: &GrayImage, center: &BubbleCenter) -> Option<f32> {
        let half = self.config.patch_half_size;
        let x = center.x.saturating_sub(half);
        let y = center.y.saturating_sub(half);
        let patch = BoundingBox::new(
            x,
            y,
            center.x.saturating_add(half) - x,
            center.y.saturating_add(half) - y,
        )
        .clip_to(scan.width(), scan.height());
        if patch.is_empty() {
            return None;
        }

        let mut sum = 0u64;
        for py in patch.y..patch.bottom() {
            for px in patch.x..patch.right() {
                sum += scan.get_pixel(px, py).0[0] as u64;
            }
        }
        Some(sum as f32 / patch.area() as f32)
    }
}
