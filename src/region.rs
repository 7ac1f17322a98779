//! Semantic calibration zones of the answer sheet
//!
//! Each [`Region`] is looked up in a static table that carries its default
//! color range, its reference print color and the shape of its bubble grid.
//! Keeping the rule set as data makes it auditable without reading the
//! detection code.

use std::fmt;

use palette::Hsv;
use serde::{Deserialize, Serialize};

use crate::constants::{hsv, layout};
use crate::{Result, ScanError};

/// A color-delimited calibration zone on the template sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    StudentNumber,
    ExamType,
    Group,
    Semester,
    Answers,
}

impl Region {
    /// All regions in processing order
    pub const ALL: [Region; 5] = [
        Region::StudentNumber,
        Region::ExamType,
        Region::Group,
        Region::Semester,
        Region::Answers,
    ];

    fn rule(self) -> &'static RegionRule {
        &REGION_RULES[self as usize]
    }

    /// Human readable name used in logs and error messages
    pub fn name(self) -> &'static str {
        self.rule().name
    }

    /// Default color classification rule
    pub fn default_range(self) -> HsvRange {
        self.rule().range
    }

    /// Expected bubble grid shape
    pub fn layout(self) -> GridLayout {
        self.rule().layout
    }

    /// Color the zone is printed in on a reference template (RGB)
    pub fn reference_color(self) -> [u8; 3] {
        self.rule().print_color
    }

    /// How a filled slot index is written into the decoded string
    pub fn encoding(self) -> SlotEncoding {
        match self.layout() {
            GridLayout::Columns { .. } => SlotEncoding::Digits,
            _ => SlotEncoding::Letters,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dominant axis of a one-dimensional control strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Bubbles stacked top to bottom
    Vertical,
    /// Bubbles side by side, left to right
    Horizontal,
}

/// Shape of the bubble grid inside a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridLayout {
    /// A single row of `count` bubbles read along `orientation`
    Strip {
        count: usize,
        orientation: Orientation,
    },
    /// `columns` digit positions, each a vertical column of `per_column` bubbles
    Columns { columns: usize, per_column: usize },
    /// `rows` questions, each a horizontal row of `per_row` bubbles
    Rows { rows: usize, per_row: usize },
}

impl GridLayout {
    /// Total number of bubbles in the region
    pub fn expected_count(&self) -> usize {
        self.slot_rows() * self.slots_per_row()
    }

    /// Number of logical rows (digit positions, questions, or one strip)
    pub fn slot_rows(&self) -> usize {
        match *self {
            GridLayout::Strip { .. } => 1,
            GridLayout::Columns { columns, .. } => columns,
            GridLayout::Rows { rows, .. } => rows,
        }
    }

    /// Number of bubbles in each logical row
    pub fn slots_per_row(&self) -> usize {
        match *self {
            GridLayout::Strip { count, .. } => count,
            GridLayout::Columns { per_column, .. } => per_column,
            GridLayout::Rows { per_row, .. } => per_row,
        }
    }
}

/// Character set a filled slot index maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEncoding {
    /// `0`, `1`, ... `9`
    Digits,
    /// `A`, `B`, ...
    Letters,
}

impl SlotEncoding {
    pub fn symbol(self, index: usize) -> Option<char> {
        let index = u32::try_from(index).ok()?;
        match self {
            SlotEncoding::Digits => char::from_digit(index, 10),
            SlotEncoding::Letters if index < 26 => char::from_u32('A' as u32 + index),
            SlotEncoding::Letters => None,
        }
    }
}

/// Closed range in HSV space
///
/// Hue bounds are degrees. When `hue_min > hue_max` the range wraps through 0°.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub hue_min: f32,
    pub hue_max: f32,
    pub saturation_min: f32,
    pub saturation_max: f32,
    pub value_min: f32,
    pub value_max: f32,
}

impl HsvRange {
    /// Range over `hue` with the shared saturation/value floor
    pub const fn with_hue(hue: (f32, f32)) -> Self {
        Self {
            hue_min: hue.0,
            hue_max: hue.1,
            saturation_min: hsv::MIN_SATURATION,
            saturation_max: 1.0,
            value_min: hsv::MIN_VALUE,
            value_max: 1.0,
        }
    }

    pub fn wraps(&self) -> bool {
        self.hue_min > self.hue_max
    }

    pub fn contains(&self, color: &Hsv) -> bool {
        let hue = color.hue.into_positive_degrees();
        let hue_ok = if self.wraps() {
            hue >= self.hue_min || hue <= self.hue_max
        } else {
            hue >= self.hue_min && hue <= self.hue_max
        };

        hue_ok
            && (self.saturation_min..=self.saturation_max).contains(&color.saturation)
            && (self.value_min..=self.value_max).contains(&color.value)
    }

    /// Check the bounds are inside HSV space and ordered
    pub fn validate(&self, name: &str) -> Result<()> {
        let hue = 0.0..=360.0;
        if !hue.contains(&self.hue_min) || !hue.contains(&self.hue_max) {
            return Err(ScanError::invalid_parameter(
                format!("{}.hue", name),
                format!("{}..{}", self.hue_min, self.hue_max),
            ));
        }

        let unit = 0.0..=1.0;
        let bounds = [
            ("saturation", self.saturation_min, self.saturation_max),
            ("value", self.value_min, self.value_max),
        ];
        for (channel, min, max) in bounds {
            if !unit.contains(&min) || !unit.contains(&max) || min > max {
                return Err(ScanError::invalid_parameter(
                    format!("{}.{}", name, channel),
                    format!("{}..{}", min, max),
                ));
            }
        }
        Ok(())
    }
}

struct RegionRule {
    name: &'static str,
    range: HsvRange,
    layout: GridLayout,
    print_color: [u8; 3],
}

// Indexed by `Region as usize`
static REGION_RULES: [RegionRule; 5] = [
    RegionRule {
        name: "student number",
        range: HsvRange::with_hue(hsv::STUDENT_NUMBER_HUE),
        layout: GridLayout::Columns {
            columns: layout::STUDENT_DIGITS,
            per_column: layout::DIGIT_CHOICES,
        },
        print_color: [0x11, 0xFF, 0x00],
    },
    RegionRule {
        name: "exam type",
        range: HsvRange::with_hue(hsv::EXAM_TYPE_HUE),
        layout: GridLayout::Strip {
            count: layout::EXAM_TYPE_CHOICES,
            orientation: Orientation::Vertical,
        },
        print_color: [0xFF, 0xDD, 0x00],
    },
    RegionRule {
        name: "group",
        range: HsvRange::with_hue(hsv::GROUP_HUE),
        layout: GridLayout::Strip {
            count: layout::GROUP_CHOICES,
            orientation: Orientation::Horizontal,
        },
        print_color: [0xFF, 0x00, 0xFB],
    },
    RegionRule {
        name: "semester",
        range: HsvRange::with_hue(hsv::SEMESTER_HUE),
        layout: GridLayout::Strip {
            count: layout::SEMESTER_CHOICES,
            orientation: Orientation::Horizontal,
        },
        print_color: [0xFF, 0x00, 0x04],
    },
    RegionRule {
        name: "answers",
        range: HsvRange::with_hue(hsv::ANSWERS_HUE),
        layout: GridLayout::Rows {
            rows: layout::QUESTION_COUNT,
            per_row: layout::ANSWER_CHOICES,
        },
        print_color: [0x00, 0xF2, 0xFF],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::rgb_to_hsv;

    #[test]
    fn test_table_order_matches_enum() {
        for (i, region) in Region::ALL.iter().enumerate() {
            assert_eq!(*region as usize, i);
        }
        assert_eq!(Region::Answers.name(), "answers");
    }

    #[test]
    fn test_grid_shapes() {
        assert_eq!(Region::StudentNumber.layout().expected_count(), 80);
        assert_eq!(Region::StudentNumber.layout().slot_rows(), 8);
        assert_eq!(Region::Answers.layout().expected_count(), 100);
        assert_eq!(Region::Answers.layout().slot_rows(), 20);
        assert_eq!(Region::ExamType.layout().expected_count(), 4);
        assert_eq!(Region::Group.layout().expected_count(), 4);
        assert_eq!(Region::Semester.layout().expected_count(), 3);
        assert_eq!(Region::Semester.layout().slot_rows(), 1);
    }

    #[test]
    fn test_reference_colors_match_only_their_own_range() {
        for region in Region::ALL {
            let [r, g, b] = region.reference_color();
            let color = rgb_to_hsv(r, g, b);
            for other in Region::ALL {
                assert_eq!(
                    other.default_range().contains(&color),
                    other == region,
                    "{} print color vs {} range",
                    region,
                    other
                );
            }
        }
    }

    #[test]
    fn test_neutral_pixels_match_no_range() {
        for (r, g, b) in [(255, 255, 255), (0, 0, 0), (128, 128, 128)] {
            let color = rgb_to_hsv(r, g, b);
            assert!(Region::ALL
                .iter()
                .all(|region| !region.default_range().contains(&color)));
        }
    }

    #[test]
    fn test_wrapping_hue_range() {
        let red = Region::Semester.default_range();
        assert!(red.wraps());
        assert!(red.contains(&rgb_to_hsv(255, 0, 4)));
        assert!(red.contains(&rgb_to_hsv(255, 20, 0)));
        assert!(!red.contains(&rgb_to_hsv(255, 160, 0)));
    }

    #[test]
    fn test_slot_encoding() {
        assert_eq!(SlotEncoding::Digits.symbol(0), Some('0'));
        assert_eq!(SlotEncoding::Digits.symbol(9), Some('9'));
        assert_eq!(SlotEncoding::Digits.symbol(10), None);
        assert_eq!(SlotEncoding::Letters.symbol(0), Some('A'));
        assert_eq!(SlotEncoding::Letters.symbol(4), Some('E'));
        assert_eq!(Region::StudentNumber.encoding(), SlotEncoding::Digits);
        assert_eq!(Region::Answers.encoding(), SlotEncoding::Letters);
    }

    #[test]
    fn test_range_validation() {
        assert!(Region::Answers.default_range().validate("answers").is_ok());

        let mut bad = Region::Answers.default_range();
        bad.value_min = 1.5;
        assert!(bad.validate("answers").is_err());

        let mut bad_hue = Region::Answers.default_range();
        bad_hue.hue_max = 400.0;
        assert!(bad_hue.validate("answers").is_err());
    }
}
