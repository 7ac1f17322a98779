//! Form decoding
//!
//! Combines zone localization, grid detection and mark classification into a
//! single structured record per scanned sheet. The template is analysed into a
//! [`FormLayout`] once and can then be applied to any number of scans.

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::color::luminance_image;
use crate::config::ScannerConfig;
use crate::constants::layout::{BLANK_MARK, MULTIPLE_MARK};
use crate::detection::{Grid, GridDetector, RegionLocator};
use crate::marks::{encode, MarkClassifier, MarkOutcome};
use crate::region::Region;
use crate::{Result, ScanError};

/// Label chosen by marking exactly one bubble of a control strip
pub trait StripLabel: Copy + fmt::Display + 'static {
    /// Zone the strip is printed in
    const REGION: Region;

    /// Labels in bubble order
    const CHOICES: &'static [Self];

    /// Label for a blank or ambiguous strip
    const UNKNOWN: Self;

    /// Resolve a strip's outcome into a label
    fn from_outcome(outcome: MarkOutcome) -> Self {
        outcome
            .index()
            .and_then(|index| Self::CHOICES.get(index).copied())
            .unwrap_or(Self::UNKNOWN)
    }
}

/// Kind of exam the sheet was filled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    Midterm,
    Final,
    MakeUp,
    Other,
    Unknown,
}

impl StripLabel for ExamType {
    const REGION: Region = Region::ExamType;
    const CHOICES: &'static [Self] = &[
        ExamType::Midterm,
        ExamType::Final,
        ExamType::MakeUp,
        ExamType::Other,
    ];
    const UNKNOWN: Self = ExamType::Unknown;
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExamType::Midterm => "Midterm",
            ExamType::Final => "Final",
            ExamType::MakeUp => "Make-up",
            ExamType::Other => "Other",
            ExamType::Unknown => "Unknown",
        })
    }
}

/// Booklet group; selects the answer key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    A,
    B,
    C,
    D,
    Unknown,
}

impl Group {
    /// Group printed as `letter`, if any
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Group::A),
            'B' => Some(Group::B),
            'C' => Some(Group::C),
            'D' => Some(Group::D),
            _ => None,
        }
    }
}

impl StripLabel for Group {
    const REGION: Region = Region::Group;
    const CHOICES: &'static [Self] = &[Group::A, Group::B, Group::C, Group::D];
    const UNKNOWN: Self = Group::Unknown;
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Group::A => "A",
            Group::B => "B",
            Group::C => "C",
            Group::D => "D",
            Group::Unknown => "Unknown",
        })
    }
}

/// Academic term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    Fall,
    Spring,
    Summer,
    Unknown,
}

impl StripLabel for Semester {
    const REGION: Region = Region::Semester;
    const CHOICES: &'static [Self] = &[Semester::Fall, Semester::Spring, Semester::Summer];
    const UNKNOWN: Self = Semester::Unknown;
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Semester::Fall => "Fall",
            Semester::Spring => "Spring",
            Semester::Summer => "Summer",
            Semester::Unknown => "Unknown",
        })
    }
}

/// Everything read from one scanned sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedForm {
    /// One character per digit position: `0`-`9`, `X` or `M`
    pub student_number: String,
    pub exam_type: ExamType,
    pub group: Group,
    pub semester: Semester,
    /// One character per question: `A`-`E`, `X` or `M`
    pub answers: String,
}

impl DecodedForm {
    /// 1-based numbers of questions with more than one mark
    pub fn ambiguous_questions(&self) -> Vec<usize> {
        self.questions_marked(MULTIPLE_MARK)
    }

    /// 1-based numbers of questions left empty
    pub fn blank_questions(&self) -> Vec<usize> {
        self.questions_marked(BLANK_MARK)
    }

    fn questions_marked(&self, mark: char) -> Vec<usize> {
        self.answers
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == mark)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// Bubble geometry of a template, one grid per region
///
/// Deserialization checks that every region has a grid of its expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayoutFields")]
pub struct FormLayout {
    width: u32,
    height: u32,
    // Indexed by `Region as usize`
    grids: Vec<Grid>,
}

#[derive(Deserialize)]
struct LayoutFields {
    width: u32,
    height: u32,
    grids: Vec<Grid>,
}

impl TryFrom<LayoutFields> for FormLayout {
    type Error = ScanError;

    fn try_from(fields: LayoutFields) -> Result<Self> {
        if fields.grids.len() != Region::ALL.len() {
            return Err(ScanError::invalid_parameter(
                "layout grids",
                fields.grids.len(),
            ));
        }
        for (region, grid) in Region::ALL.into_iter().zip(&fields.grids) {
            let shape = region.layout();
            if grid.row_count() != shape.slot_rows() || grid.column_count() != shape.slots_per_row() {
                return Err(ScanError::GridShapeMismatch {
                    region,
                    reason: format!(
                        "stored grid is {}x{}, expected {}x{}",
                        grid.row_count(),
                        grid.column_count(),
                        shape.slot_rows(),
                        shape.slots_per_row()
                    ),
                });
            }
        }
        Ok(Self {
            width: fields.width,
            height: fields.height,
            grids: fields.grids,
        })
    }
}

impl FormLayout {
    pub fn grid(&self, region: Region) -> &Grid {
        &self.grids[region as usize]
    }

    /// Pixel size of the template the layout was detected on
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Form decoder applying the full pipeline to template/scan pairs
#[derive(Debug, Clone, Default)]
pub struct FormDecoder {
    locator: RegionLocator,
    detector: GridDetector,
    classifier: MarkClassifier,
}

impl FormDecoder {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            locator: RegionLocator::with_config(config.localization.clone()),
            detector: GridDetector::with_config(config.detection.clone()),
            classifier: MarkClassifier::with_config(config.classification.clone()),
        }
    }

    /// Locate every zone of the template and recover its bubble grid
    ///
    /// Regions are processed in the fixed order of [`Region::ALL`], so the
    /// error names the first zone that failed.
    pub fn analyze_template(&self, template: &RgbImage) -> Result<FormLayout> {
        let mut grids = Vec::with_capacity(Region::ALL.len());
        for region in Region::ALL {
            let bbox = self.locator.locate(template, region)?;
            let zone = self.locator.range(region);
            let grid = self.detector.detect(template, &bbox, region, zone)?;
            grids.push(grid);
        }

        debug!(
            width = template.width(),
            height = template.height(),
            "template analysed"
        );
        Ok(FormLayout {
            width: template.width(),
            height: template.height(),
            grids,
        })
    }

    /// Read a scan using the geometry of an analysed template
    ///
    /// # Errors
    ///
    /// Returns `ScanError::ImageSizeMismatch` if the scan does not have the
    /// template's dimensions.
    pub fn read(&self, layout: &FormLayout, scan: &RgbImage) -> Result<DecodedForm> {
        let scan_size = scan.dimensions();
        if scan_size != layout.dimensions() {
            return Err(ScanError::ImageSizeMismatch {
                template: layout.dimensions(),
                scan: scan_size,
            });
        }

        let gray = luminance_image(scan);
        let outcomes = |region: Region| self.classifier.classify(&gray, layout.grid(region));

        let student_number = encode(
            &outcomes(Region::StudentNumber),
            Region::StudentNumber.encoding(),
        );
        let exam_type = resolve_strip::<ExamType>(&outcomes(ExamType::REGION));
        let group = resolve_strip::<Group>(&outcomes(Group::REGION));
        let semester = resolve_strip::<Semester>(&outcomes(Semester::REGION));
        let answers = encode(&outcomes(Region::Answers), Region::Answers.encoding());

        let form = DecodedForm {
            student_number,
            exam_type,
            group,
            semester,
            answers,
        };

        let ambiguous = form.ambiguous_questions();
        if !ambiguous.is_empty() {
            warn!(questions = ?ambiguous, "questions with multiple marks");
        }
        debug!(
            student_number = %form.student_number,
            group = %form.group,
            answers = %form.answers,
            "decoded form"
        );
        Ok(form)
    }

    /// Analyse `template` and read `scan` against it
    pub fn decode(&self, template: &RgbImage, scan: &RgbImage) -> Result<DecodedForm> {
        let layout = self.analyze_template(template)?;
        self.read(&layout, scan)
    }
}

fn resolve_strip<L: StripLabel>(outcomes: &[MarkOutcome]) -> L {
    let outcome = outcomes.first().copied().unwrap_or(MarkOutcome::Blank);
    let label = L::from_outcome(outcome);
    if outcome.index().is_none() {
        warn!(region = %L::REGION, ?outcome, "control strip unresolved");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BubbleCenter;

    #[test]
    fn test_strip_labels_resolve_single_mark_only() {
        assert_eq!(ExamType::from_outcome(MarkOutcome::Filled(1)), ExamType::Final);
        assert_eq!(ExamType::from_outcome(MarkOutcome::Blank), ExamType::Unknown);
        assert_eq!(Group::from_outcome(MarkOutcome::Filled(3)), Group::D);
        assert_eq!(Group::from_outcome(MarkOutcome::Ambiguous), Group::Unknown);
        assert_eq!(Semester::from_outcome(MarkOutcome::Filled(2)), Semester::Summer);
        assert_eq!(Semester::from_outcome(MarkOutcome::Filled(3)), Semester::Unknown);
    }

    #[test]
    fn test_label_sets_match_strip_sizes() {
        assert_eq!(ExamType::CHOICES.len(), ExamType::REGION.layout().expected_count());
        assert_eq!(Group::CHOICES.len(), Group::REGION.layout().expected_count());
        assert_eq!(Semester::CHOICES.len(), Semester::REGION.layout().expected_count());
    }

    #[test]
    fn test_label_display() {
        assert_eq!(ExamType::MakeUp.to_string(), "Make-up");
        assert_eq!(Group::B.to_string(), "B");
        assert_eq!(Semester::Unknown.to_string(), "Unknown");
        assert_eq!(Group::from_letter('c'), Some(Group::C));
        assert_eq!(Group::from_letter('E'), None);
    }

    #[test]
    fn test_question_diagnostics() {
        let form = DecodedForm {
            student_number: "2021X456".to_string(),
            exam_type: ExamType::Midterm,
            group: Group::A,
            semester: Semester::Fall,
            answers: "AXMBCDEAXXABCDEMABCD".to_string(),
        };
        assert_eq!(form.blank_questions(), vec![2, 9, 10]);
        assert_eq!(form.ambiguous_questions(), vec![3, 16]);
    }

    fn stored_layout(answer_rows: usize) -> FormLayout {
        let grid = |rows: usize, cols: usize| {
            let rows = (0..rows)
                .map(|r| {
                    (0..cols)
                        .map(|c| BubbleCenter::new(c as u32 * 20, r as u32 * 20))
                        .collect()
                })
                .collect();
            Grid::new(rows).unwrap()
        };
        let grids = Region::ALL
            .iter()
            .map(|region| {
                let shape = region.layout();
                let rows = if *region == Region::Answers {
                    answer_rows
                } else {
                    shape.slot_rows()
                };
                grid(rows, shape.slots_per_row())
            })
            .collect();
        FormLayout {
            width: 600,
            height: 800,
            grids,
        }
    }

    #[test]
    fn test_layout_json_roundtrip() {
        let layout = stored_layout(20);
        let json = serde_json::to_string(&layout).unwrap();
        let restored: FormLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, layout);
        assert_eq!(restored.grid(Region::Answers).row_count(), 20);
    }

    #[test]
    fn test_layout_json_rejects_missing_or_misshapen_grids() {
        assert!(serde_json::from_str::<FormLayout>(r#"{"width":1,"height":1,"grids":[]}"#).is_err());

        let json = serde_json::to_string(&stored_layout(19)).unwrap();
        let err = serde_json::from_str::<FormLayout>(&json).unwrap_err();
        assert!(err.to_string().contains("answers"));
    }

    #[test]
    fn test_blank_template_names_first_region() {
        let template = RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]));
        let err = FormDecoder::default()
            .analyze_template(&template)
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::RegionNotFound {
                region: Region::StudentNumber
            }
        ));
    }
}
