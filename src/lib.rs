//! # Optic Form Reader
//!
//! A Rust crate for reading and scoring optical answer sheets.
//!
//! A blank template printed with five color-coded zones tells the reader where
//! every bubble is; scanned sheets of the same layout are then read at those
//! positions. The library:
//! - Locates the student number, exam type, group, semester and answer zones
//!   by color
//! - Recovers the bubble grid of each zone without fixed pixel coordinates
//! - Classifies every row of bubbles as filled, blank or ambiguous
//! - Scores the answers against a per-group answer key
//!
//! ## Example
//!
//! ```rust,no_run
//! use optic_form_reader::{image_loader::load_image, read_form, AnswerKey, ScannerConfig};
//! use std::path::Path;
//!
//! let template = load_image(Path::new("template.png"))?;
//! let scan = load_image(Path::new("scan_01.jpg"))?;
//! let key = AnswerKey::from_json_file(Path::new("answer_key.json"))?;
//!
//! let (form, score) = read_form(&template, &scan, &key, &ScannerConfig::default())?;
//! println!("{}: {} ({})", form.student_number, form.answers, score);
//! # Ok::<(), optic_form_reader::ScanError>(())
//! ```

use image::RgbImage;

pub mod batch;
pub mod color;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod form;
pub mod image_loader;
pub mod marks;
pub mod region;
pub mod scoring;

pub use batch::{BatchProcessor, ScoredSheet, Sheet, SheetJob, SheetOutcome, SheetReport};
pub use config::ScannerConfig;
pub use detection::{BoundingBox, BubbleCenter, Grid, GridDetector, RegionLocator};
pub use error::{Result, ScanError};
pub use form::{DecodedForm, ExamType, FormDecoder, FormLayout, Group, Semester};
pub use marks::{MarkClassifier, MarkOutcome};
pub use region::{GridLayout, HsvRange, Orientation, Region};
pub use scoring::{score, AnswerKey, ScoreResult};

/// Decode and score a single sheet
///
/// Convenience entry point for one template/scan pair. Use
/// [`BatchProcessor`] to read many sheets against the same template.
///
/// # Errors
///
/// Returns the first zone localization or grid detection error of the
/// template, `ScanError::ImageSizeMismatch` for a scan of another size, and
/// `ScanError::MalformedAnswerKey` if the key does not fit the answer grid.
pub fn read_form(
    template: &RgbImage,
    scan: &RgbImage,
    key: &AnswerKey,
    config: &ScannerConfig,
) -> Result<(DecodedForm, ScoreResult)> {
    config.validate()?;
    let form = FormDecoder::new(config).decode(template, scan)?;
    let score = score(&form.answers, form.group, key)?;
    Ok((form, score))
}
