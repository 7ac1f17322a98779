//! Configuration structures for the optic_form_reader pipeline.
//!
//! This module exposes every tunable parameter of form reading, organized
//! into groups for zone localization, bubble detection, mark classification
//! and batch scheduling.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use optic_form_reader::ScannerConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = ScannerConfig::from_json_file(Path::new("scanner.json"))?;
//!
//! // Or use defaults
//! let config = ScannerConfig::default();
//! # Ok::<(), optic_form_reader::ScanError>(())
//! ```
//!
//! Sections missing from a JSON file fall back to their defaults.
//!
//! # Configuration Sections
//!
//! - [`LocalizationConfig`]: HSV range of each template zone
//! - [`DetectionConfig`]: Bubble radius bounds, spacing and shape filter
//! - [`ClassificationConfig`]: Darkness threshold and sampling patch size
//! - [`BatchConfig`]: Parallel fan-out of batch processing

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{batch, classification, detection};
use crate::region::{HsvRange, Region};
use crate::{Result, ScanError};

/// Complete configuration for reading answer sheets.
///
/// Can be serialized to/from JSON so a tuned setup can be reproduced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Zone color ranges
    pub localization: LocalizationConfig,

    /// Bubble detection parameters
    pub detection: DetectionConfig,

    /// Mark classification parameters
    pub classification: ClassificationConfig,

    /// Batch scheduling
    pub batch: BatchConfig,
}

/// HSV range of each template zone.
///
/// The five default ranges are disjoint for normal print colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub student_number: HsvRange,
    pub exam_type: HsvRange,
    pub group: HsvRange,
    pub semester: HsvRange,
    pub answers: HsvRange,
}

impl LocalizationConfig {
    /// Color range used to locate `region`
    pub fn range(&self, region: Region) -> &HsvRange {
        match region {
            Region::StudentNumber => &self.student_number,
            Region::ExamType => &self.exam_type,
            Region::Group => &self.group,
            Region::Semester => &self.semester,
            Region::Answers => &self.answers,
        }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            student_number: Region::StudentNumber.default_range(),
            exam_type: Region::ExamType.default_range(),
            group: Region::Group.default_range(),
            semester: Region::Semester.default_range(),
            answers: Region::Answers.default_range(),
        }
    }
}

/// Bubble detection parameters.
///
/// Controls which blobs inside a zone are accepted as bubbles. Radius and
/// distance are in pixels of the template image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Gaussian blur sigma (0 disables smoothing)
    pub blur_sigma: f32,

    /// Minimum bubble radius
    pub min_radius: f32,

    /// Maximum bubble radius
    pub max_radius: f32,

    /// Minimum distance between bubble centers
    pub min_center_distance: f32,

    /// Luminance difference from the zone background that counts as print
    pub background_contrast: u8,

    /// Minimum enclosed area over bounding box area
    pub min_fill_ratio: f32,

    /// Maximum enclosed area over bounding box area
    pub max_fill_ratio: f32,

    /// Maximum ratio of the longer to the shorter bounding box side
    pub max_aspect_ratio: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: detection::BLUR_SIGMA,
            min_radius: detection::MIN_RADIUS,
            max_radius: detection::MAX_RADIUS,
            min_center_distance: detection::MIN_CENTER_DISTANCE,
            background_contrast: detection::BACKGROUND_CONTRAST,
            min_fill_ratio: detection::MIN_FILL_RATIO,
            max_fill_ratio: detection::MAX_FILL_RATIO,
            max_aspect_ratio: detection::MAX_ASPECT_RATIO,
        }
    }
}

/// Mark classification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Mean luminance (0-255) below which a bubble counts as filled
    pub intensity_threshold: f32,

    /// Half side of the square patch sampled around each center
    pub patch_half_size: u32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            intensity_threshold: classification::INTENSITY_THRESHOLD,
            patch_half_size: classification::PATCH_HALF_SIZE,
        }
    }
}

/// Batch scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Distribute sheets over the rayon thread pool
    pub parallel: bool,

    /// Smallest batch worth distributing
    pub min_parallel_sheets: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_parallel_sheets: batch::MIN_PARALLEL_SHEETS,
        }
    }
}

impl ScannerConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScanError::config(format!("cannot read {}", path.display()), e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ScanError::config(format!("cannot parse {}", path.display()), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::config("cannot serialize configuration", e))?;
        std::fs::write(path, json)
            .map_err(|e| ScanError::config(format!("cannot write {}", path.display()), e))?;
        Ok(())
    }

    /// Reject parameters the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        for region in Region::ALL {
            self.localization
                .range(region)
                .validate(&format!("localization.{}", region))?;
        }

        let d = &self.detection;
        if !(d.blur_sigma >= 0.0) {
            return Err(ScanError::invalid_parameter("detection.blur_sigma", d.blur_sigma));
        }
        if !(d.min_radius > 0.0 && d.min_radius < d.max_radius) {
            return Err(ScanError::invalid_parameter(
                "detection.radius",
                format!("{}..{}", d.min_radius, d.max_radius),
            ));
        }
        if !(d.min_center_distance >= 0.0) {
            return Err(ScanError::invalid_parameter(
                "detection.min_center_distance",
                d.min_center_distance,
            ));
        }
        if !(d.min_fill_ratio > 0.0 && d.min_fill_ratio < d.max_fill_ratio && d.max_fill_ratio <= 1.0) {
            return Err(ScanError::invalid_parameter(
                "detection.fill_ratio",
                format!("{}..{}", d.min_fill_ratio, d.max_fill_ratio),
            ));
        }
        if !(d.max_aspect_ratio >= 1.0) {
            return Err(ScanError::invalid_parameter(
                "detection.max_aspect_ratio",
                d.max_aspect_ratio,
            ));
        }

        let c = &self.classification;
        if !(c.intensity_threshold > 0.0 && c.intensity_threshold <= 255.0) {
            return Err(ScanError::invalid_parameter(
                "classification.intensity_threshold",
                c.intensity_threshold,
            ));
        }
        if c.patch_half_size == 0 {
            return Err(ScanError::invalid_parameter("classification.patch_half_size", 0));
        }

        Ok(())
    }
}
