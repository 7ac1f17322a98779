//! Error types for the optic_form_reader library

use std::sync::Arc;
use thiserror::Error;

use crate::region::Region;

/// Result type alias for optic_form_reader operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Error taxonomy for reading optical answer sheets
///
/// Geometry errors (`RegionNotFound`, `InsufficientCircles`,
/// `GridShapeMismatch`, `ImageSizeMismatch`) are fatal for a single sheet
/// only. `MalformedAnswerKey`, `ConfigError` and `InvalidParameter` describe a
/// broken setup and abort the whole batch.
#[derive(Error, Debug, Clone)]
pub enum ScanError {
    /// No pixel area of the template matches the region's color range
    #[error("Region not found: no {region} zone matches its color range")]
    RegionNotFound { region: Region },

    /// The bubble detector found fewer circles than the region's grid needs
    #[error("Insufficient circles in {region} zone: found {found}, expected {expected}")]
    InsufficientCircles {
        region: Region,
        found: usize,
        expected: usize,
    },

    /// Detected circles could not be arranged into the expected grid shape
    #[error("Grid shape mismatch in {region} zone: {reason}")]
    GridShapeMismatch { region: Region, reason: String },

    /// Answer key does not fit the answer grid or contains invalid letters
    #[error("Malformed answer key: {reason}")]
    MalformedAnswerKey { reason: String },

    /// Scan does not share the template's pixel dimensions
    #[error(
        "Scan size {}x{} does not match template size {}x{}",
        .scan.0, .scan.1, .template.0, .template.1
    )]
    ImageSizeMismatch {
        template: (u32, u32),
        scan: (u32, u32),
    },

    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Arc<image::ImageError>>,
    },

    /// Configuration or answer key file could not be read or parsed
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },
}

impl ScanError {
    /// Create an image load error with context
    pub fn image_load(message: impl Into<String>, source: image::ImageError) -> Self {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    pub fn malformed_key(reason: impl Into<String>) -> Self {
        Self::MalformedAnswerKey {
            reason: reason.into(),
        }
    }

    /// Region the failure was detected in, if any
    pub fn region(&self) -> Option<Region> {
        match self {
            ScanError::RegionNotFound { region }
            | ScanError::InsufficientCircles { region, .. }
            | ScanError::GridShapeMismatch { region, .. } => Some(*region),
            _ => None,
        }
    }

    /// Check if this error is confined to one sheet
    ///
    /// Per-sheet errors become a labeled failure in batch output; everything
    /// else indicates the caller's setup is wrong and aborts the batch.
    pub fn is_sheet_error(&self) -> bool {
        matches!(
            self,
            ScanError::RegionNotFound { .. }
                | ScanError::InsufficientCircles { .. }
                | ScanError::GridShapeMismatch { .. }
                | ScanError::ImageSizeMismatch { .. }
                | ScanError::ImageLoadError { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            ScanError::RegionNotFound { region } => format!(
                "The template has no {} zone. Check that the template is printed in the expected colors.",
                region
            ),
            ScanError::InsufficientCircles { region, found, expected } => format!(
                "Only {} of {} bubbles were found in the {} zone of the template.",
                found, expected, region
            ),
            ScanError::GridShapeMismatch { region, .. } => format!(
                "The bubbles in the {} zone of the template do not form a regular grid.",
                region
            ),
            ScanError::ImageSizeMismatch { .. } => {
                "The scanned sheet does not have the same size as the template.".to_string()
            }
            ScanError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            ScanError::MalformedAnswerKey { reason } => {
                format!("The answer key is invalid: {}.", reason)
            }
            _ => "Reading the form failed. Please check the configuration.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_is_named_in_message() {
        let err = ScanError::RegionNotFound {
            region: Region::Group,
        };
        assert!(err.to_string().contains("group"));
        assert_eq!(err.region(), Some(Region::Group));
    }

    #[test]
    fn test_sheet_error_classification() {
        let sheet = ScanError::InsufficientCircles {
            region: Region::Answers,
            found: 97,
            expected: 100,
        };
        assert!(sheet.is_sheet_error());

        let batch = ScanError::malformed_key("group A has 19 answers");
        assert!(!batch.is_sheet_error());
        assert_eq!(batch.region(), None);
    }

    #[test]
    fn test_errors_are_cloneable_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ScanError::config("cannot read config.json", io);
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(std::error::Error::source(&copy).is_some());
    }

    #[test]
    fn test_size_mismatch_message() {
        let err = ScanError::ImageSizeMismatch {
            template: (800, 600),
            scan: (640, 480),
        };
        assert_eq!(
            err.to_string(),
            "Scan size 640x480 does not match template size 800x600"
        );
    }
}
