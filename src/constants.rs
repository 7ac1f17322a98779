//! Calibration constants and reference values for form reading
//!
//! This module contains compile-time defaults for region colors, bubble
//! detection, mark classification and the sheet layout. Every value here is
//! also exposed as a runtime parameter through [`crate::config::ScannerConfig`].

/// Region color ranges in HSV space
///
/// Hue is in degrees (0-360), saturation and value in [0, 1]. A range whose
/// minimum hue is larger than its maximum wraps through 0°.
pub mod hsv {
    /// Minimum saturation/value shared by all zone colors (100 on a 0-255 scale)
    pub const MIN_SATURATION: f32 = 100.0 / 255.0;
    pub const MIN_VALUE: f32 = 100.0 / 255.0;

    /// Student number zone, printed green (#11FF00)
    pub const STUDENT_NUMBER_HUE: (f32, f32) = (100.0, 140.0);

    /// Exam type zone, printed yellow (#FFDD00)
    pub const EXAM_TYPE_HUE: (f32, f32) = (40.0, 60.0);

    /// Group zone, printed pink (#FF00FB)
    pub const GROUP_HUE: (f32, f32) = (280.0, 320.0);

    /// Semester zone, printed red (#FF0004). Pure red sits right at 359°,
    /// so the range wraps.
    pub const SEMESTER_HUE: (f32, f32) = (340.0, 20.0);

    /// Answers zone, printed cyan (#00F2FF)
    pub const ANSWERS_HUE: (f32, f32) = (160.0, 200.0);
}

/// Bubble detector parameters
pub mod detection {
    /// Gaussian blur sigma applied to the cropped zone (matches a 5x5 kernel)
    pub const BLUR_SIGMA: f32 = 1.1;

    /// Bubble radius bounds in pixels
    pub const MIN_RADIUS: f32 = 3.0;
    pub const MAX_RADIUS: f32 = 25.0;

    /// Minimum distance between two accepted bubble centers
    pub const MIN_CENTER_DISTANCE: f32 = 10.0;

    /// Luminance difference from the zone background that counts as print
    pub const BACKGROUND_CONTRAST: u8 = 40;

    /// Enclosed area over bounding box area; a disc is close to π/4
    pub const MIN_FILL_RATIO: f32 = 0.55;
    pub const MAX_FILL_RATIO: f32 = 0.92;

    /// Longest over shortest bounding box side
    pub const MAX_ASPECT_RATIO: f32 = 1.5;
}

/// Mark classification parameters
pub mod classification {
    /// A bubble is filled when its mean luminance is below this value (0-255)
    pub const INTENSITY_THRESHOLD: f32 = 80.0;

    /// Half the side of the square patch sampled around each bubble center
    pub const PATCH_HALF_SIZE: u32 = 5;
}

/// Fixed sheet layout
pub mod layout {
    /// Student number: 8 digit positions of 10 bubbles each
    pub const STUDENT_DIGITS: usize = 8;
    pub const DIGIT_CHOICES: usize = 10;

    /// Answers: 20 questions of 5 options each
    pub const QUESTION_COUNT: usize = 20;
    pub const ANSWER_CHOICES: usize = 5;

    /// Control strips
    pub const EXAM_TYPE_CHOICES: usize = 4;
    pub const GROUP_CHOICES: usize = 4;
    pub const SEMESTER_CHOICES: usize = 3;

    /// Encoded value of a row with no filled bubble
    pub const BLANK_MARK: char = 'X';

    /// Encoded value of a row with more than one filled bubble
    pub const MULTIPLE_MARK: char = 'M';

    /// Letters a valid answer may take
    pub const ANSWER_LETTERS: [char; ANSWER_CHOICES] = ['A', 'B', 'C', 'D', 'E'];
}

/// Luminance weights (ITU-R BT.601), as used by common BGR→gray conversions
pub mod luminance {
    pub const RED_WEIGHT: f32 = 0.299;
    pub const GREEN_WEIGHT: f32 = 0.587;
    pub const BLUE_WEIGHT: f32 = 0.114;
}

/// Batch scheduling
pub mod batch {
    /// Below this many sheets the batch runs sequentially
    pub const MIN_PARALLEL_SHEETS: usize = 4;
}
