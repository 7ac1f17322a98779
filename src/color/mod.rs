//! Color conversion module
//!
//! This module handles the HSV and luminance representations used to
//! locate template zones and to measure bubble darkness.

pub mod conversion;

pub use conversion::{hsv_mask, luminance, luminance_crop, luminance_image, rgb_to_hsv};
