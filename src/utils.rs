//! Utility functions for image processing and coordinate transformations.

pub mod image_conversion;
pub mod safe_cast;

use crate::{Error, Result};
use safe_cast::f64_round_to_i32;

/// Mapping between a frame and the square, padded model input it was
/// letterboxed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    /// Frame width after scaling, in model-input pixels
    pub scaled_width: i32,
    /// Frame height after scaling, in model-input pixels
    pub scaled_height: i32,
    /// Padding left of the image content
    pub pad_left: i32,
    /// Padding above the image content
    pub pad_top: i32,
    pub input_size: i32,
}

impl Letterbox {
    /// Compute the letterbox for a frame of the given size
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is not positive
    pub fn new(frame_width: i32, frame_height: i32, input_size: i32) -> Result<Self> {
        if frame_width <= 0 || frame_height <= 0 || input_size <= 0 {
            return Err(Error::InvalidInput(format!(
                "Cannot letterbox {frame_width}x{frame_height} into {input_size}"
            )));
        }

        let size = f64::from(input_size);
        let scale = (size / f64::from(frame_width)).min(size / f64::from(frame_height));
        let scaled_width = f64_round_to_i32(f64::from(frame_width) * scale)?.clamp(1, input_size);
        let scaled_height = f64_round_to_i32(f64::from(frame_height) * scale)?.clamp(1, input_size);

        Ok(Self {
            scaled_width,
            scaled_height,
            pad_left: (input_size - scaled_width) / 2,
            pad_top: (input_size - scaled_height) / 2,
            input_size,
        })
    }

    /// Padding right of the image content
    #[must_use]
    pub const fn pad_right(&self) -> i32 {
        self.input_size - self.scaled_width - self.pad_left
    }

    /// Padding below the image content
    #[must_use]
    pub const fn pad_bottom(&self) -> i32 {
        self.input_size - self.scaled_height - self.pad_top
    }

    /// Convert a model-input pixel position and depth to normalized frame
    /// coordinates.
    ///
    /// Depth is scaled like x, so it stays comparable with the x axis.
    #[must_use]
    pub fn to_normalized(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let width = f64::from(self.scaled_width);
        let height = f64::from(self.scaled_height);
        (
            (x - f64::from(self.pad_left)) / width,
            (y - f64::from(self.pad_top)) / height,
            z / width,
        )
    }
}
