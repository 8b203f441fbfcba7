//! Checked numeric conversions between model space and pixel space

use crate::{Error, Result};

/// Safely convert a non-negative i32 (OpenCV dimension) to usize
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} is negative")))
}

/// Round f64 to the nearest i32 with bounds checking
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn f64_round_to_i32(value: f64) -> Result<i32> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX) {
        Ok(rounded as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Pixel position of a normalized coordinate along an axis of `extent` pixels.
///
/// Not clamped: a point outside [0, 1] maps outside the frame.
///
/// # Errors
///
/// Returns an error if the coordinate is not finite
pub fn normalized_to_pixel(value: f64, extent: i32) -> Result<i32> {
    f64_round_to_i32(value * f64::from(extent))
}
