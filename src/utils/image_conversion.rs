//! Frame layout conversion and model-input tensor preparation.

use super::Letterbox;
use crate::{Error, Result};
use ndarray::{Array3, Array4};
use opencv::core::{self, Mat, Scalar, Size, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

/// Convert a BGR frame to RGB
///
/// # Errors
///
/// Returns an error if the frame is not a 3-channel image
pub fn bgr_to_rgb(frame: &Mat) -> Result<Mat> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    Ok(rgb)
}

/// Convert an RGB frame back to BGR
///
/// # Errors
///
/// Returns an error if the frame is not a 3-channel image
pub fn rgb_to_bgr(frame: &Mat) -> Result<Mat> {
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(frame, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// Check that a frame is a non-empty 8-bit 3-channel image
///
/// # Errors
///
/// Returns an error describing the offending frame
pub fn ensure_color_frame(frame: &Mat) -> Result<()> {
    if frame.empty() {
        return Err(Error::FrameProcessing("Empty frame".to_string()));
    }
    if frame.typ() != CV_8UC3 {
        return Err(Error::FrameProcessing(format!(
            "Expected 8-bit 3-channel frame, got type {} with {} channels",
            frame.typ(),
            frame.channels()
        )));
    }
    Ok(())
}

/// Resize a frame preserving aspect ratio and pad it with black to the
/// letterbox input size
///
/// # Errors
///
/// Returns an error if resizing or padding fails
pub fn letterbox_image(frame: &Mat, letterbox: &Letterbox) -> Result<Mat> {
    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(letterbox.scaled_width, letterbox.scaled_height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut padded = Mat::default();
    core::copy_make_border(
        &resized,
        &mut padded,
        letterbox.pad_top,
        letterbox.pad_bottom(),
        letterbox.pad_left,
        letterbox.pad_right(),
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;
    Ok(padded)
}

/// Convert an 8-bit 3-channel Mat to an ndarray `Array3<u8>` (rows, cols, channels)
///
/// # Errors
///
/// Returns an error if the Mat is not 8-bit 3-channel
pub fn mat_to_array3_u8(mat: &Mat) -> Result<Array3<u8>> {
    ensure_color_frame(mat)?;
    let rows = super::safe_cast::i32_to_usize(mat.rows())?;
    let cols = super::safe_cast::i32_to_usize(mat.cols())?;

    let data = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };

    Array3::from_shape_vec((rows, cols, 3), data)
        .map_err(|e| Error::FrameProcessing(format!("Failed to create array from Mat: {e}")))
}

/// Convert an 8-bit 3-channel image to a `[1, H, W, 3]` float tensor in [0, 1]
///
/// # Errors
///
/// Returns an error if the image layout is unexpected
pub fn mat_to_nhwc_f32(mat: &Mat) -> Result<Array4<f32>> {
    let pixels = mat_to_array3_u8(mat)?;
    let (rows, cols, channels) = pixels.dim();
    let normalized = pixels.mapv(|v| f32::from(v) / 255.0);

    normalized
        .into_shape((1, rows, cols, channels))
        .map_err(|e| Error::FrameProcessing(format!("Failed to reshape input tensor: {e}")))
}
