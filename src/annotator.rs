//! Drawing of the skeleton, center-of-mass marker and coordinate label.

use crate::{
    center_of_mass::CenterOfMass,
    constants::{DEFAULT_FONT_SCALE, DEFAULT_LABEL_OFFSET, DEFAULT_MARKER_RADIUS, VISIBILITY_THRESHOLD},
    landmarks::{PoseDetection, POSE_CONNECTIONS},
    utils::{image_conversion::ensure_color_frame, safe_cast::normalized_to_pixel},
    Error, Result,
};
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

/// Drawing parameters. Colors are in the layout of the frame being drawn on
/// (RGB in the pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub draw_skeleton: bool,
    pub marker_radius: i32,
    pub marker_color: [u8; 3],
    pub label_offset: (i32, i32),
    pub label_color: [u8; 3],
    pub font_scale: f64,
    pub landmark_color: [u8; 3],
    pub landmark_radius: i32,
    pub connection_color: [u8; 3],
    pub line_thickness: i32,
    pub visibility_threshold: f32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            draw_skeleton: true,
            marker_radius: DEFAULT_MARKER_RADIUS,
            marker_color: [255, 0, 0],
            label_offset: DEFAULT_LABEL_OFFSET,
            label_color: [255, 255, 255],
            font_scale: DEFAULT_FONT_SCALE,
            landmark_color: [0, 0, 255],
            landmark_radius: 2,
            connection_color: [224, 224, 224],
            line_thickness: 2,
            visibility_threshold: VISIBILITY_THRESHOLD,
        }
    }
}

impl AnnotationConfig {
    /// Validate drawing parameters
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive sizes or a non-finite font scale
    pub fn validate(&self) -> Result<()> {
        if self.marker_radius <= 0 {
            return Err(Error::ConfigError(format!(
                "marker_radius must be positive, got {}",
                self.marker_radius
            )));
        }
        if self.landmark_radius <= 0 || self.line_thickness <= 0 {
            return Err(Error::ConfigError(
                "landmark_radius and line_thickness must be positive".to_string(),
            ));
        }
        if !self.font_scale.is_finite() || self.font_scale <= 0.0 {
            return Err(Error::ConfigError(format!(
                "font_scale must be positive, got {}",
                self.font_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(Error::ConfigError(format!(
                "visibility_threshold must be in [0, 1], got {}",
                self.visibility_threshold
            )));
        }
        Ok(())
    }
}

fn color(rgb: [u8; 3]) -> Scalar {
    Scalar::new(f64::from(rgb[0]), f64::from(rgb[1]), f64::from(rgb[2]), 0.0)
}

/// Draws pose results onto frames
#[derive(Debug, Clone, Default)]
pub struct FrameAnnotator {
    config: AnnotationConfig,
}

impl FrameAnnotator {
    #[must_use]
    pub const fn new(config: AnnotationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &AnnotationConfig {
        &self.config
    }

    /// Annotate a frame in place.
    ///
    /// Without a detection the frame is left untouched. With one, the skeleton
    /// is drawn, followed by the CoM marker and label when `com` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not 8-bit 3-channel, the CoM has a
    /// non-finite coordinate, or drawing fails
    pub fn annotate(&self, frame: &mut Mat, detection: Option<&PoseDetection>, com: Option<&CenterOfMass>) -> Result<()> {
        let Some(detection) = detection else {
            return Ok(());
        };

        ensure_color_frame(frame)?;

        // Resolve the marker before drawing anything so a bad CoM leaves the frame as it was
        let marker = com.map(|com| self.marker_position(frame, com)).transpose()?;

        if self.config.draw_skeleton {
            self.draw_skeleton(frame, detection)?;
        }

        if let (Some(center), Some(com)) = (marker, com) {
            self.draw_center_of_mass(frame, center, com)?;
        }

        Ok(())
    }

    /// Pixel position of the CoM marker on a frame
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate is not finite
    pub fn marker_position(&self, frame: &Mat, com: &CenterOfMass) -> Result<Point> {
        if !com.is_finite() {
            return Err(Error::FrameProcessing(format!("Cannot draw non-finite center of mass {com:?}")));
        }
        let x = normalized_to_pixel(com.cm_x, frame.cols())?;
        let y = normalized_to_pixel(com.cm_y, frame.rows())?;
        Ok(Point::new(x, y))
    }

    fn keypoint_pixel(&self, frame: &Mat, detection: &PoseDetection, index: usize) -> Option<Point> {
        let keypoint = detection.keypoints.get(index)?;
        if keypoint.visibility < self.config.visibility_threshold || !keypoint.point.is_finite() {
            return None;
        }
        let x = normalized_to_pixel(keypoint.point.x, frame.cols()).ok()?;
        let y = normalized_to_pixel(keypoint.point.y, frame.rows()).ok()?;
        Some(Point::new(x, y))
    }

    fn draw_skeleton(&self, frame: &mut Mat, detection: &PoseDetection) -> Result<()> {
        let points: Vec<Option<Point>> = (0..detection.keypoints.len())
            .map(|i| self.keypoint_pixel(frame, detection, i))
            .collect();

        for &(a, b) in &POSE_CONNECTIONS {
            if let (Some(Some(start)), Some(Some(end))) = (points.get(a), points.get(b)) {
                imgproc::line(
                    frame,
                    *start,
                    *end,
                    color(self.config.connection_color),
                    self.config.line_thickness,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }

        for point in points.iter().flatten() {
            imgproc::circle(
                frame,
                *point,
                self.config.landmark_radius,
                color(self.config.landmark_color),
                -1,
                imgproc::LINE_8,
                0,
            )?;
        }

        Ok(())
    }

    fn draw_center_of_mass(&self, frame: &mut Mat, center: Point, com: &CenterOfMass) -> Result<()> {
        imgproc::circle(
            frame,
            center,
            self.config.marker_radius,
            color(self.config.marker_color),
            -1,
            imgproc::LINE_8,
            0,
        )?;

        let (dx, dy) = self.config.label_offset;
        imgproc::put_text(
            frame,
            &com.label(),
            Point::new(center.x + dx, center.y + dy),
            imgproc::FONT_HERSHEY_SIMPLEX,
            self.config.font_scale,
            color(self.config.label_color),
            1,
            imgproc::LINE_8,
            false,
        )?;

        Ok(())
    }
}
