//! Configuration management for the center-of-mass overlay

use crate::{
    annotator::AnnotationConfig,
    constants::{DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE, DEFAULT_OUTPUT_SUFFIX},
    pose_detector::DetectorThresholds,
    segments::SegmentModel,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pose model configuration
    pub detector: DetectorConfig,

    /// Segmental mass model
    pub segments: SegmentModel,

    /// Overlay drawing
    pub annotation: AnnotationConfig,

    /// Output naming
    pub output: OutputConfig,
}

/// Pose model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the full-body pose landmark ONNX model
    pub model_path: PathBuf,

    /// Presence score needed to detect a person (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Presence score needed to keep tracking a person (0.0-1.0)
    pub min_tracking_confidence: f32,
}

/// Output file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the input file stem when no output path is given
    pub suffix: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("assets/pose_landmark_full.onnx"),
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub const fn thresholds(&self) -> DetectorThresholds {
        DetectorThresholds {
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

impl OutputConfig {
    /// Output path next to the input: `<stem><suffix>.<ext>`
    #[must_use]
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "output".into(), |s| s.to_string_lossy());
        let file_name = match input.extension() {
            Some(ext) => format!("{stem}{}.{}", self.suffix, ext.to_string_lossy()),
            None => format!("{stem}{}", self.suffix),
        };
        input.with_file_name(file_name)
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config {}: {e}", path.display())))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        self.detector
            .thresholds()
            .validate()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        self.segments.validate()?;
        self.annotation.validate()?;

        if self.output.suffix.is_empty() {
            return Err(Error::ConfigError(
                "Output suffix must not be empty, the input would be overwritten".to_string(),
            ));
        }
        if self.output.suffix.contains(['/', '\\']) {
            return Err(Error::ConfigError(format!(
                "Output suffix must not contain path separators: '{}'",
                self.output.suffix
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Center of Mass Overlay Configuration

# Pose model
detector:
  model_path: "assets/pose_landmark_full.onnx"
  min_detection_confidence: 0.5
  min_tracking_confidence: 0.5

# Segmental mass model. Segments without a center keep their mass fraction
# but are left out of the weighted mean.
segments:
  lateral_axis:
    right: RIGHT_HIP
    left: LEFT_HIP
  segments:
    - name: head
      mass_fraction: 0.08
      center: { kind: landmark, landmark: NOSE }
    - name: torso
      mass_fraction: 0.5
      center: { kind: landmark, landmark: RIGHT_HIP }
    - name: upper_arm
      mass_fraction: 0.03
      center: { kind: midpoint, from: RIGHT_SHOULDER, to: RIGHT_ELBOW }
    - name: lower_arm
      mass_fraction: 0.02
      center: { kind: unassigned }
    - name: thigh
      mass_fraction: 0.1
      center: { kind: midpoint, from: RIGHT_HIP, to: RIGHT_KNEE }
    - name: lower_leg
      mass_fraction: 0.05
      center: { kind: unassigned }

# Overlay drawing; colors are RGB
annotation:
  draw_skeleton: true
  marker_radius: 5
  marker_color: [255, 0, 0]
  label_offset: [10, -10]
  label_color: [255, 255, 255]
  font_scale: 0.5
  landmark_color: [0, 0, 255]
  landmark_radius: 2
  connection_color: [224, 224, 224]
  line_thickness: 2
  visibility_threshold: 0.5

# Output naming
output:
  suffix: "_com"
"#;
