use crate::{
    constants::{
        DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE, LANDMARK_STRIDE, NUM_POSE_LANDMARKS,
        POSE_MODEL_INPUT_SIZE,
    },
    landmarks::{Landmark, PoseDetection, PoseKeypoint},
    utils::{
        image_conversion::{ensure_color_frame, letterbox_image, mat_to_nhwc_f32},
        Letterbox,
    },
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::Mat;
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Pose model capability: an RGB frame in, zero or one pose out.
///
/// Implementations may keep state across calls (tracking), so `detect` takes
/// `&mut self`. Instances belong to one run.
pub trait PoseDetector {
    /// Detect the single most prominent person in an RGB frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails. "No person" is `Ok(None)`.
    fn detect(&mut self, rgb_frame: &Mat) -> Result<Option<PoseDetection>>;

    /// Forget tracking state before a new run
    fn reset(&mut self) {}
}

/// Detector confidence thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorThresholds {
    /// Minimum presence score to accept a person when not tracking
    pub min_detection_confidence: f32,
    /// Minimum presence score to keep a person tracked from the last frame
    pub min_tracking_confidence: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

impl DetectorThresholds {
    /// Validate both thresholds
    ///
    /// # Errors
    ///
    /// Returns an error if either threshold is outside [0, 1]
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidInput(format!("{name} must be in [0, 1], got {value}")));
            }
        }
        Ok(())
    }
}

/// Presence gate with detect/track hysteresis
#[derive(Debug, Clone)]
pub struct PresenceGate {
    thresholds: DetectorThresholds,
    tracking: bool,
}

impl PresenceGate {
    #[must_use]
    pub const fn new(thresholds: DetectorThresholds) -> Self {
        Self {
            thresholds,
            tracking: false,
        }
    }

    /// Threshold applied to the next score
    #[must_use]
    pub const fn active_threshold(&self) -> f32 {
        if self.tracking {
            self.thresholds.min_tracking_confidence
        } else {
            self.thresholds.min_detection_confidence
        }
    }

    /// Accept or reject a score and update the tracking state
    pub fn accept(&mut self, score: f32) -> bool {
        let accepted = score.is_finite() && score >= self.active_threshold();
        self.tracking = accepted;
        accepted
    }

    /// Whether the previous frame had a person
    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn reset(&mut self) {
        self.tracking = false;
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Decode the flat landmark tensor of a BlazePose-style model.
///
/// Values are `(x, y, z, visibility_logit, presence_logit)` per landmark in
/// model-input pixels; positions are mapped back through the letterbox.
///
/// # Errors
///
/// Returns an error if the tensor is shorter than the full topology
pub fn decode_landmarks(raw: &[f32], letterbox: &Letterbox, score: f32) -> Result<PoseDetection> {
    let needed = NUM_POSE_LANDMARKS * LANDMARK_STRIDE;
    if raw.len() < needed {
        return Err(Error::ModelOutputError(format!(
            "Landmark tensor has {} values, expected at least {needed}",
            raw.len()
        )));
    }

    let keypoints = raw
        .chunks_exact(LANDMARK_STRIDE)
        .take(NUM_POSE_LANDMARKS)
        .map(|values| {
            let (x, y, z) =
                letterbox.to_normalized(f64::from(values[0]), f64::from(values[1]), f64::from(values[2]));
            PoseKeypoint {
                point: Landmark::new(x, y, z),
                visibility: sigmoid(values[3]),
            }
        })
        .collect();

    Ok(PoseDetection { keypoints, score })
}

/// Full-body pose detector running a BlazePose-style landmark model on
/// `ONNX` Runtime.
///
/// Input is `[1, 256, 256, 3]` RGB in [0, 1]. The landmark output (195
/// values) and the presence output (1 value) are picked by size.
pub struct OnnxPoseDetector {
    session: Session,
    input_size: i32,
    gate: PresenceGate,
}

impl OnnxPoseDetector {
    /// Create a detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The thresholds are outside [0, 1]
    /// - The ONNX model file cannot be loaded
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P, thresholds: DetectorThresholds) -> Result<Self> {
        thresholds.validate()?;

        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(Error::ModelError(format!(
                "Pose model not found: {}",
                model_path.display()
            )));
        }

        log::info!("Initializing OnnxPoseDetector with model: {}", model_path.display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("pose_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }
        if session.outputs.len() < 2 {
            return Err(Error::ModelError(format!(
                "Pose model needs landmark and presence outputs, found {}",
                session.outputs.len()
            )));
        }

        Ok(Self {
            session,
            input_size: POSE_MODEL_INPUT_SIZE,
            gate: PresenceGate::new(thresholds),
        })
    }

    /// Run the model and return `(landmarks, presence_score)`
    fn forward(&self, input: Array4<f32>) -> Result<(Vec<f32>, f32)> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let landmark_len = NUM_POSE_LANDMARKS * LANDMARK_STRIDE;
        let mut landmarks = None;
        let mut presence = None;

        for output in &outputs {
            let tensor = output.try_extract::<f32>()?;
            let view = tensor.view();
            let data: Vec<f32> = view.iter().copied().collect();
            if data.len() == landmark_len && landmarks.is_none() {
                landmarks = Some(data);
            } else if data.len() == 1 && presence.is_none() {
                presence = Some(data[0]);
            }
        }

        let landmarks =
            landmarks.ok_or_else(|| Error::ModelOutputError("No landmark output in model results".to_string()))?;
        let presence =
            presence.ok_or_else(|| Error::ModelOutputError("No presence output in model results".to_string()))?;

        // Some exports emit a logit, others a probability
        let score = if (0.0..=1.0).contains(&presence) {
            presence
        } else {
            sigmoid(presence)
        };

        Ok((landmarks, score))
    }
}

impl PoseDetector for OnnxPoseDetector {
    fn detect(&mut self, rgb_frame: &Mat) -> Result<Option<PoseDetection>> {
        ensure_color_frame(rgb_frame)?;

        let letterbox = Letterbox::new(rgb_frame.cols(), rgb_frame.rows(), self.input_size)?;
        let input_image = letterbox_image(rgb_frame, &letterbox)?;
        let input = mat_to_nhwc_f32(&input_image)?;

        let (raw, score) = self.forward(input)?;

        let threshold = self.gate.active_threshold();
        if !self.gate.accept(score) {
            log::debug!("Pose presence {score:.3} below threshold {threshold:.2}");
            return Ok(None);
        }

        decode_landmarks(&raw, &letterbox, score).map(Some)
    }

    fn reset(&mut self) {
        self.gate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_validation() {
        assert!(DetectorThresholds::default().validate().is_ok());

        let bad = DetectorThresholds {
            min_detection_confidence: 1.5,
            ..DetectorThresholds::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidInput(_))));

        let bad = DetectorThresholds {
            min_tracking_confidence: -0.1,
            ..DetectorThresholds::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_presence_gate_uses_tracking_threshold_after_hit() {
        let mut gate = PresenceGate::new(DetectorThresholds {
            min_detection_confidence: 0.8,
            min_tracking_confidence: 0.3,
        });

        assert!(!gate.accept(0.5));
        assert!(!gate.is_tracking());

        assert!(gate.accept(0.9));
        assert!(gate.is_tracking());
        assert!((gate.active_threshold() - 0.3).abs() < f32::EPSILON);

        // Tracked person survives a weaker frame
        assert!(gate.accept(0.5));

        assert!(!gate.accept(0.1));
        assert!((gate.active_threshold() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_presence_gate_rejects_nan() {
        let mut gate = PresenceGate::new(DetectorThresholds::default());
        assert!(!gate.accept(f32::NAN));
    }

    #[test]
    fn test_decode_landmarks_maps_through_letterbox() {
        let letterbox = Letterbox::new(640, 480, 256).unwrap();
        let mut raw = vec![0.0f32; NUM_POSE_LANDMARKS * LANDMARK_STRIDE];
        // Landmark 0 at the input center, fully visible
        raw[0] = 128.0;
        raw[1] = 128.0;
        raw[2] = 0.0;
        raw[3] = 10.0;

        let detection = decode_landmarks(&raw, &letterbox, 0.9).unwrap();
        assert_eq!(detection.keypoints.len(), NUM_POSE_LANDMARKS);
        let nose = detection.keypoints[0];
        assert!((nose.point.x - 0.5).abs() < 1e-9);
        assert!((nose.point.y - 0.5).abs() < 1e-9);
        assert!(nose.visibility > 0.99);
        // Logit 0 is visibility 0.5
        assert!((detection.keypoints[1].visibility - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_landmarks_rejects_short_tensor() {
        let letterbox = Letterbox::new(640, 480, 256).unwrap();
        let result = decode_landmarks(&[0.0; 10], &letterbox, 0.9);
        assert!(matches!(result, Err(Error::ModelOutputError(_))));
    }

    #[test]
    fn test_missing_model_file() {
        let result = OnnxPoseDetector::new("does/not/exist.onnx", DetectorThresholds::default());
        assert!(matches!(result, Err(Error::ModelError(_))));
    }
}
