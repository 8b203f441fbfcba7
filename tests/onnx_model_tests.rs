//! Tests for pose model loading and inference

mod test_helpers;

use com_overlay::{
    constants::NUM_POSE_LANDMARKS,
    pose_detector::{DetectorThresholds, OnnxPoseDetector, PoseDetector},
    utils::image_conversion::bgr_to_rgb,
    Result,
};
use std::path::Path;
use test_helpers::create_test_frame;

const MODEL_PATH: &str = "assets/pose_landmark_full.onnx";

#[test]
#[ignore = "Requires pose ONNX model"]
fn test_load_pose_model() -> Result<()> {
    assert!(Path::new(MODEL_PATH).exists(), "Pose model not found");

    let _detector = OnnxPoseDetector::new(MODEL_PATH, DetectorThresholds::default())?;

    Ok(())
}

#[test]
#[ignore = "Requires pose ONNX model"]
fn test_blank_frame_has_no_person() -> Result<()> {
    let mut detector = OnnxPoseDetector::new(MODEL_PATH, DetectorThresholds::default())?;
    let frame = bgr_to_rgb(&create_test_frame(480, 640, (0.0, 0.0, 0.0))?)?;

    assert!(detector.detect(&frame)?.is_none());

    Ok(())
}

#[test]
#[ignore = "Requires pose ONNX model"]
fn test_detection_shape_when_gate_is_open() -> Result<()> {
    let thresholds = DetectorThresholds {
        min_detection_confidence: 0.0,
        min_tracking_confidence: 0.0,
    };
    let mut detector = OnnxPoseDetector::new(MODEL_PATH, thresholds)?;
    let frame = create_test_frame(360, 640, (90.0, 120.0, 150.0))?;

    let detection = detector.detect(&frame)?.expect("zero threshold accepts every frame");
    assert_eq!(detection.keypoints.len(), NUM_POSE_LANDMARKS);
    assert!((0.0..=1.0).contains(&detection.score));
    for keypoint in &detection.keypoints {
        assert!(keypoint.point.is_finite());
        assert!((0.0..=1.0).contains(&keypoint.visibility));
    }

    detector.reset();
    Ok(())
}
