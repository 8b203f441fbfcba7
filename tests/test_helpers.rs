//! Helper functions and test doubles for integration tests

#![allow(dead_code)]

use com_overlay::{
    constants::NUM_POSE_LANDMARKS,
    landmarks::{Landmark, NamedLandmarkSet, PoseDetection, PoseKeypoint, PoseLandmark},
    pose_detector::PoseDetector,
    video::{ChannelOrder, FrameSink, FrameSource, SourceMetadata},
    Error, Result,
};
use opencv::{
    core::{Mat, Scalar, Size, Vec3b, CV_8UC3},
    prelude::*,
};
use std::collections::VecDeque;

/// Create a solid 8-bit 3-channel frame
pub fn create_test_frame(height: i32, width: i32, color: (f64, f64, f64)) -> Result<Mat> {
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::new(color.0, color.1, color.2, 0.0))
        .map_err(Into::into)
}

/// Raw bytes of a frame, for byte-identical comparisons
pub fn frame_bytes(frame: &Mat) -> Vec<u8> {
    frame.try_clone().unwrap().data_bytes().unwrap().to_vec()
}

/// Pixel at (x, y)
pub fn pixel(frame: &Mat, x: i32, y: i32) -> [u8; 3] {
    let px = *frame.at_2d::<Vec3b>(y, x).unwrap();
    [px[0], px[1], px[2]]
}

/// Reference standing pose
pub fn reference_pose() -> Vec<(PoseLandmark, Landmark)> {
    vec![
        (PoseLandmark::Nose, Landmark::new(0.5, 0.1, 0.0)),
        (PoseLandmark::RightHip, Landmark::new(0.45, 0.5, 0.0)),
        (PoseLandmark::LeftHip, Landmark::new(0.55, 0.5, 0.0)),
        (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.2, 0.0)),
        (PoseLandmark::RightElbow, Landmark::new(0.35, 0.35, 0.0)),
        (PoseLandmark::RightKnee, Landmark::new(0.45, 0.8, 0.0)),
    ]
}

/// `cm_y` of the reference pose under the default segment model
pub fn reference_cm_y() -> f64 {
    (0.08 * 0.1 + 0.50 * 0.5 + 0.03 * 0.275 + 0.10 * 0.65) / 0.71
}

pub fn reference_landmarks() -> NamedLandmarkSet {
    reference_pose().into_iter().collect()
}

/// A full 33-point detection: reference pose for the named points, the
/// frame center for the rest, all with the given visibility
pub fn full_detection(visibility: f32) -> PoseDetection {
    let mut keypoints = vec![
        PoseKeypoint {
            point: Landmark::new(0.5, 0.5, 0.0),
            visibility,
        };
        NUM_POSE_LANDMARKS
    ];
    for (name, point) in reference_pose() {
        keypoints[name.index()].point = point;
    }
    PoseDetection { keypoints, score: 0.95 }
}

/// What the scripted detector does on one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Person,
    Nobody,
    Fail,
    /// A pose whose right hip is not a number
    Malformed,
}

/// Detector replaying a fixed script, then reporting nobody
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: VecDeque<Step>,
    /// Top-left pixel of every frame it was shown
    pub seen: Vec<[u8; 3]>,
    pub resets: usize,
}

impl ScriptedDetector {
    pub fn new(script: &[Step]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl PoseDetector for ScriptedDetector {
    fn detect(&mut self, rgb_frame: &Mat) -> Result<Option<PoseDetection>> {
        self.seen.push(pixel(rgb_frame, 0, 0));
        match self.script.pop_front().unwrap_or(Step::Nobody) {
            Step::Person => Ok(Some(full_detection(0.9))),
            Step::Nobody => Ok(None),
            Step::Fail => Err(Error::ModelOutputError("scripted failure".to_string())),
            Step::Malformed => {
                let mut detection = full_detection(0.9);
                detection.keypoints[PoseLandmark::RightHip.index()].point = Landmark::new(f64::NAN, 0.5, 0.0);
                Ok(Some(detection))
            }
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

pub fn file_metadata(width: i32, height: i32, fps: f64, frame_count: u64) -> SourceMetadata {
    SourceMetadata {
        fourcc: i32::from_le_bytes(*b"avc1"),
        fps,
        width,
        height,
        pixel_format: Some("I420".to_string()),
        frame_count: Some(frame_count),
        live: false,
        channel_order: ChannelOrder::Bgr,
    }
}

/// In-memory frame source
pub struct MemorySource {
    metadata: SourceMetadata,
    frames: VecDeque<Mat>,
    /// Fail instead of reporting end of stream
    pub fail_at_end: bool,
    pub reads: usize,
}

impl MemorySource {
    pub fn new(metadata: SourceMetadata, frames: Vec<Mat>) -> Self {
        Self {
            metadata,
            frames: frames.into(),
            fail_at_end: false,
            reads: 0,
        }
    }

    /// `count` solid BGR frames matching the metadata size
    pub fn solid(metadata: SourceMetadata, count: usize, bgr: (f64, f64, f64)) -> Self {
        let frames = (0..count)
            .map(|_| create_test_frame(metadata.height, metadata.width, bgr).unwrap())
            .collect();
        Self::new(metadata, frames)
    }
}

impl FrameSource for MemorySource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read(&mut self) -> Result<Option<Mat>> {
        self.reads += 1;
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.fail_at_end => Err(Error::Decode("scripted decode failure".to_string())),
            None => Ok(None),
        }
    }
}

/// In-memory frame sink configured like a file encoder
pub struct MemorySink {
    pub fourcc: i32,
    pub fps: f64,
    pub frame_size: Size,
    pub frames: Vec<Mat>,
    pub finished: bool,
    pub aborted: bool,
    /// Request a stop after this many frames
    pub stop_after: Option<usize>,
    pub fail_finish: bool,
}

impl MemorySink {
    /// Open a sink with the source's codec, frame rate and size
    pub fn for_source(metadata: &SourceMetadata) -> Self {
        Self {
            fourcc: metadata.fourcc,
            fps: metadata.fps,
            frame_size: Size::new(metadata.width, metadata.height),
            frames: Vec::new(),
            finished: false,
            aborted: false,
            stop_after: None,
            fail_finish: false,
        }
    }
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        if frame.size()? != self.frame_size {
            return Err(Error::FrameProcessing("frame size mismatch".to_string()));
        }
        self.frames.push(frame.try_clone()?);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.fail_finish {
            self.frames.clear();
            return Err(Error::Finalize("scripted flush failure".to_string()));
        }
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.aborted = true;
    }

    fn stop_requested(&self) -> bool {
        self.stop_after.is_some_and(|n| self.frames.len() >= n)
    }
}
