//! Human center-of-mass estimation from pose landmarks, rendered onto video.
//!
//! This library estimates a subject's 3-D center of mass (CoM) on every frame
//! of a video file or live camera using:
//! - ONNX Runtime for the full-body pose landmark model
//! - `OpenCV` for decoding, encoding, drawing and display
//! - A configurable segmental mass model
//!
//! Each frame goes through:
//! 1. Pose detection (zero or one person)
//! 2. Extraction of the landmarks the segment model needs
//! 3. Mass-weighted CoM estimation
//! 4. Drawing of the skeleton, CoM marker and coordinate label
//! 5. Encoding with the source's codec and frame rate, or display
//!
//! # Examples
//!
//! ## Estimating a Center of Mass
//!
//! ```
//! use com_overlay::{
//!     center_of_mass::CenterOfMassEstimator,
//!     landmarks::{Landmark, NamedLandmarkSet, PoseLandmark},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let landmarks: NamedLandmarkSet = [
//!     (PoseLandmark::Nose, Landmark::new(0.5, 0.1, 0.0)),
//!     (PoseLandmark::RightHip, Landmark::new(0.45, 0.5, 0.0)),
//!     (PoseLandmark::LeftHip, Landmark::new(0.55, 0.5, 0.0)),
//!     (PoseLandmark::RightShoulder, Landmark::new(0.4, 0.2, 0.0)),
//!     (PoseLandmark::RightElbow, Landmark::new(0.35, 0.35, 0.0)),
//!     (PoseLandmark::RightKnee, Landmark::new(0.45, 0.8, 0.0)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let com = CenterOfMassEstimator::default().estimate(&landmarks, 70.0)?;
//! assert!((com.cm_x - 0.5).abs() < 1e-9);
//! println!("{}", com.label());
//! # Ok(())
//! # }
//! ```
//!
//! ## Annotating a Video File
//!
//! ```no_run
//! use com_overlay::{
//!     annotator::FrameAnnotator,
//!     center_of_mass::{CenterOfMassEstimator, Subject},
//!     pipeline::{StopSignal, StreamPipeline},
//!     pose_detector::{DetectorThresholds, OnnxPoseDetector},
//!     video::{FileSink, FileSource, FrameSource},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = OnnxPoseDetector::new("assets/pose_landmark_full.onnx", DetectorThresholds::default())?;
//! let mut pipeline = StreamPipeline::new(
//!     detector,
//!     CenterOfMassEstimator::default(),
//!     FrameAnnotator::default(),
//!     Subject::new(70.0)?,
//! );
//!
//! let mut source = FileSource::open("jump.mp4")?;
//! let mut sink = FileSink::create("jump_com.mp4", source.metadata())?;
//! let summary = pipeline.run(&mut source, &mut sink, &StopSignal::new())?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

/// Pose landmark types and the named-landmark adapter
pub mod landmarks;

/// Segmental mass model
pub mod segments;

/// Center-of-mass estimation
pub mod center_of_mass;

/// Pose model capability and the ONNX implementation
pub mod pose_detector;

/// Skeleton and CoM overlay drawing
pub mod annotator;

/// Video file, camera and display adapters
pub mod video;

/// Per-frame processing pipeline
pub mod pipeline;

/// Utility functions for image processing and coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
