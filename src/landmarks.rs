//! Pose landmark types and extraction of the named subset used for
//! center-of-mass estimation.

use crate::constants::NUM_POSE_LANDMARKS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 3-D point in normalized frame coordinates.
///
/// `x` and `y` are relative to frame width and height; `z` is a relative depth
/// on roughly the same scale as `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    /// Create a landmark from its coordinates
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point halfway between two landmarks
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }

    /// Whether all three coordinates are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Full-body pose landmark indices (33 total, BlazePose topology)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// All landmarks in model output order
    pub const ALL: [Self; NUM_POSE_LANDMARKS] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Position of this landmark in the model output
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Landmark at a model output position
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Skeleton edges of the 33-point topology, drawn by the annotator
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

/// One landmark as reported by the pose model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseKeypoint {
    /// Normalized position
    pub point: Landmark,
    /// Probability that the point is visible in the frame
    pub visibility: f32,
}

/// Raw result of one successful pose-model call
#[derive(Debug, Clone, PartialEq)]
pub struct PoseDetection {
    /// Keypoints in `PoseLandmark::ALL` order
    pub keypoints: Vec<PoseKeypoint>,
    /// Overall person-presence score
    pub score: f32,
}

impl PoseDetection {
    /// Keypoint for a named landmark, if the result contains it
    #[must_use]
    pub fn keypoint(&self, landmark: PoseLandmark) -> Option<&PoseKeypoint> {
        self.keypoints.get(landmark.index())
    }
}

/// Landmarks required by the default segment model
pub const REQUIRED_LANDMARKS: [PoseLandmark; 6] = [
    PoseLandmark::Nose,
    PoseLandmark::RightHip,
    PoseLandmark::LeftHip,
    PoseLandmark::RightShoulder,
    PoseLandmark::RightElbow,
    PoseLandmark::RightKnee,
];

/// Mapping from anatomical label to landmark for a single frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedLandmarkSet {
    points: BTreeMap<PoseLandmark, Landmark>,
}

impl NamedLandmarkSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a landmark
    pub fn insert(&mut self, name: PoseLandmark, point: Landmark) {
        self.points.insert(name, point);
    }

    /// Look up a landmark by name
    #[must_use]
    pub fn get(&self, name: PoseLandmark) -> Option<&Landmark> {
        self.points.get(&name)
    }

    /// Whether every listed landmark is present
    #[must_use]
    pub fn contains_all(&self, names: &[PoseLandmark]) -> bool {
        names.iter().all(|name| self.points.contains_key(name))
    }

    /// Number of landmarks in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<(PoseLandmark, Landmark)> for NamedLandmarkSet {
    fn from_iter<I: IntoIterator<Item = (PoseLandmark, Landmark)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Extracts the named landmark subset from a pose-model result.
///
/// Fails closed: a truncated result or a non-finite required coordinate is
/// reported as "no detection" rather than as an error.
#[derive(Debug, Clone)]
pub struct LandmarkAdapter {
    required: Vec<PoseLandmark>,
}

impl Default for LandmarkAdapter {
    fn default() -> Self {
        Self::new(REQUIRED_LANDMARKS.to_vec())
    }
}

impl LandmarkAdapter {
    /// Create an adapter extracting the given landmarks
    #[must_use]
    pub fn new(mut required: Vec<PoseLandmark>) -> Self {
        required.sort_unstable();
        required.dedup();
        Self { required }
    }

    /// Landmarks this adapter extracts
    #[must_use]
    pub fn required(&self) -> &[PoseLandmark] {
        &self.required
    }

    /// Extract the required landmarks, or `None` when the result is unusable
    #[must_use]
    pub fn extract(&self, detection: &PoseDetection) -> Option<NamedLandmarkSet> {
        if detection.keypoints.len() < NUM_POSE_LANDMARKS {
            log::debug!(
                "Pose result has {} keypoints, expected {}",
                detection.keypoints.len(),
                NUM_POSE_LANDMARKS
            );
            return None;
        }

        let mut set = NamedLandmarkSet::new();
        for &name in &self.required {
            let keypoint = detection.keypoint(name)?;
            if !keypoint.point.is_finite() {
                log::debug!("Landmark {name:?} has non-finite coordinates");
                return None;
            }
            set.insert(name, keypoint.point);
        }
        Some(set)
    }
}
