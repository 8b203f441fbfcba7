//! Segmental mass model: which body segments contribute to the center of
//! mass, how heavy each is relative to the whole body, and where its center
//! lies in terms of pose landmarks.

use crate::{
    constants::{
        HEAD_MASS_FRACTION, LOWER_ARM_MASS_FRACTION, LOWER_LEG_MASS_FRACTION, THIGH_MASS_FRACTION,
        TORSO_MASS_FRACTION, UPPER_ARM_MASS_FRACTION,
    },
    landmarks::{Landmark, NamedLandmarkSet, PoseLandmark},
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Rule locating a segment's center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentCenter {
    /// Center coincides with one landmark
    Landmark { landmark: PoseLandmark },
    /// Center is halfway between two landmarks
    Midpoint { from: PoseLandmark, to: PoseLandmark },
    /// Segment has a mass fraction but no center; it does not contribute
    Unassigned,
}

impl SegmentCenter {
    /// Landmarks this rule reads
    #[must_use]
    pub fn landmarks(&self) -> Vec<PoseLandmark> {
        match *self {
            Self::Landmark { landmark } => vec![landmark],
            Self::Midpoint { from, to } => vec![from, to],
            Self::Unassigned => Vec::new(),
        }
    }

    /// Resolve the center for one frame.
    ///
    /// Returns `Ok(None)` for unassigned segments.
    ///
    /// # Errors
    ///
    /// Returns an error if a landmark the rule needs is missing from the set
    pub fn resolve(&self, landmarks: &NamedLandmarkSet) -> Result<Option<Landmark>> {
        let lookup = |name: PoseLandmark| {
            landmarks
                .get(name)
                .copied()
                .ok_or_else(|| Error::Estimation(format!("Missing landmark {name:?}")))
        };

        match *self {
            Self::Landmark { landmark } => Ok(Some(lookup(landmark)?)),
            Self::Midpoint { from, to } => Ok(Some(lookup(from)?.midpoint(&lookup(to)?))),
            Self::Unassigned => Ok(None),
        }
    }
}

/// A body segment with its share of total body mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub mass_fraction: f64,
    pub center: SegmentCenter,
}

impl Segment {
    /// Create a segment
    pub fn new(name: impl Into<String>, mass_fraction: f64, center: SegmentCenter) -> Self {
        Self {
            name: name.into(),
            mass_fraction,
            center,
        }
    }

    /// Whether this segment has a center and so contributes to the estimate
    #[must_use]
    pub fn contributes(&self) -> bool {
        self.center != SegmentCenter::Unassigned
    }
}

/// Landmark pair whose midpoint gives the lateral (x) coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateralAxis {
    pub right: PoseLandmark,
    pub left: PoseLandmark,
}

impl Default for LateralAxis {
    fn default() -> Self {
        Self {
            right: PoseLandmark::RightHip,
            left: PoseLandmark::LeftHip,
        }
    }
}

/// Segment table plus the lateral-axis landmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentModel {
    pub lateral_axis: LateralAxis,
    pub segments: Vec<Segment>,
}

impl Default for SegmentModel {
    /// Six-segment table sampled on the right side of the body.
    ///
    /// `lower_arm` and `lower_leg` carry fractions but no center, so the
    /// contributing total is 0.71 of body mass.
    fn default() -> Self {
        Self {
            lateral_axis: LateralAxis::default(),
            segments: vec![
                Segment::new(
                    "head",
                    HEAD_MASS_FRACTION,
                    SegmentCenter::Landmark {
                        landmark: PoseLandmark::Nose,
                    },
                ),
                Segment::new(
                    "torso",
                    TORSO_MASS_FRACTION,
                    SegmentCenter::Landmark {
                        landmark: PoseLandmark::RightHip,
                    },
                ),
                Segment::new(
                    "upper_arm",
                    UPPER_ARM_MASS_FRACTION,
                    SegmentCenter::Midpoint {
                        from: PoseLandmark::RightShoulder,
                        to: PoseLandmark::RightElbow,
                    },
                ),
                Segment::new("lower_arm", LOWER_ARM_MASS_FRACTION, SegmentCenter::Unassigned),
                Segment::new(
                    "thigh",
                    THIGH_MASS_FRACTION,
                    SegmentCenter::Midpoint {
                        from: PoseLandmark::RightHip,
                        to: PoseLandmark::RightKnee,
                    },
                ),
                Segment::new("lower_leg", LOWER_LEG_MASS_FRACTION, SegmentCenter::Unassigned),
            ],
        }
    }
}

impl SegmentModel {
    /// Segments that have a center
    pub fn contributing(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|segment| segment.contributes())
    }

    /// Sum of mass fractions over contributing segments
    #[must_use]
    pub fn contributing_fraction(&self) -> f64 {
        self.contributing().map(|segment| segment.mass_fraction).sum()
    }

    /// Every landmark the estimate reads, sorted and deduplicated
    #[must_use]
    pub fn required_landmarks(&self) -> Vec<PoseLandmark> {
        let mut required = vec![self.lateral_axis.right, self.lateral_axis.left];
        for segment in &self.segments {
            required.extend(segment.center.landmarks());
        }
        required.sort_unstable();
        required.dedup();
        required
    }

    /// Look up a segment by name
    #[must_use]
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.name == name)
    }

    /// Validate the table
    ///
    /// # Errors
    ///
    /// Returns an error if a fraction is negative or non-finite, or if no
    /// segment with a center carries positive mass
    pub fn validate(&self) -> Result<()> {
        for segment in &self.segments {
            if !segment.mass_fraction.is_finite() || segment.mass_fraction < 0.0 {
                return Err(Error::ConfigError(format!(
                    "Segment '{}' has invalid mass fraction {}",
                    segment.name, segment.mass_fraction
                )));
            }
        }

        if self.contributing_fraction() <= 0.0 {
            return Err(Error::ConfigError(
                "Segment model needs at least one segment with a center and positive mass".to_string(),
            ));
        }

        Ok(())
    }
}
