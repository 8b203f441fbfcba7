//! Center-of-mass estimation from a named landmark set and the subject's mass.

use crate::{
    landmarks::NamedLandmarkSet,
    segments::SegmentModel,
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Center of mass in normalized frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterOfMass {
    pub cm_x: f64,
    pub cm_y: f64,
    pub cm_z: f64,
}

impl CenterOfMass {
    /// Whether all three coordinates are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cm_x.is_finite() && self.cm_y.is_finite() && self.cm_z.is_finite()
    }

    /// Overlay label text, two decimals per axis
    #[must_use]
    pub fn label(&self) -> String {
        format!("X: {:.2}, Y: {:.2}, Z: {:.2}", self.cm_x, self.cm_y, self.cm_z)
    }
}

/// Person being analyzed; constant for a whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subject {
    mass_kg: f64,
}

impl Subject {
    /// Create a subject
    ///
    /// # Errors
    ///
    /// Returns an error if the mass is not a positive finite number
    pub fn new(mass_kg: f64) -> Result<Self> {
        validate_mass(mass_kg)?;
        Ok(Self { mass_kg })
    }

    /// Body mass in kilograms
    #[must_use]
    pub const fn mass_kg(&self) -> f64 {
        self.mass_kg
    }
}

fn validate_mass(mass_kg: f64) -> Result<()> {
    if mass_kg.is_finite() && mass_kg > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Subject mass must be a positive number of kilograms, got {mass_kg}"
        )))
    }
}

/// Stateless estimator over a segment model
#[derive(Debug, Clone, Default)]
pub struct CenterOfMassEstimator {
    model: SegmentModel,
}

impl CenterOfMassEstimator {
    /// Create an estimator for a segment model
    #[must_use]
    pub const fn new(model: SegmentModel) -> Self {
        Self { model }
    }

    /// Segment model in use
    #[must_use]
    pub const fn model(&self) -> &SegmentModel {
        &self.model
    }

    /// Estimate the center of mass.
    ///
    /// `cm_x` is the midpoint of the lateral-axis landmarks (the hips by
    /// default). `cm_y` and `cm_z` are the mass-weighted mean of the segment
    /// centers; segments without a center are left out of both the weighted
    /// sum and the total mass.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `mass_kg` is not positive and finite
    /// - a landmark the model reads is missing
    /// - the contributing mass fraction is not positive, which would otherwise
    ///   produce NaN
    pub fn estimate(&self, landmarks: &NamedLandmarkSet, mass_kg: f64) -> Result<CenterOfMass> {
        validate_mass(mass_kg)?;

        let axis = self.model.lateral_axis;
        let right = landmarks
            .get(axis.right)
            .ok_or_else(|| Error::Estimation(format!("Missing landmark {:?}", axis.right)))?;
        let left = landmarks
            .get(axis.left)
            .ok_or_else(|| Error::Estimation(format!("Missing landmark {:?}", axis.left)))?;
        let cm_x = (right.x + left.x) / 2.0;

        // Segment masses are fraction * mass_kg; mass_kg cancels in the mean
        let mut total_fraction: f64 = 0.0;
        let mut weighted_y = 0.0;
        let mut weighted_z = 0.0;
        for segment in &self.model.segments {
            let Some(center) = segment.center.resolve(landmarks)? else {
                continue;
            };
            total_fraction += segment.mass_fraction;
            weighted_y += center.y * segment.mass_fraction;
            weighted_z += center.z * segment.mass_fraction;
        }

        if !total_fraction.is_finite() || total_fraction <= 0.0 {
            return Err(Error::Estimation(format!(
                "Contributing mass fraction is {total_fraction}, cannot average"
            )));
        }

        let com = CenterOfMass {
            cm_x,
            cm_y: weighted_y / total_fraction,
            cm_z: weighted_z / total_fraction,
        };

        if !com.is_finite() {
            return Err(Error::Estimation(format!("Non-finite center of mass {com:?}")));
        }

        Ok(com)
    }

    /// Estimate for a validated subject
    ///
    /// # Errors
    ///
    /// See [`CenterOfMassEstimator::estimate`]
    pub fn estimate_for(&self, landmarks: &NamedLandmarkSet, subject: &Subject) -> Result<CenterOfMass> {
        self.estimate(landmarks, subject.mass_kg())
    }
}
