//! Finger-extension classifier.
//!
//! Each finger is four joints in a row. If the first bone and the last bone
//! point the same way the finger is straight; a curled finger folds the tip
//! back and the angle between the two segments opens up. Counting straight
//! fingers gives the digit a hand is showing.

#[cfg(test)]
#[path = "classify_test.rs"]
mod classify_test;

use crate::consts::{DEFAULT_EXTENSION_THRESHOLD_DEG, FINGER_COUNT, LANDMARKS_PER_HAND, MIN_SEGMENT_LENGTH};
use crate::landmark::{FINGER_CHAINS, Landmark};

/// Rejected landmark input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInputError {
    /// The slice does not hold one full hand.
    #[error("expected {expected} landmarks, found {found}")]
    LandmarkCount { expected: usize, found: usize },
    /// A coordinate is NaN or infinite.
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Angle in degrees between segment `a→b` and segment `c→d`.
///
/// Returns `None` when either segment has no length.
#[must_use]
pub fn segment_angle(a: Landmark, b: Landmark, c: Landmark, d: Landmark) -> Option<f64> {
    let (ux, uy) = a.to(b);
    let (vx, vy) = c.to(d);

    let mag_u = ux.hypot(uy);
    let mag_v = vx.hypot(vy);
    if mag_u < MIN_SEGMENT_LENGTH || mag_v < MIN_SEGMENT_LENGTH {
        return None;
    }

    let cos = ((ux * vx + uy * vy) / (mag_u * mag_v)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees().abs())
}

/// Counts extended fingers against a bend-angle threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    threshold_deg: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { threshold_deg: DEFAULT_EXTENSION_THRESHOLD_DEG }
    }
}

impl Classifier {
    #[must_use]
    pub fn new(threshold_deg: f64) -> Self {
        Self { threshold_deg }
    }

    #[must_use]
    pub fn threshold_deg(&self) -> f64 {
        self.threshold_deg
    }

    /// Bend angle per finger, thumb first. `None` marks a degenerate finger.
    ///
    /// # Errors
    ///
    /// See [`Classifier::classify`].
    pub fn finger_angles(&self, landmarks: &[Landmark]) -> Result<[Option<f64>; FINGER_COUNT], InvalidInputError> {
        validate(landmarks)?;

        let mut angles = [None; FINGER_COUNT];
        for (slot, [a, b, c, d]) in angles.iter_mut().zip(FINGER_CHAINS) {
            *slot = segment_angle(landmarks[a], landmarks[b], landmarks[c], landmarks[d]);
        }
        Ok(angles)
    }

    /// Whether a single bend angle counts as an extended finger.
    ///
    /// The comparison is strict: an angle equal to the threshold is curled.
    #[must_use]
    pub fn is_extended(&self, angle_deg: Option<f64>) -> bool {
        angle_deg.is_some_and(|a| a < self.threshold_deg)
    }

    /// Number of extended fingers on one hand, 0 through 5.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::LandmarkCount`] unless exactly 21
    /// landmarks are given, and [`InvalidInputError::NonFinite`] for the
    /// first landmark holding a NaN or infinite coordinate.
    pub fn classify(&self, landmarks: &[Landmark]) -> Result<u8, InvalidInputError> {
        let angles = self.finger_angles(landmarks)?;
        let extended = angles.iter().filter(|a| self.is_extended(**a)).count();
        // At most FINGER_COUNT, so the narrowing is lossless.
        Ok(u8::try_from(extended).unwrap_or(u8::MAX))
    }
}

/// Classify with the default 25° threshold.
///
/// # Errors
///
/// See [`Classifier::classify`].
pub fn classify_digit(landmarks: &[Landmark]) -> Result<u8, InvalidInputError> {
    Classifier::default().classify(landmarks)
}

fn validate(landmarks: &[Landmark]) -> Result<(), InvalidInputError> {
    if landmarks.len() != LANDMARKS_PER_HAND {
        return Err(InvalidInputError::LandmarkCount { expected: LANDMARKS_PER_HAND, found: landmarks.len() });
    }
    if let Some(index) = landmarks.iter().position(|p| !p.is_finite()) {
        return Err(InvalidInputError::NonFinite { index });
    }
    Ok(())
}
