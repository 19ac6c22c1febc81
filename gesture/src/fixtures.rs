//! Synthetic hands for tests in this crate and its dependents.
//!
//! Enabled for this crate's own tests and, elsewhere, through the `fixtures`
//! feature (a dev-dependency feature, never a release one).

use crate::consts::LANDMARKS_PER_HAND;
use crate::hands::{DetectedHand, Handedness};
use crate::landmark::{FINGER_CHAINS, Landmark};

/// Landmarks for a hand holding up its first `extended` fingers, thumb
/// first. Straight fingers bend 0°, the rest fold back 180°.
#[must_use]
pub fn hand_showing(extended: usize) -> Vec<Landmark> {
    let mut hand = vec![Landmark::new(0.5, 0.9, 0.0); LANDMARKS_PER_HAND];
    for (finger, chain) in (0_u8..).zip(FINGER_CHAINS) {
        let x = 0.3 + 0.1 * f64::from(finger);
        let tip_y = if usize::from(finger) < extended { 0.55 } else { 0.65 };
        let points = [
            Landmark::new(x, 0.7, 0.0),
            Landmark::new(x, 0.65, 0.0),
            Landmark::new(x, 0.6, 0.0),
            Landmark::new(x, tip_y, 0.0),
        ];
        for (idx, point) in chain.into_iter().zip(points) {
            if let Some(slot) = hand.get_mut(idx) {
                *slot = point;
            }
        }
    }
    hand
}

/// [`hand_showing`] wrapped as a detector result with the model's label.
#[must_use]
pub fn detected(handedness: Handedness, extended: usize) -> DetectedHand {
    DetectedHand { handedness, landmarks: hand_showing(extended) }
}
