//! Detector results and the per-frame digit reading.
//!
//! The camera preview is mirrored, so the model's idea of "left" is the
//! player's right hand. [`read_digits`] applies that swap once, here, so the
//! rest of the game only ever sees the player's point of view.

#[cfg(test)]
#[path = "hands_test.rs"]
mod hands_test;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::{Classifier, InvalidInputError};
use crate::landmark::{HAND_CONNECTIONS, Landmark};

/// Handedness label as reported by the landmark model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// The opposite label; converts between camera and player views.
    #[must_use]
    pub fn mirrored(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// One hand found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
    pub handedness: Handedness,
    pub landmarks: Vec<Landmark>,
}

impl DetectedHand {
    /// Skeleton segments for the overlay. Bones with a missing endpoint are
    /// left out, so a short landmark list still draws what it has.
    pub fn bones(&self) -> impl Iterator<Item = (Landmark, Landmark)> + '_ {
        HAND_CONNECTIONS
            .iter()
            .filter_map(|&(from, to)| Some((*self.landmarks.get(from)?, *self.landmarks.get(to)?)))
    }
}

/// Everything the detector reported for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub hands: Vec<DetectedHand>,
}

impl Detection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

/// Digits shown by the player's two hands. `None` means no hand was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DigitPair {
    pub left: Option<u8>,
    pub right: Option<u8>,
}

impl DigitPair {
    #[must_use]
    pub fn new(left: Option<u8>, right: Option<u8>) -> Self {
        Self { left, right }
    }

    /// Both hands visible with the given digits.
    #[must_use]
    pub fn both(left: u8, right: u8) -> Self {
        Self { left: Some(left), right: Some(right) }
    }

    /// Build from the signed readout form; any negative digit means no hand.
    #[must_use]
    pub fn from_signed(left: i8, right: i8) -> Self {
        Self { left: unsigned(left), right: unsigned(right) }
    }

    /// Digit for one side of the player.
    #[must_use]
    pub fn side(&self, side: Handedness) -> Option<u8> {
        match side {
            Handedness::Left => self.left,
            Handedness::Right => self.right,
        }
    }

    /// Signed readout form: `-1` stands in for a missing hand.
    #[must_use]
    pub fn as_signed(&self) -> (i8, i8) {
        (signed(self.left), signed(self.right))
    }

    fn set(&mut self, side: Handedness, digit: Option<u8>) {
        match side {
            Handedness::Left => self.left = digit,
            Handedness::Right => self.right = digit,
        }
    }
}

impl fmt::Display for DigitPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (left, right) = self.as_signed();
        write!(f, "left {left} | right {right}")
    }
}

fn unsigned(digit: i8) -> Option<u8> {
    (digit >= 0).then_some(digit.unsigned_abs())
}

fn signed(digit: Option<u8>) -> i8 {
    digit.map_or(-1, |d| i8::try_from(d).unwrap_or(i8::MAX))
}

/// Classify every hand in `detection` and map it onto the player's sides.
///
/// When two hands carry the same label the later one wins.
///
/// # Errors
///
/// Returns the first [`InvalidInputError`] raised by the classifier.
pub fn read_digits(detection: &Detection, classifier: &Classifier) -> Result<DigitPair, InvalidInputError> {
    let mut pair = DigitPair::default();
    for hand in &detection.hands {
        let digit = classifier.classify(&hand.landmarks)?;
        pair.set(hand.handedness.mirrored(), Some(digit));
    }
    Ok(pair)
}

/// Like [`read_digits`], but a malformed hand only blanks its own side.
///
/// Returns the pair together with any per-hand errors, in detection order.
#[must_use]
pub fn read_digits_lenient(detection: &Detection, classifier: &Classifier) -> (DigitPair, Vec<InvalidInputError>) {
    let mut pair = DigitPair::default();
    let mut errors = Vec::new();
    for hand in &detection.hands {
        let side = hand.handedness.mirrored();
        match classifier.classify(&hand.landmarks) {
            Ok(digit) => pair.set(side, Some(digit)),
            Err(e) => {
                pair.set(side, None);
                errors.push(e);
            }
        }
    }
    (pair, errors)
}
