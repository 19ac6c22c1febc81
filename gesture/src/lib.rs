//! Hand-gesture reading for the number train game.
//!
//! The landmark model hands us 21 normalized keypoints per detected hand. This
//! crate turns those keypoints into the one thing the game cares about: how
//! many fingers each of the player's hands is holding up. It is pure and
//! synchronous so that the tracking loop, tests, and any future front end can
//! share it without pulling in a runtime.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`landmark`] | Landmark points, index constants, and finger chains |
//! | [`classify`] | Bend-angle math and the finger-extension [`classify::Classifier`] |
//! | [`hands`] | Detector results, handedness mirroring, and [`hands::DigitPair`] |
//! | [`consts`] | Shared numeric constants (threshold, landmark count) |
//! | `fixtures` | Synthetic hands for tests (`fixtures` feature) |

pub mod classify;
pub mod consts;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod hands;
pub mod landmark;

pub use classify::{Classifier, InvalidInputError, classify_digit, segment_angle};
pub use hands::{DetectedHand, Detection, DigitPair, Handedness, read_digits, read_digits_lenient};
pub use landmark::Landmark;
