//! Shared numeric constants for the gesture crate.

// ── Landmarks ───────────────────────────────────────────────────

/// Keypoints reported per hand by the landmark model.
pub const LANDMARKS_PER_HAND: usize = 21;

/// Fingers per hand, thumb included.
pub const FINGER_COUNT: usize = 5;

// ── Classification ──────────────────────────────────────────────

/// A finger is extended when its bend angle is strictly below this, in degrees.
pub const DEFAULT_EXTENSION_THRESHOLD_DEG: f64 = 25.0;

/// Segments shorter than this have no usable direction.
pub const MIN_SEGMENT_LENGTH: f64 = 1e-9;
