//! Presentation seam — the 3D scene, camera overlay, and text readout.
//!
//! DESIGN
//! ======
//! The renderer is an external black box. The game only ever *tells* it what
//! happened through `Scene`; nothing flows back. `LogScene` is the headless
//! implementation used by the binary: it renders every call as a structured
//! log line.

use std::fmt;

use gesture::{Detection, DigitPair};
use tracing::{debug, error, info, trace};

use crate::assets::AssetError;
use crate::round::RoundState;

// =============================================================================
// READOUT
// =============================================================================

/// The text line under the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readout {
    pub carriage: u8,
    pub falling: u8,
    pub digits: DigitPair,
}

impl From<&RoundState> for Readout {
    fn from(state: &RoundState) -> Self {
        Self { carriage: state.carriage_number, falling: state.falling_number, digits: state.digits() }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "carriage {} | falling {} | {}", self.carriage, self.falling, self.digits)
    }
}

// =============================================================================
// SCENE
// =============================================================================

/// Everything the game asks of the view layer.
pub trait Scene: Send + Sync {
    /// A new round is on screen.
    fn show_round(&self, state: &RoundState);

    /// Refresh the text readout.
    fn show_readout(&self, readout: &Readout);

    /// Draw each hand's skeleton ([`gesture::DetectedHand::bones`]) over the
    /// camera preview.
    fn draw_overlay(&self, detection: &Detection);

    /// Play the "resolved" animation cue for a solved round.
    fn play_resolved(&self, state: &RoundState);

    /// Surface an asset loading failure to the player.
    fn show_load_failed(&self, err: &AssetError);
}

/// Headless scene that renders to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogScene;

impl Scene for LogScene {
    fn show_round(&self, state: &RoundState) {
        info!(
            round_index = state.round_index,
            carriage = state.carriage_number,
            falling = state.falling_number,
            "round on screen"
        );
    }

    fn show_readout(&self, readout: &Readout) {
        debug!(%readout, "readout");
    }

    fn draw_overlay(&self, detection: &Detection) {
        for hand in &detection.hands {
            let mut bones = 0_usize;
            for (from, to) in hand.bones() {
                trace!(from_x = from.x, from_y = from.y, to_x = to.x, to_y = to.y, "overlay bone");
                bones += 1;
            }
            debug!(handedness = ?hand.handedness, points = hand.landmarks.len(), bones, "overlay: hand skeleton");
        }
    }

    fn play_resolved(&self, state: &RoundState) {
        info!(round_index = state.round_index, carriage = state.carriage_number, "resolved animation");
    }

    fn show_load_failed(&self, err: &AssetError) {
        error!(error = %err, "scene assets failed to load; continuing without 3D view");
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "scene_test.rs"]
mod tests;
