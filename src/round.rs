//! Round controller — the game's state machine.
//!
//! DESIGN
//! ======
//! `RoundController` exclusively owns the `RoundState`. Every other part of
//! the game (tracking loop, scene, event subscribers) only sees copies. The
//! controller is synchronous and clock-free: the game driver decides *when*
//! to start a round, the controller decides *what* the round is and whether
//! the latest hand reading solves it.
//!
//! LIFECYCLE
//! =========
//! Idle → (`start_round`) → `RoundActive` → (`apply_digits` solves) → Solved
//! → (`start_round`) → `RoundActive` … There is no terminal state.
//!
//! SOLVE RULE
//! ==========
//! Both hands visible, `left + right == falling`, and one of the two hands
//! makes 10 with the carriage number. A missing hand never solves a round,
//! even when the remaining arithmetic happens to line up.

use std::path::Path;

use gesture::DigitPair;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Digits a carriage or falling number may take.
const PAIR_DIGIT_MIN: u8 = 5;
const PAIR_DIGIT_MAX: u8 = 9;

/// Allowed range for `carriage + falling`.
const PAIR_SUM_MIN: u8 = 11;
const PAIR_SUM_MAX: u8 = 17;

/// Largest digit a single hand can show.
const MAX_HAND_DIGIT: u8 = 5;

/// The number both hands work toward with the carriage.
const MAKE_TEN: u8 = 10;

/// Built-in pair table, as `(carriage, falling)`.
const DEFAULT_PAIRS: [(u8, u8); 10] =
    [(5, 6), (5, 7), (5, 8), (5, 9), (6, 7), (6, 8), (6, 9), (7, 6), (7, 8), (8, 7)];

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PairTableError {
    #[error("pair table is empty")]
    Empty,
    #[error("pair {index} ({carriage}, {falling}): digits must be distinct and within 5..=9")]
    DigitOutOfRange { index: usize, carriage: u8, falling: u8 },
    #[error("pair {index} ({carriage}, {falling}): sum must be within 11..=17")]
    SumOutOfRange { index: usize, carriage: u8, falling: u8 },
    #[error("pair {index} ({carriage}, {falling}) cannot be shown with two hands")]
    Unsolvable { index: usize, carriage: u8, falling: u8 },
    #[error("failed to read pair table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse pair table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// =============================================================================
// PAIR TABLE
// =============================================================================

/// One round's numbers: the carriage on the track and the number falling onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPair {
    pub carriage: u8,
    pub falling: u8,
}

impl RoundPair {
    #[must_use]
    pub fn new(carriage: u8, falling: u8) -> Self {
        Self { carriage, falling }
    }

    /// The digit one hand must show to make 10 with the carriage.
    #[must_use]
    pub fn complement(self) -> u8 {
        MAKE_TEN.saturating_sub(self.carriage)
    }
}

/// On-disk form of a pair table.
#[derive(Debug, Deserialize)]
struct PairTableFile {
    pairs: Vec<RoundPair>,
}

/// Validated set of pairs a round is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTable {
    pairs: Vec<RoundPair>,
}

impl Default for PairTable {
    fn default() -> Self {
        Self { pairs: DEFAULT_PAIRS.iter().map(|&(c, f)| RoundPair::new(c, f)).collect() }
    }
}

impl PairTable {
    /// Validate and wrap a list of pairs.
    ///
    /// # Errors
    ///
    /// Rejects an empty list and the first pair whose digits fall outside
    /// 5..=9, repeat, sum outside 11..=17, or cannot be solved by two hands.
    pub fn new(pairs: Vec<RoundPair>) -> Result<Self, PairTableError> {
        if pairs.is_empty() {
            return Err(PairTableError::Empty);
        }
        for (index, pair) in pairs.iter().enumerate() {
            validate_pair(index, *pair)?;
        }
        Ok(Self { pairs })
    }

    /// Parse a YAML document of the form `pairs: [{ carriage, falling }, …]`.
    ///
    /// # Errors
    ///
    /// Returns [`PairTableError::Parse`] for malformed YAML and any
    /// validation error from [`PairTable::new`].
    pub fn from_yaml(text: &str) -> Result<Self, PairTableError> {
        let file: PairTableFile = serde_yaml::from_str(text)?;
        Self::new(file.pairs)
    }

    /// Read and parse a YAML pair table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PairTableError::Io`] when the file cannot be read, plus
    /// anything [`PairTable::from_yaml`] rejects.
    pub async fn load(path: &Path) -> Result<Self, PairTableError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&text)
    }

    #[must_use]
    pub fn pairs(&self) -> &[RoundPair] {
        &self.pairs
    }

    /// Draw one pair uniformly at random.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> RoundPair {
        // Never empty: construction rejects empty tables.
        self.pairs[rng.random_range(0..self.pairs.len())]
    }
}

fn validate_pair(index: usize, pair: RoundPair) -> Result<(), PairTableError> {
    let RoundPair { carriage, falling } = pair;
    let digits = PAIR_DIGIT_MIN..=PAIR_DIGIT_MAX;
    if !digits.contains(&carriage) || !digits.contains(&falling) || carriage == falling {
        return Err(PairTableError::DigitOutOfRange { index, carriage, falling });
    }
    if !(PAIR_SUM_MIN..=PAIR_SUM_MAX).contains(&(carriage + falling)) {
        return Err(PairTableError::SumOutOfRange { index, carriage, falling });
    }
    // One hand shows the complement; the other must cover the rest.
    let complement = pair.complement();
    if complement > MAX_HAND_DIGIT || falling - complement > MAX_HAND_DIGIT {
        return Err(PairTableError::Unsolvable { index, carriage, falling });
    }
    Ok(())
}

// =============================================================================
// ROUND STATE
// =============================================================================

/// Everything the view needs to draw the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoundState {
    pub carriage_number: u8,
    pub falling_number: u8,
    pub left_digit: Option<u8>,
    pub right_digit: Option<u8>,
    pub round_index: u32,
}

impl RoundState {
    #[must_use]
    pub fn digits(&self) -> DigitPair {
        DigitPair::new(self.left_digit, self.right_digit)
    }

    /// Whether the recorded digits solve this round.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        is_solved(self.carriage_number, self.falling_number, self.digits())
    }
}

/// The solve rule. A missing hand never counts.
#[must_use]
pub fn is_solved(carriage: u8, falling: u8, digits: DigitPair) -> bool {
    let (Some(left), Some(right)) = (digits.left, digits.right) else {
        return false;
    };
    // Widen so out-of-range readings cannot overflow.
    let (left, right) = (u16::from(left), u16::from(right));
    let (carriage, falling, ten) = (u16::from(carriage), u16::from(falling), u16::from(MAKE_TEN));
    left + right == falling && (left + carriage == ten || right + carriage == ten)
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the first round to start.
    #[default]
    Idle,
    /// A round is on screen and hand readings are being checked.
    RoundActive,
    /// The last round was solved; the next one has not started yet.
    Solved,
}

/// What `apply_digits` did to the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Solved,
}

pub struct RoundController {
    table: PairTable,
    state: RoundState,
    phase: Phase,
}

impl RoundController {
    #[must_use]
    pub fn new(table: PairTable) -> Self {
        Self { table, state: RoundState::default(), phase: Phase::Idle }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> RoundState {
        self.state
    }

    #[must_use]
    pub fn table(&self) -> &PairTable {
        &self.table
    }

    /// Draw a fresh pair and start a round.
    ///
    /// Returns `None` while a round is already active.
    pub fn start_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<RoundState> {
        let pair = self.table.draw(rng);
        self.start_with(pair)
    }

    /// Start a round with a specific pair.
    ///
    /// Returns `None` while a round is already active.
    pub fn start_with(&mut self, pair: RoundPair) -> Option<RoundState> {
        if self.phase == Phase::RoundActive {
            return None;
        }
        self.state.carriage_number = pair.carriage;
        self.state.falling_number = pair.falling;
        self.state.left_digit = None;
        self.state.right_digit = None;
        self.phase = Phase::RoundActive;
        Some(self.state)
    }

    /// Record a hand reading and check it against the active round.
    pub fn apply_digits(&mut self, digits: DigitPair) -> Transition {
        self.state.left_digit = digits.left;
        self.state.right_digit = digits.right;

        if self.phase != Phase::RoundActive || !self.state.is_solved() {
            return Transition::None;
        }

        // The train carries the left hand's number into the next round.
        if let Some(left) = digits.left {
            self.state.carriage_number = left;
        }
        self.state.round_index += 1;
        self.phase = Phase::Solved;
        Transition::Solved
    }
}

#[cfg(test)]
#[path = "round_test.rs"]
mod tests;
