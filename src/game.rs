//! Game driver — owns the round and reacts to hand readings and timers.
//!
//! DESIGN
//! ======
//! A single task owns the `RoundController`, so round state needs no locks.
//! It `select!`s over four things: the one-shot startup delay, the pending
//! advance deadline (if any), incoming `DigitPair`s, and shutdown.
//!
//! TIMERS
//! ======
//! At most one advance deadline exists. Arming a new one replaces the old,
//! so two solves in a row can never start two rounds.
//!
//! EVENTS
//! ======
//! Every state change is broadcast as a `GameEvent` for anything that wants
//! to follow along. Sending with no subscribers is not an error.

use std::pin::Pin;
use std::sync::Arc;

use gesture::DigitPair;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Sleep;
use tracing::{debug, info};

use crate::config::RoundTiming;
use crate::round::{PairTable, RoundController, RoundState, Transition};
use crate::scene::{Readout, Scene};

const EVENT_CAPACITY: usize = 64;

/// Broadcast whenever the round changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "state", rename_all = "snake_case")]
pub enum GameEvent {
    RoundStarted(RoundState),
    DigitsChanged(RoundState),
    RoundSolved(RoundState),
}

pub struct Game {
    controller: RoundController,
    timing: RoundTiming,
    rng: StdRng,
    scene: Arc<dyn Scene>,
    events: broadcast::Sender<GameEvent>,
}

impl Game {
    /// A game drawing from `table`. A `seed` makes the pair sequence repeatable.
    #[must_use]
    pub fn new(table: PairTable, timing: RoundTiming, seed: Option<u64>, scene: Arc<dyn Scene>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = RoundController::new(table);
        debug!(pairs = controller.table().pairs().len(), seeded = seed.is_some(), "game created");
        Self { controller, timing, rng, scene, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Drive rounds until shutdown or until tracking stops sending.
    ///
    /// Returns the final round state.
    pub async fn run(mut self, mut updates: mpsc::Receiver<DigitPair>, mut shutdown: watch::Receiver<bool>) -> RoundState {
        let startup = tokio::time::sleep(self.timing.startup_delay);
        tokio::pin!(startup);
        let mut started = false;
        let mut advance: Option<Pin<Box<Sleep>>> = None;

        info!(startup_ms = self.timing.startup_delay.as_millis(), "game waiting for first round");

        loop {
            if *shutdown.borrow() {
                info!("shutdown requested; stopping game");
                break;
            }
            tokio::select! {
                () = &mut startup, if !started => {
                    started = true;
                    self.begin_round();
                }
                () = wait_for(&mut advance) => {
                    advance = None;
                    self.begin_round();
                }
                update = updates.recv() => {
                    let Some(digits) = update else {
                        info!("digit updates closed; stopping game");
                        break;
                    };
                    if self.on_digits(digits) == Transition::Solved {
                        advance = Some(Box::pin(tokio::time::sleep(self.timing.advance_delay)));
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let state = self.controller.state();
        info!(round_index = state.round_index, carriage = state.carriage_number, "game stopped");
        state
    }

    fn begin_round(&mut self) {
        let Some(state) = self.controller.start_round(&mut self.rng) else {
            debug!(phase = ?self.controller.phase(), "round already active; not starting another");
            return;
        };
        info!(
            round_index = state.round_index,
            carriage = state.carriage_number,
            falling = state.falling_number,
            "round started"
        );
        self.scene.show_round(&state);
        self.emit(GameEvent::RoundStarted(state));
    }

    fn on_digits(&mut self, digits: DigitPair) -> Transition {
        let before = self.controller.state().digits();
        let transition = self.controller.apply_digits(digits);
        let state = self.controller.state();

        self.scene.show_readout(&Readout::from(&state));
        if state.digits() != before {
            self.emit(GameEvent::DigitsChanged(state));
        }

        if transition == Transition::Solved {
            info!(
                round_index = state.round_index,
                carriage = state.carriage_number,
                advance_ms = self.timing.advance_delay.as_millis(),
                "round solved"
            );
            self.scene.play_resolved(&state);
            self.emit(GameEvent::RoundSolved(state));
        }
        transition
    }

    fn emit(&self, event: GameEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Wait on the advance deadline, or forever when none is armed.
async fn wait_for(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
