mod assets;
mod config;
mod game;
mod replay;
mod round;
mod scene;
mod tracking;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::assets::AssetManifest;
use crate::config::GameConfig;
use crate::game::{Game, GameEvent};
use crate::replay::{ReplayLoader, ReplayRecording, ReplaySource};
use crate::round::PairTable;
use crate::scene::{LogScene, Scene};
use crate::tracking::{TrackingSetup, spawn_tracking};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => warn!(error = %e, "failed to read .env"),
    }

    let config = match GameConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let table = match &config.pair_table_path {
        Some(path) => match PairTable::load(path).await {
            Ok(table) => {
                info!(path = %path.display(), pairs = table.pairs().len(), "pair table loaded");
                table
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "pair table rejected");
                return ExitCode::FAILURE;
            }
        },
        None => PairTable::default(),
    };

    let scene: Arc<dyn Scene> = Arc::new(LogScene);

    // Non-fatal: the game runs without the 3D view.
    if let Err(e) = AssetManifest::under(&config.asset_root).verify().await {
        scene.show_load_failed(&e);
    }

    let recording = match ReplayRecording::load(&config.replay_path).await {
        Ok(recording) => Arc::new(recording),
        Err(e) => {
            error!(path = %config.replay_path.display(), error = %e, "replay recording unavailable");
            return ExitCode::FAILURE;
        }
    };

    let (predictions_tx, predictions_rx) = watch::channel(true);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (updates_tx, updates_rx) = mpsc::channel(config.tracking.update_queue_capacity);

    let game = Game::new(table, config.timing, config.seed, Arc::clone(&scene));
    tokio::spawn(log_events(game.subscribe()));

    let setup = TrackingSetup {
        loader: Arc::new(ReplayLoader::new(Arc::clone(&recording))),
        source: Box::new(ReplaySource::new(&recording)),
        scene,
        config: config.tracking,
    };
    let tracking = spawn_tracking(setup, predictions_rx, shutdown_rx.clone(), updates_tx);
    let mut game_task = tokio::spawn(game.run(updates_rx, shutdown_rx));

    info!(
        replay = %config.replay_path.display(),
        frames = recording.len(),
        seed = ?config.seed,
        "number train running; ctrl-c to stop"
    );

    let finished = tokio::select! {
        result = &mut game_task => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for ctrl-c; shutting down");
            }
            info!("shutting down");
            predictions_tx.send_replace(false);
            shutdown_tx.send_replace(true);
            game_task.await
        }
    };
    // The game may have stopped first; make sure tracking follows.
    shutdown_tx.send_replace(true);

    let mut code = ExitCode::SUCCESS;
    match tracking.await {
        Ok(Ok(())) => info!("tracking stopped"),
        Ok(Err(e)) => {
            error!(error = %e, "tracking failed");
            code = ExitCode::FAILURE;
        }
        Err(e) => {
            error!(error = %e, "tracking task panicked");
            code = ExitCode::FAILURE;
        }
    }
    match finished {
        Ok(state) => info!(
            round_index = state.round_index,
            carriage = state.carriage_number,
            falling = state.falling_number,
            "final round"
        ),
        Err(e) => {
            error!(error = %e, "game task panicked");
            code = ExitCode::FAILURE;
        }
    }
    code
}

/// Mirror game events into the log as JSON.
async fn log_events(mut events: broadcast::Receiver<GameEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => debug!(event = %json, "game event"),
                Err(e) => warn!(error = %e, "failed to encode game event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => warn!(skipped, "event log fell behind"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
