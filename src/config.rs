//! Game configuration parsed from environment variables.
//!
//! Every knob has a typed default so the binary runs with an empty
//! environment. A `.env` file is honoured by `main` before this is read.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STARTUP_DELAY_MS: u64 = 1000;
pub const DEFAULT_ADVANCE_DELAY_MS: u64 = 4000;
pub const DEFAULT_EXTENSION_THRESHOLD_DEG: f64 = gesture::consts::DEFAULT_EXTENSION_THRESHOLD_DEG;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;
pub const DEFAULT_MODEL_LOAD_RETRIES: usize = 5;
pub const DEFAULT_MODEL_RETRY_BASE_MS: u64 = 200;
pub const DEFAULT_UPDATE_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_REPLAY_PATH: &str = "recordings/session.json";
pub const DEFAULT_ASSET_ROOT: &str = "assets";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number, got {value}")]
    NotPositive { var: &'static str, value: String },
    #[error("{var} could not be parsed: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Timers for the round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTiming {
    /// Delay between start-up and the first round, so the scene can load.
    pub startup_delay: Duration,
    /// Delay between a solve and the next round, covering the resolve animation.
    pub advance_delay: Duration,
}

impl Default for RoundTiming {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(DEFAULT_STARTUP_DELAY_MS),
            advance_delay: Duration::from_millis(DEFAULT_ADVANCE_DELAY_MS),
        }
    }
}

/// Knobs for the hand-tracking loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingConfig {
    pub extension_threshold_deg: f64,
    pub frame_interval: Duration,
    /// Attempts at loading the landmark model before giving up.
    pub model_load_retries: usize,
    /// Linear back-off step between load attempts.
    pub model_retry_base: Duration,
    pub update_queue_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            extension_threshold_deg: DEFAULT_EXTENSION_THRESHOLD_DEG,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            model_load_retries: DEFAULT_MODEL_LOAD_RETRIES,
            model_retry_base: Duration::from_millis(DEFAULT_MODEL_RETRY_BASE_MS),
            update_queue_capacity: DEFAULT_UPDATE_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub timing: RoundTiming,
    pub tracking: TrackingConfig,
    /// Optional YAML pair table replacing the built-in one.
    pub pair_table_path: Option<PathBuf>,
    /// Seed for pair draws; OS entropy when absent.
    pub seed: Option<u64>,
    pub replay_path: PathBuf,
    pub asset_root: PathBuf,
}

impl GameConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `STARTUP_DELAY_MS`: default 1000
    /// - `ADVANCE_DELAY_MS`: default 4000
    /// - `EXTENSION_THRESHOLD_DEG`: default 25
    /// - `FRAME_INTERVAL_MS`: default 33
    /// - `MODEL_LOAD_RETRIES`: default 5
    /// - `MODEL_RETRY_BASE_MS`: default 200
    /// - `UPDATE_QUEUE_CAPACITY`: default 64
    /// - `PAIR_TABLE_PATH`: built-in table when absent
    /// - `GAME_SEED`: random when absent
    /// - `REPLAY_PATH`: default `recordings/session.json`
    /// - `ASSET_ROOT`: default `assets`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the threshold, frame interval, retry
    /// count, or queue capacity is not positive, or when `GAME_SEED` is set
    /// but not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timing = RoundTiming {
            startup_delay: Duration::from_millis(env_parse("STARTUP_DELAY_MS", DEFAULT_STARTUP_DELAY_MS)),
            advance_delay: Duration::from_millis(env_parse("ADVANCE_DELAY_MS", DEFAULT_ADVANCE_DELAY_MS)),
        };

        let tracking = TrackingConfig {
            extension_threshold_deg: positive_f64("EXTENSION_THRESHOLD_DEG", DEFAULT_EXTENSION_THRESHOLD_DEG)?,
            frame_interval: Duration::from_millis(positive("FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS)?),
            model_load_retries: positive("MODEL_LOAD_RETRIES", DEFAULT_MODEL_LOAD_RETRIES)?,
            model_retry_base: Duration::from_millis(env_parse("MODEL_RETRY_BASE_MS", DEFAULT_MODEL_RETRY_BASE_MS)),
            update_queue_capacity: positive("UPDATE_QUEUE_CAPACITY", DEFAULT_UPDATE_QUEUE_CAPACITY)?,
        };

        let seed = match std::env::var("GAME_SEED") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid { var: "GAME_SEED", value: raw.clone() })?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            timing,
            tracking,
            pair_table_path: std::env::var("PAIR_TABLE_PATH").ok().map(PathBuf::from),
            seed,
            replay_path: std::env::var("REPLAY_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_REPLAY_PATH), PathBuf::from),
            asset_root: std::env::var("ASSET_ROOT").map_or_else(|_| PathBuf::from(DEFAULT_ASSET_ROOT), PathBuf::from),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn positive<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Copy + PartialOrd + Default + std::fmt::Display,
{
    let value = env_parse(key, default);
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { var: key, value: value.to_string() })
    }
}

fn positive_f64(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = env_parse(key, default);
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { var: key, value: value.to_string() })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
