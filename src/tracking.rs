//! Hand-tracking loop — frames in, digit pairs out.
//!
//! DESIGN
//! ======
//! The landmark model and the video feed are external. They sit behind
//! `ModelLoader`, `LandmarkDetector` and `FrameSource` so the loop itself is
//! plain Rust and testable with mocks.
//!
//! LIFECYCLE
//! =========
//! 1. Load the model once, with a capped number of attempts and linear
//!    back-off. No per-frame readiness polling.
//! 2. Tick at the frame interval. Missed ticks are skipped, never bunched.
//! 3. Each tick: bail if predictions are toggled off; read the current frame;
//!    skip it if its timestamp has not moved since the last processed frame;
//!    otherwise detect, draw the overlay, classify, and send the pair.
//! 4. Exit on shutdown, end of stream, or when the game stops listening.
//!
//! ERROR HANDLING
//! ==============
//! A failed detection drops that frame. A malformed hand blanks its own side
//! only. Neither stops the loop: the next frame is another chance.

use std::sync::Arc;
use std::time::Duration;

use gesture::hands::read_digits_lenient;
use gesture::{Classifier, Detection, DigitPair};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::scene::Scene;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("landmark model unavailable after {attempts} attempts: {reason}")]
    ModelUnavailable { attempts: usize, reason: String },
    #[error("model load failed: {0}")]
    Load(String),
    #[error("detection failed: {0}")]
    Detect(String),
}

// =============================================================================
// SEAMS
// =============================================================================

/// Handle to one video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFrame {
    /// Source-specific frame identifier.
    pub id: u64,
    /// Presentation time of the frame within the stream.
    pub timestamp: Duration,
}

/// Live video feed. Reading the current frame is cheap and never blocks.
pub trait FrameSource: Send {
    /// The frame currently on screen, or `None` once the stream has ended.
    fn current_frame(&mut self) -> Option<VideoFrame>;
}

/// The external landmark model, once loaded.
#[async_trait::async_trait]
pub trait LandmarkDetector: Send + Sync {
    async fn detect(&self, frame: VideoFrame) -> Result<Detection, TrackingError>;
}

/// Asynchronous loader for the landmark model.
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Box<dyn LandmarkDetector>, TrackingError>;
}

// =============================================================================
// MODEL READINESS
// =============================================================================

/// Load the model, retrying up to `attempts` times.
///
/// Attempt `n` that fails waits `n * retry_base` before the next one.
///
/// # Errors
///
/// Returns [`TrackingError::ModelUnavailable`] carrying the last failure once
/// every attempt is spent.
pub async fn load_model(
    loader: &dyn ModelLoader,
    attempts: usize,
    retry_base: Duration,
) -> Result<Box<dyn LandmarkDetector>, TrackingError> {
    let mut reason = String::from("no load attempted");
    for attempt in 1..=attempts {
        match loader.load().await {
            Ok(detector) => {
                info!(attempt, "landmark model ready");
                return Ok(detector);
            }
            Err(e) if attempt < attempts => {
                warn!(error = %e, attempt, total = attempts, "landmark model load failed; retrying");
                let step = u32::try_from(attempt).unwrap_or(u32::MAX);
                tokio::time::sleep(retry_base.saturating_mul(step)).await;
            }
            Err(e) => reason = e.to_string(),
        }
    }
    Err(TrackingError::ModelUnavailable { attempts, reason })
}

// =============================================================================
// TRACKER
// =============================================================================

/// Result of one tracking tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The frame was already processed.
    Skipped,
    /// Detection failed; the frame was dropped.
    Dropped,
    /// The stream has ended.
    Ended,
    /// A new reading.
    Read(DigitPair),
}

pub struct Tracker {
    source: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkDetector>,
    classifier: Classifier,
    scene: Arc<dyn Scene>,
    last_video_time: Option<Duration>,
}

impl Tracker {
    #[must_use]
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn LandmarkDetector>,
        classifier: Classifier,
        scene: Arc<dyn Scene>,
    ) -> Self {
        Self { source, detector, classifier, scene, last_video_time: None }
    }

    /// Process the current frame, if it is new.
    pub async fn step(&mut self) -> Step {
        let Some(frame) = self.source.current_frame() else {
            return Step::Ended;
        };
        if self.last_video_time == Some(frame.timestamp) {
            return Step::Skipped;
        }
        self.last_video_time = Some(frame.timestamp);

        let detection = match self.detector.detect(frame).await {
            Ok(detection) => detection,
            Err(e) => {
                warn!(error = %e, frame = frame.id, "detection failed; dropping frame");
                return Step::Dropped;
            }
        };

        self.scene.draw_overlay(&detection);

        let (pair, errors) = read_digits_lenient(&detection, &self.classifier);
        for e in errors {
            warn!(error = %e, frame = frame.id, "discarding malformed hand");
        }
        Step::Read(pair)
    }
}

/// Tick the tracker until shutdown, end of stream, or the receiver goes away.
pub async fn run_tracking(
    mut tracker: Tracker,
    frame_interval: Duration,
    enabled: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<bool>,
    updates: mpsc::Sender<DigitPair>,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames: u64 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        if !*enabled.borrow() {
            continue;
        }

        match tracker.step().await {
            Step::Skipped | Step::Dropped => {}
            Step::Ended => {
                info!(frames, "video stream ended");
                break;
            }
            Step::Read(pair) => {
                frames += 1;
                debug!(%pair, "hand reading");
                if updates.send(pair).await.is_err() {
                    debug!("digit receiver closed; stopping tracking");
                    break;
                }
            }
        }
    }
    info!(frames, "tracking loop stopped");
}

/// Everything `spawn_tracking` needs besides the channels.
pub struct TrackingSetup {
    pub loader: Arc<dyn ModelLoader>,
    pub source: Box<dyn FrameSource>,
    pub scene: Arc<dyn Scene>,
    pub config: TrackingConfig,
}

/// Spawn the tracking task: wait for the model, then run the loop.
///
/// Dropping `updates` (by returning) is how the game learns tracking is over.
pub fn spawn_tracking(
    setup: TrackingSetup,
    enabled: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
    updates: mpsc::Sender<DigitPair>,
) -> JoinHandle<Result<(), TrackingError>> {
    tokio::spawn(async move {
        let TrackingSetup { loader, source, scene, config } = setup;
        let detector = load_model(loader.as_ref(), config.model_load_retries, config.model_retry_base).await?;
        let classifier = Classifier::new(config.extension_threshold_deg);
        let tracker = Tracker::new(source, detector, classifier, scene);
        run_tracking(tracker, config.frame_interval, enabled, shutdown, updates).await;
        Ok(())
    })
}

#[cfg(test)]
#[path = "tracking_test.rs"]
mod tests;
