//! Replay detector — recorded landmark sessions played back as a live feed.
//!
//! DESIGN
//! ======
//! The real landmark model runs in the browser. For headless runs a session
//! is captured as JSON and fed back through the same seams the live model
//! uses: `ReplaySource` stands in for the video element and `ReplayDetector`
//! for the model. The tracking loop cannot tell the difference.
//!
//! FORMAT
//! ======
//! ```json
//! { "frames": [ { "timestamp_ms": 0.0,
//!                 "hands": [ { "handedness": "Left", "landmarks": [[x, y, z], ...] } ] } ] }
//! ```
//! Timestamps are milliseconds, non-decreasing, and rebased so the first
//! frame plays at zero.
//!
//! PACING
//! ======
//! `ReplaySource` shows whichever frame is due at the time elapsed since its
//! first read, like a video element would. Reads between frames see the same
//! timestamp again; the tracker's dedupe skips them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gesture::{DetectedHand, Detection};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::info;

use crate::tracking::{FrameSource, LandmarkDetector, ModelLoader, TrackingError, VideoFrame};

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read recording: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse recording: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("frame {index} has invalid timestamp {timestamp_ms}")]
    BadTimestamp { index: usize, timestamp_ms: f64 },
    #[error("frame {index} is earlier than the frame before it")]
    OutOfOrder { index: usize },
}

// =============================================================================
// RECORDING
// =============================================================================

/// One frame as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: f64,
    #[serde(default)]
    pub hands: Vec<DetectedHand>,
}

#[derive(Debug, Deserialize)]
struct RecordingFile {
    frames: Vec<RecordedFrame>,
}

/// A parsed, validated session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayRecording {
    timestamps: Vec<Duration>,
    detections: Vec<Detection>,
}

impl ReplayRecording {
    /// Build from recorded frames.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite timestamps and frames that go back in
    /// time.
    pub fn new(frames: Vec<RecordedFrame>) -> Result<Self, ReplayError> {
        let origin = frames.first().map_or(0.0, |f| f.timestamp_ms);
        let mut timestamps = Vec::with_capacity(frames.len());
        let mut detections = Vec::with_capacity(frames.len());

        for (index, frame) in frames.into_iter().enumerate() {
            let offset = Duration::try_from_secs_f64((frame.timestamp_ms - origin) / 1000.0)
                .map_err(|_| ReplayError::BadTimestamp { index, timestamp_ms: frame.timestamp_ms })?;
            if timestamps.last().is_some_and(|prev| offset < *prev) {
                return Err(ReplayError::OutOfOrder { index });
            }
            timestamps.push(offset);
            detections.push(Detection { hands: frame.hands });
        }
        Ok(Self { timestamps, detections })
    }

    /// Parse a JSON recording.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Parse`] for malformed JSON, plus anything
    /// [`ReplayRecording::new`] rejects.
    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        let file: RecordingFile = serde_json::from_str(text)?;
        Self::new(file.frames)
    }

    /// Read and parse a recording from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] when the file cannot be read, plus
    /// anything [`ReplayRecording::from_json`] rejects.
    pub async fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = tokio::fs::read_to_string(path).await?;
        let recording = Self::from_json(&text)?;
        info!(path = %path.display(), frames = recording.len(), duration_ms = recording.duration().as_millis(), "replay recording loaded");
        Ok(recording)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Offset of the last frame from the first.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.timestamps.last().copied().unwrap_or_default()
    }

    #[must_use]
    pub fn detection(&self, index: usize) -> Option<&Detection> {
        self.detections.get(index)
    }
}

// =============================================================================
// FRAME SOURCE
// =============================================================================

/// Plays a recording's timeline against the clock.
#[derive(Debug)]
pub struct ReplaySource {
    timestamps: Vec<Duration>,
    started: Option<Instant>,
    shown: Option<usize>,
}

impl ReplaySource {
    #[must_use]
    pub fn new(recording: &ReplayRecording) -> Self {
        Self { timestamps: recording.timestamps.clone(), started: None, shown: None }
    }
}

impl FrameSource for ReplaySource {
    fn current_frame(&mut self) -> Option<VideoFrame> {
        let last = self.timestamps.len().checked_sub(1)?;
        let end = *self.timestamps.last()?;
        let elapsed = self.started.get_or_insert_with(Instant::now).elapsed();

        // Latest frame due by now; the first frame stays up until then.
        let index = self.timestamps.partition_point(|t| *t <= elapsed).saturating_sub(1);
        if index == last && self.shown == Some(last) && elapsed > end {
            return None;
        }
        let timestamp = *self.timestamps.get(index)?;
        self.shown = Some(index);
        Some(VideoFrame { id: u64::try_from(index).ok()?, timestamp })
    }
}

// =============================================================================
// DETECTOR & LOADER
// =============================================================================

/// Answers each frame with the hands recorded for it.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    recording: Arc<ReplayRecording>,
}

#[async_trait::async_trait]
impl LandmarkDetector for ReplayDetector {
    async fn detect(&self, frame: VideoFrame) -> Result<Detection, TrackingError> {
        usize::try_from(frame.id)
            .ok()
            .and_then(|index| self.recording.detection(index))
            .cloned()
            .ok_or_else(|| TrackingError::Detect(format!("frame {} is not in the recording", frame.id)))
    }
}

/// Hands out [`ReplayDetector`]s over a shared recording.
#[derive(Debug, Clone)]
pub struct ReplayLoader {
    recording: Arc<ReplayRecording>,
}

impl ReplayLoader {
    #[must_use]
    pub fn new(recording: Arc<ReplayRecording>) -> Self {
        Self { recording }
    }
}

#[async_trait::async_trait]
impl ModelLoader for ReplayLoader {
    async fn load(&self) -> Result<Box<dyn LandmarkDetector>, TrackingError> {
        if self.recording.is_empty() {
            return Err(TrackingError::Load("replay recording has no frames".into()));
        }
        Ok(Box::new(ReplayDetector { recording: Arc::clone(&self.recording) }))
    }
}

#[cfg(test)]
#[path = "replay_test.rs"]
mod tests;
