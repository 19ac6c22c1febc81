use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use gesture::fixtures::detected;
use gesture::Handedness;

use super::*;
use crate::scene::test_helpers::{RecordingScene, SceneCall};

// =========================================================================
// Fixtures
// =========================================================================

fn frame(id: u64, ms: u64) -> VideoFrame {
    VideoFrame { id, timestamp: Duration::from_millis(ms) }
}

/// Plays a fixed list of frames, one per call, then ends.
struct ScriptedSource {
    frames: VecDeque<VideoFrame>,
}

impl ScriptedSource {
    fn new(frames: Vec<VideoFrame>) -> Box<Self> {
        Box::new(Self { frames: frames.into() })
    }
}

impl FrameSource for ScriptedSource {
    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.frames.pop_front()
    }
}

/// Never-ending feed with a fresh frame on every call.
struct EndlessSource {
    next: u64,
}

impl FrameSource for EndlessSource {
    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.next += 1;
        Some(frame(self.next, self.next * 33))
    }
}

struct MockDetector {
    calls: Arc<AtomicUsize>,
    detection: Detection,
    fail: bool,
}

impl MockDetector {
    fn showing(calls: Arc<AtomicUsize>, detection: Detection) -> Box<Self> {
        Box::new(Self { calls, detection, fail: false })
    }
}

#[async_trait::async_trait]
impl LandmarkDetector for MockDetector {
    async fn detect(&self, _frame: VideoFrame) -> Result<Detection, TrackingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(TrackingError::Detect("camera unplugged".into()))
        } else {
            Ok(self.detection.clone())
        }
    }
}

/// Fails `failures` times, then hands out an empty detector.
struct FlakyLoader {
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyLoader {
    fn new(failures: usize) -> Self {
        Self { failures, attempts: AtomicUsize::new(0) }
    }
}

#[async_trait::async_trait]
impl ModelLoader for FlakyLoader {
    async fn load(&self) -> Result<Box<dyn LandmarkDetector>, TrackingError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(TrackingError::Load(format!("wasm bundle not ready ({attempt})")));
        }
        Ok(MockDetector::showing(Arc::new(AtomicUsize::new(0)), Detection::default()))
    }
}

fn two_hands(left_model: usize, right_model: usize) -> Detection {
    Detection {
        hands: vec![detected(Handedness::Left, left_model), detected(Handedness::Right, right_model)],
    }
}

// =========================================================================
// load_model
// =========================================================================

#[tokio::test(start_paused = true)]
async fn load_model_succeeds_first_try() {
    let loader = FlakyLoader::new(0);
    assert!(load_model(&loader, 3, Duration::from_millis(100)).await.is_ok());
    assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn load_model_retries_with_linear_backoff() {
    let loader = FlakyLoader::new(2);
    let start = tokio::time::Instant::now();
    assert!(load_model(&loader, 5, Duration::from_millis(100)).await.is_ok());
    assert_eq!(loader.attempts.load(Ordering::SeqCst), 3);
    // 1 * 100ms after the first failure, 2 * 100ms after the second.
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(350), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn load_model_gives_up_after_cap() {
    let loader = FlakyLoader::new(usize::MAX);
    let Err(err) = load_model(&loader, 3, Duration::from_millis(10)).await else {
        panic!("loader never succeeds");
    };
    assert_eq!(loader.attempts.load(Ordering::SeqCst), 3);
    match err {
        TrackingError::ModelUnavailable { attempts, reason } => {
            assert_eq!(attempts, 3);
            assert!(reason.contains("not ready (2)"));
        }
        other => panic!("expected ModelUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn load_model_with_zero_attempts_never_calls_loader() {
    let loader = FlakyLoader::new(0);
    assert!(load_model(&loader, 0, Duration::ZERO).await.is_err());
    assert_eq!(loader.attempts.load(Ordering::SeqCst), 0);
}

// =========================================================================
// Tracker::step
// =========================================================================

#[tokio::test]
async fn step_reads_mirrored_digits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scene = Arc::new(RecordingScene::default());
    let mut tracker = Tracker::new(
        ScriptedSource::new(vec![frame(1, 0)]),
        MockDetector::showing(calls, two_hands(2, 5)),
        Classifier::default(),
        scene.clone(),
    );

    // Model "Left" is the player's right hand.
    assert_eq!(tracker.step().await, Step::Read(DigitPair::both(5, 2)));
    assert_eq!(scene.calls(), vec![SceneCall::Overlay(vec![21, 21])]);
}

#[tokio::test]
async fn step_skips_unchanged_timestamp() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut tracker = Tracker::new(
        ScriptedSource::new(vec![frame(1, 33), frame(1, 33), frame(2, 66)]),
        MockDetector::showing(calls.clone(), two_hands(1, 1)),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );

    assert!(matches!(tracker.step().await, Step::Read(_)));
    assert_eq!(tracker.step().await, Step::Skipped);
    assert!(matches!(tracker.step().await, Step::Read(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn step_reports_end_of_stream() {
    let mut tracker = Tracker::new(
        ScriptedSource::new(Vec::new()),
        MockDetector::showing(Arc::new(AtomicUsize::new(0)), Detection::default()),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    assert_eq!(tracker.step().await, Step::Ended);
}

#[tokio::test]
async fn step_drops_frame_on_detector_failure() {
    let scene = Arc::new(RecordingScene::default());
    let detector = Box::new(MockDetector {
        calls: Arc::new(AtomicUsize::new(0)),
        detection: Detection::default(),
        fail: true,
    });
    let mut tracker = Tracker::new(
        ScriptedSource::new(vec![frame(1, 0)]),
        detector,
        Classifier::default(),
        scene.clone(),
    );
    assert_eq!(tracker.step().await, Step::Dropped);
    assert!(scene.calls().is_empty());
}

#[tokio::test]
async fn step_blanks_malformed_hand_only() {
    let mut detection = two_hands(3, 4);
    detection.hands[0].landmarks.truncate(10);
    let mut tracker = Tracker::new(
        ScriptedSource::new(vec![frame(1, 0)]),
        MockDetector::showing(Arc::new(AtomicUsize::new(0)), detection),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    assert_eq!(tracker.step().await, Step::Read(DigitPair::new(Some(4), None)));
}

#[tokio::test]
async fn step_with_no_hands_reads_sentinels() {
    let mut tracker = Tracker::new(
        ScriptedSource::new(vec![frame(1, 0)]),
        MockDetector::showing(Arc::new(AtomicUsize::new(0)), Detection::default()),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    let Step::Read(pair) = tracker.step().await else {
        panic!("expected a reading");
    };
    assert_eq!(pair.as_signed(), (-1, -1));
}

// =========================================================================
// run_tracking
// =========================================================================

#[tokio::test(start_paused = true)]
async fn run_sends_every_new_frame_then_closes() {
    let tracker = Tracker::new(
        ScriptedSource::new(vec![frame(1, 0), frame(1, 0), frame(2, 33), frame(3, 66)]),
        MockDetector::showing(Arc::new(AtomicUsize::new(0)), two_hands(0, 5)),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    let (_enabled_tx, enabled_rx) = watch::channel(true);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(8);

    let handle = tokio::spawn(run_tracking(tracker, Duration::from_millis(33), enabled_rx, shutdown_rx, tx));

    let mut readings = Vec::new();
    while let Some(pair) = rx.recv().await {
        readings.push(pair);
    }
    handle.await.unwrap();
    assert_eq!(readings, vec![DigitPair::both(5, 0); 3]);
}

#[tokio::test(start_paused = true)]
async fn run_is_idle_while_predictions_disabled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let tracker = Tracker::new(
        Box::new(EndlessSource { next: 0 }),
        MockDetector::showing(calls.clone(), two_hands(1, 1)),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    let (enabled_tx, enabled_rx) = watch::channel(false);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(8);

    let handle = tokio::spawn(run_tracking(tracker, Duration::from_millis(33), enabled_rx, shutdown_rx, tx));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    enabled_tx.send(true).unwrap();
    assert_eq!(rx.recv().await, Some(DigitPair::both(1, 1)));

    shutdown_tx.send(true).unwrap();
    // Drain so a blocked send cannot hold the loop open.
    while rx.recv().await.is_some() {}
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn run_stops_on_shutdown() {
    let tracker = Tracker::new(
        Box::new(EndlessSource { next: 0 }),
        MockDetector::showing(Arc::new(AtomicUsize::new(0)), Detection::default()),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    let (_enabled_tx, enabled_rx) = watch::channel(true);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(1024);

    let handle = tokio::spawn(run_tracking(tracker, Duration::from_millis(33), enabled_rx, shutdown_rx, tx));
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let mut received = 0;
    while rx.recv().await.is_some() {
        received += 1;
    }
    assert!(received > 0);
}

#[tokio::test(start_paused = true)]
async fn run_stops_when_receiver_dropped() {
    let tracker = Tracker::new(
        Box::new(EndlessSource { next: 0 }),
        MockDetector::showing(Arc::new(AtomicUsize::new(0)), Detection::default()),
        Classifier::default(),
        Arc::new(RecordingScene::default()),
    );
    let (_enabled_tx, enabled_rx) = watch::channel(true);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    run_tracking(tracker, Duration::from_millis(33), enabled_rx, shutdown_rx, tx).await;
}

// =========================================================================
// spawn_tracking
// =========================================================================

#[tokio::test(start_paused = true)]
async fn spawn_tracking_surfaces_unavailable_model() {
    let config = TrackingConfig { model_load_retries: 2, ..TrackingConfig::default() };
    let setup = TrackingSetup {
        loader: Arc::new(FlakyLoader::new(usize::MAX)),
        source: Box::new(EndlessSource { next: 0 }),
        scene: Arc::new(RecordingScene::default()),
        config,
    };
    let (_enabled_tx, enabled_rx) = watch::channel(true);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(8);

    let result = spawn_tracking(setup, enabled_rx, shutdown_rx, tx).await.unwrap();
    assert!(matches!(result, Err(TrackingError::ModelUnavailable { attempts: 2, .. })));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn spawn_tracking_runs_after_flaky_load() {
    let setup = TrackingSetup {
        loader: Arc::new(FlakyLoader::new(1)),
        source: ScriptedSource::new(vec![frame(1, 0), frame(2, 33)]),
        scene: Arc::new(RecordingScene::default()),
        config: TrackingConfig::default(),
    };
    let (_enabled_tx, enabled_rx) = watch::channel(true);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(8);

    let handle = spawn_tracking(setup, enabled_rx, shutdown_rx, tx);
    assert_eq!(rx.recv().await, Some(DigitPair::default()));
    assert_eq!(rx.recv().await, Some(DigitPair::default()));
    assert_eq!(rx.recv().await, None);
    assert!(handle.await.unwrap().is_ok());
}
