//! Fakes shared by the unit tests.

use crate::config::CaptureSettings;
use crate::error::{AnalysisError, CaptureError};
use crate::intake::camera::{CameraSource, CaptureDevice};
use crate::network::hub::{ClientHandle, ClientId};
use crate::pipeline::capture_loop::LoopSettings;
use crate::pipeline::services::{FrameEncoder, HandLandmarker, LandmarkerFactory};
use crate::pipeline::types::{landmark, HandObservation, Handedness, Landmark, FINGERS_PER_HAND};
use crate::session::SessionContext;
use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

const TIPS: [usize; FINGERS_PER_HAND] = [
    landmark::THUMB_TIP,
    landmark::INDEX_FINGER_TIP,
    landmark::MIDDLE_FINGER_TIP,
    landmark::RING_FINGER_TIP,
    landmark::PINKY_TIP,
];

/// A full 21-point hand centered at `center_x` with the listed fingers (0 = thumb) down.
pub(crate) fn hand_at(center_x: f32, down: &[usize]) -> HandObservation {
    let mut landmarks = vec![Landmark::new(center_x, 0.6); landmark::COUNT];
    for finger in 0..FINGERS_PER_HAND {
        landmarks[landmark::REFERENCE_JOINTS[finger]].y = 0.5;
        landmarks[TIPS[finger]].y = if down.contains(&finger) { 0.8 } else { 0.2 };
    }
    HandObservation::new(landmarks, Handedness::Right)
}

pub(crate) fn test_settings() -> LoopSettings {
    LoopSettings {
        frame_interval: Duration::from_millis(2),
        error_backoff: Duration::from_millis(20),
        capture: CaptureSettings {
            width: 32,
            height: 24,
            fps: 30,
        },
        encoder: FrameEncoder::new(50, true),
    }
}

pub(crate) async fn connected_client(
    context: &SessionContext,
) -> (ClientId, mpsc::Receiver<String>) {
    let (client, rx) = ClientHandle::channel(256);
    let id = client.id();
    context.hub().register(client).await;
    (id, rx)
}

/// Skips events until one of type `kind` arrives.
pub(crate) async fn next_event(rx: &mut mpsc::Receiver<String>, kind: &str) -> Value {
    let wait = async {
        while let Some(text) = rx.recv().await {
            let event: Value = serde_json::from_str(&text).unwrap();
            if event["type"] == kind {
                return event;
            }
        }
        panic!("client channel closed while waiting for {}", kind);
    };
    tokio::time::timeout(WAIT, wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", kind))
}

/// Everything a client receives until its channel closes or the camera reports stopped.
pub(crate) async fn collect_until_stopped(mut rx: mpsc::Receiver<String>) -> Vec<Value> {
    let collect = async {
        let mut events = Vec::new();
        while let Some(text) = rx.recv().await {
            let event: Value = serde_json::from_str(&text).unwrap();
            let stopped = event["type"] == "camera_status" && event["running"] == false;
            events.push(event);
            if stopped {
                break;
            }
        }
        events
    };
    tokio::time::timeout(WAIT, collect)
        .await
        .expect("timed out collecting events")
}

pub(crate) async fn eventually(check: impl Fn() -> bool) {
    let poll = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(WAIT, poll)
        .await
        .expect("condition not met in time");
}

#[derive(Debug, Default)]
pub(crate) struct CameraProbe {
    opens: AtomicUsize,
    releases: AtomicUsize,
    reads: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl CameraProbe {
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Most devices ever open at the same time.
    pub(crate) fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

/// Counting camera source producing flat grey frames.
pub(crate) struct FakeCameraSource {
    probe: Arc<CameraProbe>,
    failing: Vec<u32>,
    frames_before_loss: Option<usize>,
    stall: bool,
}

impl FakeCameraSource {
    pub(crate) fn new() -> (Self, Arc<CameraProbe>) {
        let probe = Arc::new(CameraProbe::default());
        (
            Self {
                probe: Arc::clone(&probe),
                failing: Vec::new(),
                frames_before_loss: None,
                stall: false,
            },
            probe,
        )
    }

    pub(crate) fn fail_open(mut self, index: u32) -> Self {
        self.failing.push(index);
        self
    }

    /// Every device fails its read after delivering `frames` frames.
    pub(crate) fn lose_after(mut self, frames: usize) -> Self {
        self.frames_before_loss = Some(frames);
        self
    }

    /// Reads never complete.
    pub(crate) fn stall_reads(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[async_trait]
impl CameraSource for FakeCameraSource {
    async fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&index) {
            return Err(CaptureError::Open {
                index,
                reason: "no such device".to_string(),
            });
        }
        let live = self.probe.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(FakeDevice {
            probe: Arc::clone(&self.probe),
            remaining: self.frames_before_loss,
            stall: self.stall,
        }))
    }
}

struct FakeDevice {
    probe: Arc<CameraProbe>,
    remaining: Option<usize>,
    stall: bool,
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    async fn configure(&mut self, _settings: CaptureSettings) -> Result<(), CaptureError> {
        Err(CaptureError::Configure("fixed resolution".to_string()))
    }

    async fn read_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            std::future::pending::<()>().await;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CaptureError::Read("device unplugged".to_string()));
            }
            *remaining -= 1;
        }
        tokio::task::yield_now().await;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            32,
            24,
            Rgb([40, 40, 40]),
        )))
    }

    async fn release(&mut self) {
        self.probe.live.fetch_sub(1, Ordering::SeqCst);
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub(crate) struct LandmarkerProbe {
    created: AtomicUsize,
    analyzed: AtomicUsize,
    closed: AtomicUsize,
}

impl LandmarkerProbe {
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn analyzed(&self) -> usize {
        self.analyzed.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Landmarker reporting the same hands every cycle, optionally failing or panicking first.
#[derive(Clone)]
pub(crate) struct ScriptedLandmarkerFactory {
    hands: Arc<Vec<HandObservation>>,
    failures: Arc<AtomicUsize>,
    panics: Arc<AtomicUsize>,
    unavailable: bool,
    probe: Arc<LandmarkerProbe>,
}

impl ScriptedLandmarkerFactory {
    pub(crate) fn new(hands: Vec<HandObservation>) -> (Self, Arc<LandmarkerProbe>) {
        let probe = Arc::new(LandmarkerProbe::default());
        (
            Self {
                hands: Arc::new(hands),
                failures: Arc::new(AtomicUsize::new(0)),
                panics: Arc::new(AtomicUsize::new(0)),
                unavailable: false,
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }

    pub(crate) fn fail_next(self, cycles: usize) -> Self {
        self.failures.store(cycles, Ordering::SeqCst);
        self
    }

    pub(crate) fn panic_next(self, cycles: usize) -> Self {
        self.panics.store(cycles, Ordering::SeqCst);
        self
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl LandmarkerFactory for ScriptedLandmarkerFactory {
    fn create(&self) -> Result<Box<dyn HandLandmarker>, AnalysisError> {
        if self.unavailable {
            return Err(AnalysisError::Init("model missing".to_string()));
        }
        self.probe.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedLandmarker {
            hands: Arc::clone(&self.hands),
            failures: Arc::clone(&self.failures),
            panics: Arc::clone(&self.panics),
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct ScriptedLandmarker {
    hands: Arc<Vec<HandObservation>>,
    failures: Arc<AtomicUsize>,
    panics: Arc<AtomicUsize>,
    probe: Arc<LandmarkerProbe>,
}

#[async_trait]
impl HandLandmarker for ScriptedLandmarker {
    async fn analyze(&mut self, _image: &DynamicImage) -> Result<Vec<HandObservation>, AnalysisError> {
        self.probe.analyzed.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.panics) {
            panic!("scripted panic");
        }
        if take_one(&self.failures) {
            return Err(AnalysisError::Inference("scripted failure".to_string()));
        }
        Ok(self.hands.to_vec())
    }

    async fn close(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}
