use crate::common::Frame;
use crate::config::{CaptureSettings, Configuration};
use crate::error::AnalysisError;
use crate::intake::camera::{CameraSource, CaptureDevice};
use crate::network::events::ServerEvent;
use crate::pipeline::services::{FingerStateTracker, FrameEncoder, HandLandmarker, LandmarkerFactory};
use crate::session::SessionContext;
use futures::FutureExt;
use image::DynamicImage;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Pause between cycles.
    pub frame_interval: Duration,
    /// Pause after a cycle that failed unexpectedly.
    pub error_backoff: Duration,
    pub capture: CaptureSettings,
    pub encoder: FrameEncoder,
}

impl From<&Configuration> for LoopSettings {
    fn from(configuration: &Configuration) -> Self {
        Self {
            frame_interval: configuration.frame_interval(),
            error_backoff: configuration.error_backoff(),
            capture: configuration.capture_settings(),
            encoder: FrameEncoder::new(configuration.jpeg_quality, configuration.annotate_frames),
        }
    }
}

/// Why a capture loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    OpenFailed,
    AnalysisUnavailable,
    DeviceLost,
    NoClients,
    Cancelled,
}

enum CycleError {
    Cancelled,
    Analysis(AnalysisError),
}

#[derive(Default)]
struct Resources {
    device: Option<Box<dyn CaptureDevice>>,
    landmarker: Option<Box<dyn HandLandmarker>>,
}

/// Owns one camera and one landmarker session for as long as it runs.
pub struct CaptureLoop {
    camera_index: u32,
    context: Arc<SessionContext>,
    source: Arc<dyn CameraSource>,
    landmarkers: Arc<dyn LandmarkerFactory>,
    settings: LoopSettings,
    cancel_token: CancellationToken,
    tracker: FingerStateTracker,
}

impl CaptureLoop {
    pub fn new(
        camera_index: u32,
        context: Arc<SessionContext>,
        source: Arc<dyn CameraSource>,
        landmarkers: Arc<dyn LandmarkerFactory>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            camera_index,
            context,
            source,
            landmarkers,
            settings,
            cancel_token: CancellationToken::new(),
            tracker: FingerStateTracker::new(),
        }
    }

    pub fn camera_index(&self) -> u32 {
        self.camera_index
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Runs until the camera fails, the loop is cancelled or the last client leaves.
    /// Teardown runs exactly once whichever way the loop ends.
    pub async fn run(mut self) -> LoopExit {
        info!(camera_index = self.camera_index, "Capture loop starting");
        let mut resources = Resources::default();
        let exit = self.run_until_exit(&mut resources).await;
        self.teardown(resources, exit).await;
        exit
    }

    async fn run_until_exit(&mut self, resources: &mut Resources) -> LoopExit {
        let camera_index = self.camera_index;
        let opened = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return LoopExit::Cancelled,
            opened = self.source.open(camera_index) => opened,
        };
        let device = match opened {
            Ok(device) => resources.device.insert(device),
            Err(e) => {
                error!(camera_index, "Failed to open camera: {}", e);
                self.publish(ServerEvent::error(e.to_string())).await;
                return LoopExit::OpenFailed;
            }
        };
        if let Err(e) = device.configure(self.settings.capture).await {
            warn!(camera_index, "Camera ignored capture settings, continuing: {}", e);
        }

        let landmarker = match self.landmarkers.create() {
            Ok(landmarker) => resources.landmarker.insert(landmarker),
            Err(e) => {
                error!(camera_index, "Failed to start hand landmarker: {}", e);
                self.publish(ServerEvent::error(format!(
                    "Hand tracking unavailable: {}",
                    e
                )))
                .await;
                return LoopExit::AnalysisUnavailable;
            }
        };

        info!(camera_index, "Camera opened");
        self.publish(ServerEvent::status(format!("Camera {} started.", camera_index)))
            .await;
        self.publish(ServerEvent::camera_status(Some(camera_index), true))
            .await;

        loop {
            if self.context.hub().is_empty().await {
                info!(camera_index, "No clients left, stopping capture");
                return LoopExit::NoClients;
            }

            let raw = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => return LoopExit::Cancelled,
                raw = device.read_frame() => raw,
            };
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    error!(camera_index, "Camera stopped producing frames: {}", e);
                    self.publish(ServerEvent::error(format!(
                        "Camera {} disconnected: {}",
                        camera_index, e
                    )))
                    .await;
                    return LoopExit::DeviceLost;
                }
            };

            let cycle = AssertUnwindSafe(self.process_cycle(&raw, landmarker.as_mut()))
                .catch_unwind()
                .await;
            let pause = match cycle {
                Ok(Ok(())) => self.settings.frame_interval,
                Ok(Err(CycleError::Cancelled)) => return LoopExit::Cancelled,
                Ok(Err(CycleError::Analysis(e))) => {
                    error!(camera_index, "Analysis cycle failed, backing off: {}", e);
                    self.settings.error_backoff
                }
                Err(panic) => {
                    error!(
                        camera_index,
                        "Analysis cycle panicked, backing off: {}",
                        panic_message(panic.as_ref())
                    );
                    self.settings.error_backoff
                }
            };

            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => return LoopExit::Cancelled,
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    async fn process_cycle(
        &mut self,
        raw: &DynamicImage,
        landmarker: &mut dyn HandLandmarker,
    ) -> Result<(), CycleError> {
        let frame = Frame::mirrored(self.camera_index, raw);
        let hands = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Err(CycleError::Cancelled),
            hands = landmarker.analyze(frame.image()) => hands.map_err(CycleError::Analysis)?,
        };

        let changes = self.tracker.update(&hands);
        self.context.store_fingers(self.tracker.state()).await;
        for change in &changes {
            self.publish(ServerEvent::finger_changed(*change)).await;
        }
        debug!(
            frame_id = %frame.frame_id(),
            hands = hands.len(),
            changes = changes.len(),
            "Cycle analyzed"
        );

        // Nobody to watch, skip the encode.
        if self.context.hub().is_empty().await {
            return Ok(());
        }
        let encoded = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Err(CycleError::Cancelled),
            encoded = self.settings.encoder.encode(&frame, &hands) => encoded,
        };
        match encoded {
            Ok(image) => self.publish(ServerEvent::VideoFrame { image }).await,
            Err(e) => warn!("Skipping frame {}: {}", frame.frame_id(), e),
        }
        Ok(())
    }

    async fn teardown(&mut self, resources: Resources, exit: LoopExit) {
        let camera_index = self.camera_index;
        let Resources { device, landmarker } = resources;
        if let Some(mut landmarker) = landmarker {
            landmarker.close().await;
        }
        if let Some(mut device) = device {
            device.release().await;
            info!(camera_index, "Camera released");
        }

        let released = self.tracker.reset();
        self.context.store_fingers(self.tracker.state()).await;
        for change in released {
            self.publish(ServerEvent::finger_changed(change)).await;
        }
        self.publish(ServerEvent::camera_status(Some(camera_index), false))
            .await;
        info!(camera_index, ?exit, "Capture loop stopped");
    }

    async fn publish(&self, event: ServerEvent) {
        self.context.hub().publish(&event).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// A spawned capture loop. Dropping the handle cancels the loop without waiting for it.
pub struct CaptureHandle {
    camera_index: u32,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<LoopExit>>,
}

impl CaptureHandle {
    pub fn spawn(capture: CaptureLoop) -> Self {
        let camera_index = capture.camera_index();
        let cancel_token = capture.cancel_token();
        Self {
            camera_index,
            cancel_token,
            task: Some(tokio::spawn(capture.run())),
        }
    }

    pub fn camera_index(&self) -> u32 {
        self.camera_index
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Cancels the loop and waits until its camera has been released.
    pub async fn stop(self) -> Option<LoopExit> {
        self.cancel_token.cancel();
        self.join().await
    }

    pub async fn join(mut self) -> Option<LoopExit> {
        let task = self.task.take()?;
        match task.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                error!(
                    camera_index = self.camera_index,
                    "Capture loop task failed: {}", e
                );
                None
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel_token.cancel();
        }
    }
}
