use crate::error::AppError;
use crate::intake::camera::CameraSource;
use crate::network::events::{ClientMessage, ServerEvent};
use crate::network::hub::{ClientHandle, ClientId};
use crate::pipeline::capture_loop::{CaptureHandle, CaptureLoop, LoopExit, LoopSettings};
use crate::pipeline::services::LandmarkerFactory;
use crate::session::SessionContext;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const CONNECTED_MESSAGE: &str = "Connected to server.";

/// The one camera selection in the process and the loop serving it, if any.
/// `index` is only set while a loop has been started and not yet stopped or reaped.
#[derive(Default)]
struct CameraSession {
    index: Option<u32>,
    active: Option<CaptureHandle>,
    shutting_down: bool,
}

impl CameraSession {
    fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| handle.is_running())
    }

    /// Drops the handle of a loop that already ended on its own and returns to idle.
    async fn reap(&mut self) {
        if self.active.is_some() && !self.is_running() {
            if let Some(handle) = self.active.take() {
                let exit = handle.join().await;
                debug!(camera_index = ?self.index, ?exit, "Reaped finished capture loop");
            }
            self.index = None;
        }
    }

    /// Cancels the active loop, waits for its teardown to release the camera and returns
    /// to idle.
    async fn stop(&mut self) -> Option<LoopExit> {
        let handle = self.active.take()?;
        let exit = handle.stop().await;
        if let Some(exit) = exit {
            info!(camera_index = ?self.index, ?exit, "Capture loop stopped");
        }
        self.index = None;
        exit
    }
}

/// Owns the camera session and routes every connect, disconnect and camera request
/// through one lock, so two loops never hold a camera at the same time.
pub struct SessionManager {
    context: Arc<SessionContext>,
    camera: Mutex<CameraSession>,
    source: Arc<dyn CameraSource>,
    landmarkers: Arc<dyn LandmarkerFactory>,
    settings: LoopSettings,
}

impl SessionManager {
    pub fn builder(settings: LoopSettings) -> SessionManagerBuilder {
        SessionManagerBuilder::new(settings)
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Registers the client, then sends it the greeting, the current finger snapshot and
    /// the camera status. Nothing here is broadcast.
    pub async fn connect(&self, client: ClientHandle) {
        let id = client.id();
        let mut camera = self.camera.lock().await;
        if camera.shutting_down {
            // Dropping the handle ends the connection's channel.
            debug!(client_id = %id, "Refusing client during shutdown");
            return;
        }
        camera.reap().await;
        let hub = self.context.hub();
        hub.register(client).await;

        let fingers = self.context.fingers().await;
        hub.send_to(id, &ServerEvent::status(CONNECTED_MESSAGE)).await;
        hub.send_to(id, &ServerEvent::InitialState { fingers }).await;
        hub.send_to(id, &ServerEvent::camera_status(camera.index, camera.is_running()))
            .await;
    }

    pub async fn handle_message(&self, id: ClientId, message: ClientMessage) {
        match message {
            ClientMessage::SetCameraIndex { index } => self.request_camera(id, index).await,
            ClientMessage::Other => {
                debug!(client_id = %id, "Ignoring unsupported message type");
            }
        }
    }

    /// Starts, restarts or keeps the capture loop for `requested`.
    pub async fn request_camera(&self, id: ClientId, requested: i64) {
        let Ok(index) = u32::try_from(requested) else {
            warn!(client_id = %id, requested, "Ignoring invalid camera index");
            return;
        };

        let mut camera = self.camera.lock().await;
        if camera.shutting_down {
            debug!(client_id = %id, camera_index = index, "Ignoring camera request during shutdown");
            return;
        }
        camera.reap().await;
        let hub = self.context.hub();

        if camera.index == Some(index) && camera.is_running() {
            debug!(client_id = %id, camera_index = index, "Camera already running");
            let fingers = self.context.fingers().await;
            hub.send_to(id, &ServerEvent::InitialState { fingers }).await;
            return;
        }

        camera.stop().await;

        if hub.is_empty().await {
            info!(camera_index = index, "No clients connected, camera not started");
            hub.publish(&ServerEvent::camera_status(Some(index), false))
                .await;
            return;
        }

        let capture = CaptureLoop::new(
            index,
            Arc::clone(&self.context),
            Arc::clone(&self.source),
            Arc::clone(&self.landmarkers),
            self.settings,
        );
        camera.index = Some(index);
        camera.active = Some(CaptureHandle::spawn(capture));
        info!(client_id = %id, camera_index = index, "Capture loop started");
    }

    /// Unregisters the client. When no clients remain the loop is stopped before returning,
    /// even if a failed send already removed this client from the hub.
    pub async fn disconnect(&self, id: ClientId) {
        let mut camera = self.camera.lock().await;
        let hub = self.context.hub();
        hub.unregister(id).await;
        if hub.is_empty().await && camera.active.is_some() {
            info!(client_id = %id, "Last client left, stopping capture");
            camera.stop().await;
        }
    }

    /// Selected camera and whether a loop is currently serving it.
    pub async fn camera_status(&self) -> (Option<u32>, bool) {
        let mut camera = self.camera.lock().await;
        camera.reap().await;
        (camera.index, camera.is_running())
    }

    /// Stops the capture loop, waits for the camera to be released, then closes every client.
    /// Later connects and camera requests are refused.
    pub async fn shutdown(&self) {
        let mut camera = self.camera.lock().await;
        camera.shutting_down = true;
        info!("Stopping capture for shutdown");
        camera.stop().await;
        self.context.hub().close_all().await;
    }
}

pub struct SessionManagerBuilder {
    settings: LoopSettings,
    context: Option<Arc<SessionContext>>,
    source: Option<Arc<dyn CameraSource>>,
    landmarkers: Option<Arc<dyn LandmarkerFactory>>,
}

impl SessionManagerBuilder {
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            settings,
            context: None,
            source: None,
            landmarkers: None,
        }
    }

    pub fn camera_source(mut self, source: Arc<dyn CameraSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn landmarker_factory(mut self, landmarkers: Arc<dyn LandmarkerFactory>) -> Self {
        self.landmarkers = Some(landmarkers);
        self
    }

    // Shares an existing context instead of creating a fresh one.
    pub fn context(mut self, context: Arc<SessionContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn build(self) -> Result<SessionManager, AppError> {
        let source = self
            .source
            .ok_or(AppError::Session("Camera source not set".to_string()))?;
        let landmarkers = self
            .landmarkers
            .ok_or(AppError::Session("Landmarker factory not set".to_string()))?;
        Ok(SessionManager {
            context: self.context.unwrap_or_default(),
            camera: Mutex::new(CameraSession::default()),
            source,
            landmarkers,
            settings: self.settings,
        })
    }
}
