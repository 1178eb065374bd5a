use crate::config::CaptureSettings;
use crate::error::CaptureError;
use async_trait::async_trait;
use image::DynamicImage;

/// An open camera. Every method is a suspension point for the capture loop.
#[async_trait]
pub trait CaptureDevice: Send {
    /// Best effort; callers keep going when the device ignores the request.
    async fn configure(&mut self, settings: CaptureSettings) -> Result<(), CaptureError>;

    /// Next frame. Any error means the device is gone for this session.
    async fn read_frame(&mut self) -> Result<DynamicImage, CaptureError>;

    async fn release(&mut self);
}

/// Opens capture devices by index.
#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}
