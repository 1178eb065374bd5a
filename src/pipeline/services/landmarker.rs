use crate::error::AnalysisError;
use crate::pipeline::types::HandObservation;
use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

/// One hand-landmark analysis session. Owned by a single capture loop.
#[async_trait]
pub trait HandLandmarker: Send {
    async fn analyze(
        &mut self,
        image: &DynamicImage,
    ) -> Result<Vec<HandObservation>, AnalysisError>;

    async fn close(&mut self);
}

/// Creates a fresh landmarker session for every capture loop.
pub trait LandmarkerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn HandLandmarker>, AnalysisError>;
}

/// Reports an empty scene for every frame. Used when no landmark model is plugged in,
/// so frames still stream and every finger reads up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHandsLandmarkerFactory;

impl LandmarkerFactory for NoHandsLandmarkerFactory {
    fn create(&self) -> Result<Box<dyn HandLandmarker>, AnalysisError> {
        Ok(Box::new(NoHandsLandmarker))
    }
}

struct NoHandsLandmarker;

#[async_trait]
impl HandLandmarker for NoHandsLandmarker {
    async fn analyze(
        &mut self,
        _image: &DynamicImage,
    ) -> Result<Vec<HandObservation>, AnalysisError> {
        Ok(Vec::new())
    }

    async fn close(&mut self) {
        debug!("Closing empty landmarker session");
    }
}
