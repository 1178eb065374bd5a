use crate::common::Frame;
use crate::error::FrameError;
use crate::pipeline::services::annotation::annotate;
use crate::pipeline::types::HandObservation;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, RgbImage};

/// Turns a frame into the base64 JPEG carried by `video_frame` events.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
    annotate: bool,
}

impl FrameEncoder {
    pub fn new(quality: u8, annotate: bool) -> Self {
        Self { quality, annotate }
    }

    /// Runs on the blocking pool; the caller only awaits the finished payload.
    pub async fn encode(
        &self,
        frame: &Frame,
        hands: &[HandObservation],
    ) -> Result<String, FrameError> {
        let image = frame.shared_image();
        let hands = if self.annotate {
            hands.to_vec()
        } else {
            Vec::new()
        };
        let quality = self.quality;
        tokio::task::spawn_blocking(move || encode_jpeg_base64(&annotate(&image, &hands), quality))
            .await?
    }
}

pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String, FrameError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(image)?;
    Ok(STANDARD.encode(jpeg))
}
