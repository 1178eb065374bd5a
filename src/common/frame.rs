use chrono::{DateTime, Utc};
use image::{imageops, DynamicImage};
use std::sync::Arc;
use uuid::Uuid;

/// One captured camera image, already mirrored into the user-facing orientation.
#[derive(Clone)]
pub struct Frame {
    camera_index: u32,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
}

impl Frame {
    pub fn new(camera_index: u32, image: DynamicImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            camera_index,
            image: Arc::new(image),
            captured_at,
            frame_id: Uuid::new_v4(),
        }
    }

    /// Mirrors a raw capture horizontally, the convention for a camera facing the user.
    pub fn mirrored(camera_index: u32, raw: &DynamicImage) -> Self {
        let mirrored = DynamicImage::ImageRgb8(imageops::flip_horizontal(&raw.to_rgb8()));
        Self::new(camera_index, mirrored, Utc::now())
    }

    pub fn camera_index(&self) -> u32 {
        self.camera_index
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn shared_image(&self) -> Arc<DynamicImage> {
        Arc::clone(&self.image)
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }
}
