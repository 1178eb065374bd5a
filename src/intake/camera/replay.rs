use crate::config::CaptureSettings;
use crate::error::CaptureError;
use crate::intake::camera::{CameraSource, CaptureDevice};
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Camera source backed by recorded frames on disk.
///
/// Camera `i` is the directory `<root>/<i>/`; its image files are replayed in name order,
/// looping forever. A missing or empty directory fails to open, like an unplugged camera.
#[derive(Debug, Clone)]
pub struct FrameDirectorySource {
    root: PathBuf,
}

impl FrameDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut frames = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_image(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[async_trait]
impl CameraSource for FrameDirectorySource {
    async fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let dir = self.root.join(index.to_string());
        let frames = Self::list_frames(&dir)
            .await
            .map_err(|e| CaptureError::Open {
                index,
                reason: format!("{}: {}", dir.display(), e),
            })?;
        if frames.is_empty() {
            return Err(CaptureError::Open {
                index,
                reason: format!("no frames in {}", dir.display()),
            });
        }
        info!("Replaying {} frames for camera {}", frames.len(), index);
        Ok(Box::new(FrameDirectoryDevice {
            index,
            frames,
            position: 0,
            settings: None,
            next_due: None,
        }))
    }
}

struct FrameDirectoryDevice {
    index: u32,
    frames: Vec<PathBuf>,
    position: usize,
    settings: Option<CaptureSettings>,
    next_due: Option<Instant>,
}

impl FrameDirectoryDevice {
    fn frame_period(&self) -> Option<Duration> {
        self.settings
            .filter(|settings| settings.fps > 0)
            .map(|settings| Duration::from_secs_f64(1.0 / f64::from(settings.fps)))
    }
}

#[async_trait]
impl CaptureDevice for FrameDirectoryDevice {
    async fn configure(&mut self, settings: CaptureSettings) -> Result<(), CaptureError> {
        if settings.width == 0 || settings.height == 0 {
            return Err(CaptureError::Configure(format!(
                "camera {} cannot replay at {}x{}",
                self.index, settings.width, settings.height
            )));
        }
        debug!(
            "Camera {} configured for {}x{} at {} fps",
            self.index, settings.width, settings.height, settings.fps
        );
        self.settings = Some(settings);
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        if self.frames.is_empty() {
            return Err(CaptureError::Read(format!(
                "camera {} has been released",
                self.index
            )));
        }
        if let Some(due) = self.next_due {
            tokio::time::sleep_until(due).await;
        }
        self.next_due = self.frame_period().map(|period| Instant::now() + period);

        let path = &self.frames[self.position];
        self.position = (self.position + 1) % self.frames.len();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CaptureError::Read(format!("{}: {}", path.display(), e)))?;
        let mut image = image::load_from_memory(&bytes)
            .map_err(|e| CaptureError::Read(format!("{}: {}", path.display(), e)))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptureError::EmptyFrame);
        }

        if let Some(settings) = self.settings {
            let wanted = (settings.width, settings.height);
            if wanted.0 > 0 && wanted.1 > 0 && (image.width(), image.height()) != wanted {
                image = image.resize_exact(wanted.0, wanted.1, FilterType::Triangle);
            }
        }
        Ok(image)
    }

    async fn release(&mut self) {
        debug!("Releasing replay camera {}", self.index);
        self.frames.clear();
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frame(dir: &Path, name: &str, color: [u8; 3]) {
        RgbImage::from_pixel(8, 6, Rgb(color))
            .save(dir.join(name))
            .unwrap();
    }

    fn camera_dir(root: &Path, index: u32) -> PathBuf {
        let dir = root.join(index.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn replays_frames_in_name_order_and_loops() {
        let root = tempfile::tempdir().unwrap();
        let dir = camera_dir(root.path(), 0);
        write_frame(&dir, "b.png", [0, 255, 0]);
        write_frame(&dir, "a.png", [255, 0, 0]);
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let source = FrameDirectorySource::new(root.path());
        let mut device = source.open(0).await.unwrap();
        let colors: Vec<[u8; 3]> = {
            let mut colors = Vec::new();
            for _ in 0..3 {
                let frame = device.read_frame().await.unwrap().to_rgb8();
                colors.push(frame.get_pixel(0, 0).0);
            }
            colors
        };
        assert_eq!(colors, vec![[255, 0, 0], [0, 255, 0], [255, 0, 0]]);
    }

    #[tokio::test]
    async fn missing_or_empty_camera_fails_to_open() {
        let root = tempfile::tempdir().unwrap();
        camera_dir(root.path(), 1);
        let source = FrameDirectorySource::new(root.path());

        assert!(matches!(
            source.open(0).await,
            Err(CaptureError::Open { index: 0, .. })
        ));
        assert!(matches!(
            source.open(1).await,
            Err(CaptureError::Open { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn configured_resolution_is_applied() {
        let root = tempfile::tempdir().unwrap();
        let dir = camera_dir(root.path(), 0);
        write_frame(&dir, "frame.png", [10, 20, 30]);

        let mut device = FrameDirectorySource::new(root.path())
            .open(0)
            .await
            .unwrap();
        device
            .configure(CaptureSettings {
                width: 16,
                height: 12,
                fps: 1000,
            })
            .await
            .unwrap();
        let frame = device.read_frame().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 12));
    }

    #[tokio::test]
    async fn zero_resolution_is_rejected_and_native_size_kept() {
        let root = tempfile::tempdir().unwrap();
        let dir = camera_dir(root.path(), 0);
        write_frame(&dir, "frame.png", [10, 20, 30]);

        let mut device = FrameDirectorySource::new(root.path())
            .open(0)
            .await
            .unwrap();
        let configured = device
            .configure(CaptureSettings {
                width: 0,
                height: 12,
                fps: 30,
            })
            .await;
        assert!(matches!(configured, Err(CaptureError::Configure(_))));
        let frame = device.read_frame().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
    }

    #[tokio::test]
    async fn released_device_stops_producing_frames() {
        let root = tempfile::tempdir().unwrap();
        let dir = camera_dir(root.path(), 3);
        write_frame(&dir, "frame.jpg", [1, 1, 1]);

        let mut device = FrameDirectorySource::new(root.path())
            .open(3)
            .await
            .unwrap();
        assert!(device.read_frame().await.is_ok());
        device.release().await;
        assert!(matches!(
            device.read_frame().await,
            Err(CaptureError::Read(_))
        ));
    }
}
