pub mod camera;

pub use camera::{CameraSource, CaptureDevice, FrameDirectorySource};
