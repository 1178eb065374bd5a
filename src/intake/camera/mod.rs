pub mod device;
pub mod replay;

pub use device::{CameraSource, CaptureDevice};
pub use replay::FrameDirectorySource;
