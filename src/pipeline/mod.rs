pub mod capture_loop;
pub mod services;
pub mod types;

pub use capture_loop::{CaptureHandle, CaptureLoop, LoopExit, LoopSettings};
pub use services::{FingerStateTracker, FrameEncoder, HandLandmarker, LandmarkerFactory};
pub use types::{FingerChange, FingerState, HandObservation};
