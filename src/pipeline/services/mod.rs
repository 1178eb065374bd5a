pub mod annotation;
pub mod finger_tracker;
pub mod frame_encoding;
pub mod landmarker;

pub use finger_tracker::FingerStateTracker;
pub use frame_encoding::FrameEncoder;
pub use landmarker::{HandLandmarker, LandmarkerFactory, NoHandsLandmarkerFactory};
