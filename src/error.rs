use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to bind to {1}: {0}")]
    Bind(std::io::Error, String),
    #[error("Server error: {0}")]
    Serve(std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Session error: {0}")]
    Session(String),
}

// Camera device errors, all fatal to the capture session that raised them
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("Failed to read frame: {0}")]
    Read(String),
    #[error("Camera returned an empty frame")]
    EmptyFrame,
    #[error("Camera ignored configuration: {0}")]
    Configure(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to start hand landmarker: {0}")]
    Init(String),
    #[error("Hand landmarker failed: {0}")]
    Inference(String),
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Hand has {found} landmarks, landmark {needed} is required")]
    MissingLandmark { needed: usize, found: usize },
}

#[derive(Error, Debug)]
pub enum SuggestionError {
    #[error("Failed to deliver suggestion: {0}")]
    Delivery(String),
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Encoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
