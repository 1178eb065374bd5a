pub mod common;
pub mod config;
pub mod error;
pub mod intake;
pub mod network;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Configuration;
pub use error::{AnalysisError, AppError, CaptureError, FrameError, SuggestionError, TrackerError};
pub use network::{AppState, BroadcastHub, ClientMessage, FeedbackBoard, ServerEvent};
pub use session::{SessionContext, SessionManager};
