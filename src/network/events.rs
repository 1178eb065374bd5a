use crate::pipeline::types::{FingerChange, FingerState};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything the server pushes to browsers, one JSON object per text message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Status { message: String },
    Error { message: String },
    FingerDown { finger_id: usize },
    FingerUp { finger_id: usize },
    /// Base64 JPEG without a data-URL prefix.
    VideoFrame { image: String },
    CameraStatus { index: Option<u32>, running: bool },
    InitialState { fingers: FingerState },
}

impl ServerEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn camera_status(index: Option<u32>, running: bool) -> Self {
        Self::CameraStatus { index, running }
    }

    pub fn finger_changed(change: FingerChange) -> Self {
        if change.down {
            Self::FingerDown {
                finger_id: change.slot,
            }
        } else {
            Self::FingerUp {
                finger_id: change.slot,
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
            Self::FingerDown { .. } => "finger_down",
            Self::FingerUp { .. } => "finger_up",
            Self::VideoFrame { .. } => "video_frame",
            Self::CameraStatus { .. } => "camera_status",
            Self::InitialState { .. } => "initial_state",
        }
    }

    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Failed to serialize {} event: {}", self.kind(), e);
                None
            }
        }
    }
}

/// Inbound browser messages. Unknown `type`s parse as `Other` and are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SetCameraIndex { index: i64 },
    #[serde(other)]
    Other,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
