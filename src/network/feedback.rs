use crate::error::SuggestionError;
use crate::network::server::AppState;
use async_trait::async_trait;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Where accepted suggestions go.
#[async_trait]
pub trait SuggestionSink: Send + Sync {
    async fn deliver(&self, from: IpAddr, text: &str) -> Result<(), SuggestionError>;
}

/// Records suggestions in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSuggestionSink;

#[async_trait]
impl SuggestionSink for LogSuggestionSink {
    async fn deliver(&self, from: IpAddr, text: &str) -> Result<(), SuggestionError> {
        info!(%from, "Suggestion received: {}", text);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestOutcome {
    Accepted,
    Empty,
    RateLimited,
}

/// Per-IP like and suggestion bookkeeping. Kept in memory only.
pub struct FeedbackBoard {
    likes: Mutex<HashSet<IpAddr>>,
    suggestions: Mutex<HashMap<IpAddr, u32>>,
    max_suggestions_per_ip: u32,
    sink: Arc<dyn SuggestionSink>,
}

impl FeedbackBoard {
    pub fn new(max_suggestions_per_ip: u32, sink: Arc<dyn SuggestionSink>) -> Self {
        Self {
            likes: Mutex::new(HashSet::new()),
            suggestions: Mutex::new(HashMap::new()),
            max_suggestions_per_ip,
            sink,
        }
    }

    /// Counts at most one like per address. Returns the total and whether this one counted.
    pub async fn like(&self, from: IpAddr) -> (usize, bool) {
        let mut likes = self.likes.lock().await;
        let accepted = likes.insert(from);
        (likes.len(), accepted)
    }

    pub async fn likes(&self) -> usize {
        self.likes.lock().await.len()
    }

    pub async fn suggest(&self, from: IpAddr, text: &str) -> Result<SuggestOutcome, SuggestionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SuggestOutcome::Empty);
        }

        let mut suggestions = self.suggestions.lock().await;
        let sent = suggestions.entry(from).or_insert(0);
        if *sent >= self.max_suggestions_per_ip {
            warn!(%from, "Suggestion limit reached");
            return Ok(SuggestOutcome::RateLimited);
        }
        self.sink.deliver(from, text).await?;
        *sent += 1;
        Ok(SuggestOutcome::Accepted)
    }
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub likes: usize,
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn like_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Json<LikeResponse> {
    let (likes, accepted) = state.feedback.like(peer.ip()).await;
    Json(LikeResponse { likes, accepted })
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(request): Json<SuggestionRequest>,
) -> Response {
    match state.feedback.suggest(peer.ip(), &request.text).await {
        Ok(SuggestOutcome::Accepted) => (StatusCode::OK, "Suggestion sent.").into_response(),
        Ok(SuggestOutcome::Empty) => {
            (StatusCode::BAD_REQUEST, "Suggestion text is empty.").into_response()
        }
        Ok(SuggestOutcome::RateLimited) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Suggestion limit reached for this address.",
        )
            .into_response(),
        Err(e) => {
            error!(peer = %peer, "Failed to deliver suggestion: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not send suggestion.").into_response()
        }
    }
}
