use crate::config::Configuration;
use crate::error::AppError;
use crate::network::connection::websocket_handler;
use crate::network::feedback::{like_handler, suggest_handler, FeedbackBoard};
use crate::session::SessionManager;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub feedback: Arc<FeedbackBoard>,
    pub configuration: Arc<Configuration>,
}

pub fn create_router(state: AppState) -> Router {
    let sounds = ServeDir::new(&state.configuration.sounds_dir);
    let frontend = ServeDir::new(&state.configuration.frontend_dir);
    Router::new()
        .route("/", get(serve_index))
        .route("/ws", get(websocket_handler))
        .route("/like", post(like_handler))
        .route("/suggest", post(suggest_handler))
        .nest_service("/sounds", sounds)
        .fallback_service(frontend)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_index(State(state): State<AppState>) -> Response {
    let path = state.configuration.frontend_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}

/// Serves until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    if let Ok(address) = listener.local_addr() {
        info!("Listening on {}", address);
    }
    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(AppError::Serve)
}
