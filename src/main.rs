use finger_stream::error::AppError;
use finger_stream::intake::FrameDirectorySource;
use finger_stream::network::{serve, AppState, FeedbackBoard, LogSuggestionSink};
use finger_stream::pipeline::services::NoHandsLandmarkerFactory;
use finger_stream::pipeline::LoopSettings;
use finger_stream::{Configuration, SessionManager};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finger_stream=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal(session: Arc<SessionManager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested");
    session.shutdown().await;
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let configuration = Configuration::load()?;
    info!("Starting finger-stream v{}", env!("CARGO_PKG_VERSION"));

    let session = SessionManager::builder(LoopSettings::from(&configuration))
        .camera_source(Arc::new(FrameDirectorySource::new(&configuration.frames_dir)))
        .landmarker_factory(Arc::new(NoHandsLandmarkerFactory))
        .build()?;
    let session = Arc::new(session);
    let feedback = Arc::new(FeedbackBoard::new(
        configuration.max_suggestions_per_ip,
        Arc::new(LogSuggestionSink),
    ));

    let address = configuration.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::Bind(e, address.clone()))?;

    let state = AppState {
        session: Arc::clone(&session),
        feedback,
        configuration: Arc::new(configuration),
    };
    serve(listener, state, shutdown_signal(session)).await?;
    info!("Server stopped");
    Ok(())
}
