pub mod connection;
pub mod events;
pub mod feedback;
pub mod hub;
pub mod server;

pub use events::{ClientMessage, ServerEvent};
pub use feedback::{FeedbackBoard, LogSuggestionSink, SuggestionSink};
pub use hub::{BroadcastHub, ClientHandle, ClientId};
pub use server::{create_router, serve, AppState};
