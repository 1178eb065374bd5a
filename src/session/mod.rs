pub mod context;
pub mod manager;

pub use context::SessionContext;
pub use manager::{SessionManager, SessionManagerBuilder};
