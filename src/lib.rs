// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod session;
pub mod sse;
pub mod thread;
pub mod types;
pub mod utils;

// Re-exports
pub use client::ChatGpt;
pub use client_logger::{ClientLogger, StderrLogger};
pub use error::{Error, Result};
pub use session::{LoginOutcome, LoginProvider, Session, SessionManager, SessionState};
pub use thread::ConversationThread;
pub use types::*;
