// Public modules
pub mod api_error;
pub mod conversation;
pub mod credentials;
pub mod model;
pub mod reply;
pub mod session_info;

// Re-exports
pub use api_error::{ApiErrorBody, ErrorDetail};
pub use conversation::{ConversationRequest, MessageContent, RequestMessage, Role};
pub use credentials::{Credential, Credentials};
pub use model::{KnownModel, Model};
pub use reply::{Reply, ReplyMessage, ServerReply};
pub use session_info::SessionInfo;
