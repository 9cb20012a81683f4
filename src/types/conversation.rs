use serde::{Deserialize, Serialize};

use crate::types::Model;
use crate::utils::ids;

/// Role type for a conversation message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// The content of a conversation message.
///
/// The backend transports message text as a parts array under a
/// `content_type` discriminator; only `"text"` is spoken here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageContent {
    /// Content type discriminator.
    pub content_type: String,

    /// The message text, one part per segment.
    pub parts: Vec<String>,
}

impl MessageContent {
    /// Create text content from a single part.
    pub fn text(part: impl Into<String>) -> Self {
        MessageContent {
            content_type: "text".to_string(),
            parts: vec![part.into()],
        }
    }

    /// The concatenation of all parts.
    pub fn joined(&self) -> String {
        self.parts.concat()
    }
}

/// A single message within a conversation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestMessage {
    /// Randomly generated message identifier.
    pub id: String,

    /// The role of the message.
    pub role: Role,

    /// The content of the message.
    pub content: MessageContent,
}

impl RequestMessage {
    /// Create a user message with a freshly generated identifier.
    pub fn user(text: impl Into<String>) -> Self {
        RequestMessage {
            id: ids::message_id(),
            role: Role::User,
            content: MessageContent::text(text),
        }
    }
}

/// The body POSTed to the conversation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationRequest {
    /// Always `"next"` for requesting the next assistant turn.
    pub action: String,

    /// The messages for this turn; a single user message in practice.
    pub messages: Vec<RequestMessage>,

    /// The conversation this turn extends.  Serialized as `null` for the
    /// first turn of a new conversation; the backend treats the two cases
    /// differently, so the field is never omitted.
    pub conversation_id: Option<String>,

    /// The identifier of the message this turn replies to.
    pub parent_message_id: String,

    /// The model asked to produce the reply.
    pub model: Model,
}

impl ConversationRequest {
    /// Create a `"next"` request for a single user prompt.
    pub fn next(
        prompt: impl Into<String>,
        conversation_id: Option<String>,
        parent_message_id: impl Into<String>,
        model: Model,
    ) -> Self {
        ConversationRequest {
            action: "next".to_string(),
            messages: vec![RequestMessage::user(prompt)],
            conversation_id,
            parent_message_id: parent_message_id.into(),
            model,
        }
    }
}
