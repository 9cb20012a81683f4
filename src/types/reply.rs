use serde::{Deserialize, Serialize};

use crate::types::MessageContent;

/// An assistant message as the backend reports it in `data:` payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyMessage {
    /// Identifier of the assistant message; the next turn's parent.
    pub id: String,

    /// The content of the message.
    pub content: MessageContent,
}

/// One `data:` payload from the conversation endpoint.
///
/// The backend emits these cumulatively while streaming: each payload
/// carries the full text produced so far, not a delta.  Unrecognized
/// fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerReply {
    /// The assistant message so far.
    pub message: ReplyMessage,

    /// The conversation this reply belongs to.
    pub conversation_id: String,
}

impl ServerReply {
    /// Convert into a [`Reply`], or `None` when the payload carries no
    /// text parts.  Part-less payloads occur as stream noise and are
    /// skipped by callers.
    pub fn into_reply(self) -> Option<Reply> {
        if self.message.content.parts.is_empty() {
            return None;
        }
        Some(Reply {
            text: self.message.content.joined(),
            conversation_id: self.conversation_id,
            message_id: self.message.id,
        })
    }
}

/// An assistant reply as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The assistant's text.  While streaming this is the cumulative
    /// text so far, matching what the backend sends.
    pub text: String,

    /// The conversation the reply extends.
    pub conversation_id: String,

    /// The assistant message identifier, which parents the next turn.
    pub message_id: String,
}
