//! Conversation thread state.
//!
//! The backend models a conversation as a linear chain of messages: every
//! request names the message it extends, and every reply names the message
//! the next request should extend.  This module tracks that position, with
//! one level of undo for walking back a turn that went wrong.

use crate::utils::ids;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    conversation_id: Option<String>,
    parent_message_id: String,
}

/// Tracks the client's position within a conversation.
#[derive(Clone, Debug)]
pub struct ConversationThread {
    conversation_id: Option<String>,
    parent_message_id: String,
    previous: Option<Snapshot>,
}

impl ConversationThread {
    /// Create a thread positioned at the start of a new conversation.
    ///
    /// The backend requires even the first message to name a parent, so a
    /// random identifier is generated for it.
    pub fn new() -> Self {
        ConversationThread {
            conversation_id: None,
            parent_message_id: ids::message_id(),
            previous: None,
        }
    }

    /// The current conversation identifier; `None` until the backend
    /// assigns one with the first reply.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// The identifier the next message will claim as its parent.
    pub fn parent_message_id(&self) -> &str {
        &self.parent_message_id
    }

    /// Record the position so the turn about to happen can be undone.
    ///
    /// Called once per send; each call replaces the prior snapshot, so
    /// only the most recent turn can be rolled back.
    pub fn begin_turn(&mut self) {
        self.previous = Some(Snapshot {
            conversation_id: self.conversation_id.clone(),
            parent_message_id: self.parent_message_id.clone(),
        });
    }

    /// Advance past a reply: future messages extend the reply's message
    /// within the conversation the backend named.
    pub fn advance(&mut self, conversation_id: String, message_id: String) {
        self.conversation_id = Some(conversation_id);
        self.parent_message_id = message_id;
    }

    /// Undo the most recent turn's advancement.
    ///
    /// Returns true if a turn was rolled back.  Without a prior turn, or
    /// called a second time, this does nothing.
    pub fn rollback(&mut self) -> bool {
        match self.previous.take() {
            Some(snapshot) => {
                self.conversation_id = snapshot.conversation_id;
                self.parent_message_id = snapshot.parent_message_id;
                true
            }
            None => false,
        }
    }

    /// Abandon the conversation: clear the conversation identifier,
    /// generate a fresh parent, and drop any rollback snapshot.
    pub fn reset(&mut self) {
        self.conversation_id = None;
        self.parent_message_id = ids::message_id();
        self.previous = None;
    }
}

impl Default for ConversationThread {
    fn default() -> Self {
        Self::new()
    }
}
