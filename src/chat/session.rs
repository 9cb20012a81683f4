//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which drives the client
//! on behalf of the shell: sending prompts, rendering replies, and
//! exposing the thread and session controls as shell-sized operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::StreamExt;
use time::OffsetDateTime;

use crate::chat::config::ChatConfig;
use crate::chat::render::Renderer;
use crate::client::ChatGpt;
use crate::error::Result;
use crate::types::Model;

/// A chat session that connects the shell to the client.
///
/// The session owns the client and the resolved configuration.  Replies
/// render through the provided [`Renderer`]; the conversation thread and
/// the login session are controlled through dedicated methods so the
/// shell never touches the client directly.
pub struct ChatSession {
    client: ChatGpt,
    config: ChatConfig,
}

impl ChatSession {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(mut client: ChatGpt, config: ChatConfig) -> Self {
        client.set_model(config.model.clone());
        Self { client, config }
    }

    /// The model replies are requested from.
    pub fn model(&self) -> &Model {
        self.client.model()
    }

    /// The current conversation identifier, once the backend assigned one.
    pub fn conversation_id(&self) -> Option<&str> {
        self.client.conversation_id()
    }

    /// Whether replies should display incrementally.
    pub fn streaming(&self) -> bool {
        self.config.stream
    }

    /// Establish a fresh session from the configured credentials.
    ///
    /// Returns the session expiry when the backend reported one.
    pub async fn refresh_session(&mut self) -> Result<Option<OffsetDateTime>> {
        self.client.refresh_session().await?;
        Ok(self.client.session_expires_at())
    }

    /// Abandon the current conversation and start a new one.
    pub fn reset(&mut self) {
        self.client.reset_thread();
    }

    /// Undo the thread advancement of the most recent exchange.
    ///
    /// Returns true if there was an exchange to undo.
    pub fn rollback(&mut self) -> bool {
        self.client.rollback_last_turn()
    }

    /// Sends a prompt and renders the complete reply once it arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails; nothing is rendered in that
    /// case beyond what the caller chooses to print.
    pub async fn send_buffered(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let reply = self.client.send(prompt).await?;
        renderer.print_text(&reply.text);
        renderer.finish_response();
        Ok(())
    }

    /// Sends a prompt and renders the reply incrementally.
    ///
    /// The backend streams cumulative snapshots of the reply; only the
    /// unseen suffix of each snapshot is rendered, so the output reads as
    /// a continuous stream of text.  Setting `interrupted` stops
    /// consumption at the next event boundary and closes the connection;
    /// the thread keeps the position of the last event seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the stream breaks
    /// mid-reply.  Text rendered before the failure stays on screen.
    pub async fn send_streaming(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
        interrupted: Arc<AtomicBool>,
    ) -> Result<()> {
        let mut printed = String::new();
        {
            let mut events = Box::pin(self.client.stream(prompt).await?);
            while let Some(event) = events.next().await {
                if interrupted.load(Ordering::Relaxed) {
                    renderer.print_interrupted();
                    return Ok(());
                }
                let reply = event?;
                renderer.print_text(new_suffix(&printed, &reply.text));
                printed = reply.text;
            }
        }
        renderer.finish_response();
        Ok(())
    }
}

/// The part of `current` that `previous` did not already show.
///
/// Cumulative snapshots normally extend one another; if the backend
/// rewrites earlier text instead, the whole snapshot counts as new.
fn new_suffix<'a>(previous: &str, current: &'a str) -> &'a str {
    current.strip_prefix(previous).unwrap_or(current)
}
