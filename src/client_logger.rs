//! Logging trait for client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to
//! capture and log the traffic passing through the [`ChatGpt`] client.
//!
//! [`ChatGpt`]: crate::ChatGpt

use std::fmt;

use crate::{ConversationRequest, Reply};

/// A trait for logging client operations.
///
/// Implement this trait to capture and record all backend interactions,
/// including outgoing requests, buffered replies, individual streaming
/// events, and session lifecycle notes.
///
/// # Example
///
/// ```rust,ignore
/// use geppetto::{ClientLogger, ConversationRequest, Reply};
/// use std::sync::Mutex;
///
/// #[derive(Debug)]
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ConversationRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_reply(&self, reply: &Reply) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Reply: {}", reply.text).unwrap();
///     }
///
///     fn log_stream_event(&self, reply: &Reply) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Stream event: {}", reply.text).unwrap();
///     }
///
///     fn log_session(&self, note: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Session: {note}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: fmt::Debug + Send + Sync {
    /// Log an outgoing conversation request.
    ///
    /// Called once per `send` or `stream` call with the body about to be
    /// POSTed, before any network traffic happens.
    fn log_request(&self, request: &ConversationRequest);

    /// Log a complete reply from a buffered `send` call.
    fn log_reply(&self, reply: &Reply);

    /// Log an individual streaming event.
    ///
    /// Called for each cumulative [`Reply`] parsed off the stream.
    fn log_stream_event(&self, reply: &Reply);

    /// Log a session lifecycle note, such as a refresh or a fallback to
    /// password login.
    fn log_session(&self, note: &str);
}

/// A [`ClientLogger`] that writes everything to stderr.
///
/// This is what the chat binary installs for `--debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrLogger;

impl ClientLogger for StderrLogger {
    fn log_request(&self, request: &ConversationRequest) {
        match serde_json::to_string(request) {
            Ok(json) => eprintln!("geppetto: request: {json}"),
            Err(err) => eprintln!("geppetto: request unserializable: {err}"),
        }
    }

    fn log_reply(&self, reply: &Reply) {
        eprintln!(
            "geppetto: reply: conversation={} message={} ({} chars)",
            reply.conversation_id,
            reply.message_id,
            reply.text.len()
        );
    }

    fn log_stream_event(&self, reply: &Reply) {
        eprintln!(
            "geppetto: stream event: message={} ({} chars)",
            reply.message_id,
            reply.text.len()
        );
    }

    fn log_session(&self, note: &str) {
        eprintln!("geppetto: session: {note}");
    }
}
