//! Chat application module for interactive conversations with the backend.
//!
//! This module provides the REPL chat interface built on top of the
//! geppetto client library. It supports:
//!
//! - Buffered replies or incremental streaming display
//! - ANSI-styled output with a plain-text fallback
//! - Whole-line commands for session and thread control
//! - Configurable credentials file and model
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and client interaction
//! - [`commands`]: Shell command parsing
//! - [`render`]: Output rendering

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ShellCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
pub use session::ChatSession;
