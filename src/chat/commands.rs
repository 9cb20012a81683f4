//! Shell command parsing for the chat application.
//!
//! This module handles the whole-line keywords that control the chat
//! session without sending anything to the backend.  Any other input is
//! treated as a prompt.

/// A parsed shell command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Force a session refresh.
    Session,

    /// Clear the screen of the current exchange.
    Clear,

    /// Start a fresh conversation thread.
    New,

    /// Undo the thread advancement from the last completed turn.
    Rollback,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,
}

/// Parses user input for shell commands.
///
/// Commands are whole-line keywords; input with additional words is a
/// prompt, not a command.  Returns `Some(ShellCommand)` if the input is a
/// command, or `None` if it should be sent to the backend.
///
/// # Examples
///
/// ```
/// # use geppetto::chat::{parse_command, ShellCommand};
/// assert_eq!(parse_command("session"), Some(ShellCommand::Session));
/// assert_eq!(parse_command("exit"), Some(ShellCommand::Quit));
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ShellCommand> {
    let command = match input.trim().to_lowercase().as_str() {
        "session" => ShellCommand::Session,
        "clear" => ShellCommand::Clear,
        "new" => ShellCommand::New,
        "rollback" => ShellCommand::Rollback,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => return None,
    };
    Some(command)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  session     Refresh the session token
  clear       Clear the current exchange from the screen
  new         Start a fresh conversation
  rollback    Undo the last exchange
  help        Show this help message
  exit        Exit the chat

Anything else is sent to the assistant as a prompt."#
}
