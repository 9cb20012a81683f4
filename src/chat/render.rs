//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation uses ANSI
//! escape codes to style reply text differently from shell notices.

use std::io::{self, Stdout, Write};

/// ANSI escape code for the gold tint replies are shown in.
const ANSI_GOLD: &str = "\x1b[38;5;179m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for dim text (used for shell notices).
const ANSI_DIM: &str = "\x1b[2m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Alternative front-ends such as a TUI
pub trait Renderer: Send {
    /// Print a chunk of reply text.
    ///
    /// In streaming mode this is called once per increment as the backend
    /// produces it; in buffered mode it is called once with the full reply.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational shell notice.
    fn print_info(&mut self, info: &str);

    /// Called when a reply is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer outputs text directly to stdout with optional ANSI
/// escape codes for styling reply text and shell notices.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_reply: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            use_color: true,
            in_reply: false,
        }
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_reply: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn reset_reply(&mut self) {
        if self.in_reply {
            if self.use_color {
                print!("{ANSI_RESET}");
            }
            self.in_reply = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        if self.use_color && !self.in_reply {
            print!("{ANSI_GOLD}");
        }
        self.in_reply = true;
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.reset_reply();
        eprintln!("\nError: {error}");
    }

    fn print_info(&mut self, info: &str) {
        self.reset_reply();
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }

    fn finish_response(&mut self) {
        self.reset_reply();
        // The reply itself carries no trailing newline; terminate it and
        // leave a blank line before the next prompt.
        println!();
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.reset_reply();
        println!("\n[interrupted]");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn reset_reply_is_idempotent() {
        let mut renderer = PlainTextRenderer::with_color(false);
        renderer.in_reply = true;
        renderer.reset_reply();
        assert!(!renderer.in_reply);
        renderer.reset_reply();
        assert!(!renderer.in_reply);
    }
}
