//! Interactive chat application for conversing with the ChatGPT web backend.
//!
//! This binary provides a REPL interface around the geppetto client.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with credentials in ./config.json
//! geppetto-chat
//!
//! # Credentials elsewhere, streaming display
//! geppetto-chat --config ~/.config/geppetto.json --stream
//!
//! # One-shot mode: arguments form the prompt
//! geppetto-chat explain the borrow checker
//!
//! # Disable colors (useful for piping output)
//! geppetto-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, whole-line keywords control the session:
//! - `help` - Show available commands
//! - `session` - Refresh the session token
//! - `clear` - Clear the current exchange from the screen
//! - `new` - Start a fresh conversation
//! - `rollback` - Undo the last exchange
//! - `exit` - Exit the application

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use geppetto::chat::{
    ChatArgs, ChatConfig, ChatSession, PlainTextRenderer, Renderer, ShellCommand, help_text,
    parse_command,
};
use geppetto::{ChatGpt, Credentials, StderrLogger};

/// Main entry point for the geppetto-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = ChatArgs::from_command_line_relaxed("geppetto-chat [OPTIONS] [PROMPT]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;
    let debug = config.debug;

    let credentials = load_credentials(&config.config_path);
    let mut client = ChatGpt::new(credentials)?;
    if debug {
        client = client.with_logger(Arc::new(StderrLogger));
    }
    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);

    println!("Logging in...");
    if let Err(err) = session.refresh_session().await {
        eprintln!("Login failed: {err}");
        if err.is_captcha() {
            eprintln!("Password login is gated by a CAPTCHA this client cannot solve.");
            eprintln!("Log in with a browser and configure session_token instead.");
        } else {
            eprintln!("Check the credentials in your configuration file.");
            eprintln!("If password login keeps failing, configure session_token instead.");
        }
        std::process::exit(1);
    }

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    // One-shot mode: the command line carries the prompt.
    if !free.is_empty() {
        let prompt = free.join(" ");
        println!("ChatGPT:");
        let result = if session.streaming() {
            session
                .send_streaming(&prompt, &mut renderer, interrupted.clone())
                .await
        } else {
            session.send_buffered(&prompt, &mut renderer).await
        };
        if let Err(err) = result {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut rl = DefaultEditor::new()?;

    println!("Geppetto (model: {})", session.model());
    println!("Type help for commands, exit to quit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for whole-line commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ShellCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ShellCommand::Session => match session.refresh_session().await {
                            Ok(Some(expires)) => renderer.print_info(&format!(
                                "* Session refreshed (expires {})",
                                format_expiry(expires)
                            )),
                            Ok(None) => renderer.print_info("* Session refreshed"),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ShellCommand::Clear => {
                            // Cosmetic only; the thread is untouched.  Use
                            // `new` to actually start over.
                            renderer.print_info("* Conversation cleared");
                        }
                        ShellCommand::New => {
                            session.reset();
                            renderer.print_info("* Started a new conversation");
                        }
                        ShellCommand::Rollback => {
                            if session.rollback() {
                                renderer.print_info("* Rolled back the last exchange");
                            } else {
                                renderer.print_info("* Nothing to roll back");
                            }
                        }
                        ShellCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                if !session.streaming() {
                    renderer.print_info("(thinking; the full reply can take a while)");
                }
                println!("ChatGPT:");
                let result = if session.streaming() {
                    session
                        .send_streaming(line, &mut renderer, interrupted.clone())
                        .await
                } else {
                    session.send_buffered(line, &mut renderer).await
                };
                if let Err(err) = result {
                    renderer.print_error(&err.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Load credentials from the configured file, falling back to the
/// environment, or exit with guidance when neither is usable.
fn load_credentials(path: &Path) -> Credentials {
    if path.exists() {
        match Credentials::from_file(path) {
            Ok(credentials) => credentials,
            Err(err) => {
                eprintln!("Could not load {}: {err}", path.display());
                std::process::exit(1);
            }
        }
    } else {
        let credentials = Credentials::from_env();
        if credentials.resolve().is_none() {
            eprintln!(
                "{} not found and no GEPPETTO_* variables are set.",
                path.display()
            );
            eprintln!("Create a JSON file holding at least one of these credential shapes:");
            eprintln!("  {{\"session_token\": \"<__Secure-next-auth.session-token cookie>\"}}");
            eprintln!("  {{\"email\": \"you@example.org\", \"password\": \"...\"}}");
            eprintln!("  {{\"Authorization\": \"<bearer access token>\"}}");
            eprintln!("or pass --config PATH to point at an existing file.");
            std::process::exit(1);
        }
        credentials
    }
}

fn format_expiry(expires: OffsetDateTime) -> String {
    expires
        .format(&Rfc3339)
        .unwrap_or_else(|_| expires.to_string())
}
