//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::types::Model;

/// Default path to the credentials file.
const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Command-line arguments for the geppetto-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Path to the credentials file.
    #[arrrg(optional, "Path to the credentials file (default: config.json)", "PATH")]
    pub config: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: text-davinci-002-render)", "MODEL")]
    pub model: Option<String>,

    /// Display replies incrementally as the server produces them.
    #[arrrg(flag, "Display replies incrementally as they arrive")]
    pub stream: bool,

    /// Log requests and replies to stderr.
    #[arrrg(flag, "Log requests and replies to stderr")]
    pub debug: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Where to read credentials from.
    pub config_path: PathBuf,

    /// The model to use for generating replies.
    pub model: Model,

    /// Whether to display replies incrementally.
    pub stream: bool,

    /// Whether to log requests and replies to stderr.
    pub debug: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Credentials file: config.json
    /// - Model: text-davinci-002-render
    /// - Streaming: disabled
    /// - Debug logging: disabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            model: Model::default(),
            stream: false,
            debug: false,
            use_color: true,
        }
    }

    /// Sets the credentials file path.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets whether replies display incrementally.
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets whether requests and replies log to stderr.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let config_path = args
            .config
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let model = args.model.map(Model::from).unwrap_or_default();

        ChatConfig {
            config_path,
            model,
            stream: args.stream,
            debug: args.debug,
            use_color: !args.no_color,
        }
    }
}
