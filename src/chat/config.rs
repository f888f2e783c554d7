//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the driver runs with.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::error::Error;
use crate::model::Model;

/// Default connect/handshake timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Command-line arguments for the duckchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model alias to start with; skips the model menu.
    #[arrrg(optional, "Model alias or menu number (default: show the menu)", "MODEL")]
    pub model: Option<String>,

    /// Base URL of the chat service.
    #[arrrg(optional, "Service base URL (default: $DUCKCHAT_BASE_URL or the public service)", "URL")]
    pub base_url: Option<String>,

    /// Connect and handshake timeout in seconds.
    #[arrrg(optional, "Connect/handshake timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for the chat application.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to start with; `None` means ask the user.
    pub model: Option<Model>,

    /// Base URL override; `None` defers to the environment and the default.
    pub base_url: Option<String>,

    /// Connect and handshake timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: chosen interactively
    /// - Base URL: environment or public service
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: None,
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS.into()),
            use_color: true,
        }
    }

    /// Sets the starting model.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the connect and handshake timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
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

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let model = args.model.map(|s| s.parse::<Model>()).transpose()?;
        if args.timeout == Some(0) {
            return Err(Error::validation(
                "timeout must be at least one second",
                Some("timeout".to_string()),
            ));
        }
        let timeout = args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(ChatConfig {
            model,
            base_url: args.base_url,
            timeout: Duration::from_secs(timeout.into()),
            use_color: !args.no_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.model.is_none());
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("claude-3-haiku".to_string()),
            base_url: Some("http://localhost:8080/".to_string()),
            timeout: Some(5),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Some(Model::Claude3Haiku));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_rejects_bad_values() {
        let args = ChatArgs {
            model: Some("gpt-5".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());

        let args = ChatArgs {
            timeout: Some(0),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Llama)
            .with_base_url("http://127.0.0.1:1234/")
            .with_timeout(Duration::from_secs(10))
            .without_color();

        assert_eq!(config.model, Some(Model::Llama));
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:1234/"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.use_color);
    }
}
