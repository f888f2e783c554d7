//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the service.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application.
    Quit,

    /// Change the model.
    /// `None` shows the model menu.
    Model(Option<String>),

    /// List the available models.
    Models,

    /// Start a new session with a fresh handshake.
    Reset,

    /// Clear the screen.
    Clear,

    /// Undo the last exchange.
    Undo,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message. A bare `exit` also quits.
///
/// # Examples
///
/// ```
/// # use duckchat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("exit"), Some(ChatCommand::Quit));
/// assert!(parse_command("/model llama").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if input == "exit" {
        return Some(ChatCommand::Quit);
    }
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "model" => ChatCommand::Model(argument.map(|s| s.to_string())),
        "models" => ChatCommand::Models,
        "reset" => ChatCommand::Reset,
        "clear" => ChatCommand::Clear,
        "undo" => ChatCommand::Undo,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /model [name|number]   Change the model (no argument shows the menu)
  /models                List available models
  /undo                  Undo the last exchange
  /reset                 Start a new session
  /clear                 Clear the screen
  /stats                 Show session statistics
  /help                  Show this help message
  /quit, exit            Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model llama"),
            Some(ChatCommand::Model(Some("llama".to_string())))
        );
        assert_eq!(
            parse_command("/MODEL   2  "),
            Some(ChatCommand::Model(Some("2".to_string())))
        );
        assert_eq!(parse_command("/model"), Some(ChatCommand::Model(None)));
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/reset"), Some(ChatCommand::Reset));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/undo"), Some(ChatCommand::Undo));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(
            parse_command("/bogus"),
            Some(ChatCommand::Invalid("Unknown command: /bogus".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command("exit now"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/model"));
        assert!(help.contains("/undo"));
        assert!(help.contains("/reset"));
    }
}
