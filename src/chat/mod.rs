//! Chat application module for interactive conversations.
//!
//! This module provides the pieces of the streaming REPL built on top of
//! [`Session`](crate::Session):
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//! - [`interrupt`]: Ctrl+C cancellation of in-flight requests
//! - [`render`]: Terminal output

mod commands;
mod config;
mod interrupt;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use interrupt::{INTERRUPT_POLL, until_interrupted};
pub use render::{PlainTextRenderer, Renderer};
