//! Interactive terminal chat against the DuckDuckGo AI chat service.
//!
//! # Usage
//!
//! ```bash
//! # Pick a model from the menu
//! duckchat
//!
//! # Start with a model
//! duckchat --model claude-3-haiku
//!
//! # Disable colors (useful for piping output)
//! duckchat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/model [name]` - Change the model
//! - `/undo` - Undo the last exchange
//! - `/reset` - Start a new session
//! - `/clear` - Clear the screen
//! - `/quit` or `exit` - Exit the application
//!
//! Set `DUCKCHAT_LOG` (e.g. `DUCKCHAT_LOG=debug`) to see diagnostics on stderr.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use futures::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use duckchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, INTERRUPT_POLL, PlainTextRenderer, Renderer, help_text,
    parse_command, until_interrupted,
};
use duckchat::{DuckChat, Model, Session};

/// Main entry point for the duckchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DUCKCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("duckchat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let client = DuckChat::with_options(config.base_url.clone(), Some(config.timeout))?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    renderer.clear_screen();
    renderer.print_banner();

    let model = match config.model {
        Some(model) => model,
        None => match select_model(&mut rl, &mut renderer, None) {
            Some(model) => model,
            None => return Ok(()),
        },
    };
    let mut session = match Session::init(client.clone(), model).await {
        Ok(session) => session,
        Err(err) => {
            renderer.print_error(&format!("Failed to initialize chat: {err}"));
            return Ok(());
        }
    };
    print_welcome(&mut renderer, &session);

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You > ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Model(Some(name)) => match name.parse::<Model>() {
                            Ok(model) => {
                                session.set_model(model);
                                renderer.print_info(&format!("Model changed to: {model}"));
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Model(None) => {
                            if let Some(model) =
                                select_model(&mut rl, &mut renderer, Some(session.model()))
                            {
                                session.set_model(model);
                                renderer.print_info(&format!("Model changed to: {model}"));
                            }
                        }
                        ChatCommand::Models => {
                            renderer.print_model_menu(Some(session.model()));
                        }
                        ChatCommand::Reset => {
                            let Some(model) =
                                select_model(&mut rl, &mut renderer, Some(session.model()))
                            else {
                                continue;
                            };
                            match Session::init(client.clone(), model).await {
                                Ok(fresh) => {
                                    session = fresh;
                                    renderer.clear_screen();
                                    renderer.print_banner();
                                    print_welcome(&mut renderer, &session);
                                }
                                Err(err) => renderer.print_error(&format!(
                                    "Failed to start a new session: {err}"
                                )),
                            }
                        }
                        ChatCommand::Clear => {
                            renderer.clear_screen();
                            renderer.print_banner();
                        }
                        ChatCommand::Undo => {
                            let before = session.message_count();
                            session.undo();
                            if session.message_count() < before {
                                renderer.print_info("Last exchange undone.");
                            } else {
                                renderer.print_info("Nothing to undo.");
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the service
                if let Err(e) = stream_reply(&mut session, line, &mut renderer, &interrupted).await
                {
                    renderer.print_error(&e.to_string());
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
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

/// Sends `line` and renders the reply as it streams.
///
/// An interrupt, while waiting for the response or while it streams, drops
/// the request, which leaves the session as it was.
async fn stream_reply(
    session: &mut Session,
    line: &str,
    renderer: &mut PlainTextRenderer,
    interrupted: &AtomicBool,
) -> duckchat::Result<()> {
    let Some(reply) = until_interrupted(session.send(line), interrupted, INTERRUPT_POLL).await
    else {
        renderer.print_interrupted();
        return Ok(());
    };
    let mut reply = reply?;
    renderer.start_response();
    loop {
        match until_interrupted(reply.next(), interrupted, INTERRUPT_POLL).await {
            Some(Some(fragment)) => renderer.print_text(&fragment),
            Some(None) => break,
            None => {
                renderer.print_interrupted();
                return Ok(());
            }
        }
    }
    renderer.finish_response();
    match reply.read_error() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

/// Shows the model menu until the user picks one; `None` on EOF or Ctrl+C.
fn select_model(
    rl: &mut DefaultEditor,
    renderer: &mut PlainTextRenderer,
    current: Option<Model>,
) -> Option<Model> {
    renderer.print_separator();
    renderer.print_model_menu(current);
    let prompt = format!("Select a model (1-{}): ", Model::ALL.len());
    loop {
        match rl.readline(&prompt) {
            Ok(input) => match input.parse::<Model>() {
                Ok(model) => return Some(model),
                Err(err) => renderer.print_error(&err.to_string()),
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return None,
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                return None;
            }
        }
    }
}

fn print_welcome(renderer: &mut PlainTextRenderer, session: &Session) {
    renderer.print_separator();
    renderer.print_info(&format!(
        "Chat session started (model: {}). Type /help for commands, exit to quit.",
        session.model()
    ));
    renderer.print_separator();
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!(
        "      Model: {} ({})",
        stats.model.display_name(),
        stats.model.identifier()
    );
    println!("      Messages: {}", stats.message_count);
    println!("      Exchanges: {}", stats.exchanges);
    println!("      Requests: {}", stats.requests);
}
