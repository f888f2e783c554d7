//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the driver
//! does not care whether output is styled. The default implementation uses
//! ANSI escape codes.

use std::io::{self, Stdout, Write};

use crate::model::Model;

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for banners and separators).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for informational messages).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for assistant output).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape sequence clearing the screen and homing the cursor.
const ANSI_CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const BANNER: &str = r#"
     _            _        _           _
  __| |_   _  ___| | _____| |__   __ _| |_
 / _` | | | |/ __| |/ / __| '_ \ / _` | __|
| (_| | |_| | (__|   < (__| | | | (_| | |_
 \__,_|\__,_|\___|_|\_\___|_| |_|\__,_|\__|
"#;

const SEPARATOR: &str = "═══════════════════════════════════════════════════════";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print the application banner.
    fn print_banner(&mut self);

    /// Print a separator line.
    fn print_separator(&mut self);

    /// Print the numbered model menu.
    fn print_model_menu(&mut self, current: Option<Model>);

    /// Called before the first fragment of a response.
    fn start_response(&mut self);

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed.
    fn print_text(&mut self, text: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Clear the terminal.
    fn clear_screen(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_response: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn end_response(&mut self) {
        if self.in_response {
            if self.use_color {
                print!("{ANSI_RESET}");
            }
            self.in_response = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_banner(&mut self) {
        println!("{}", self.styled(ANSI_CYAN, BANNER));
    }

    fn print_separator(&mut self) {
        println!("{}", self.styled(ANSI_CYAN, SEPARATOR));
    }

    fn print_model_menu(&mut self, current: Option<Model>) {
        println!("{}", self.styled(ANSI_YELLOW, "Available models:"));
        for (index, model) in Model::ALL.iter().enumerate() {
            let marker = if Some(*model) == current { "*" } else { " " };
            println!(
                "  {marker} {}. {} ({})",
                index + 1,
                model.display_name(),
                model.alias()
            );
        }
        self.flush();
    }

    fn start_response(&mut self) {
        self.end_response();
        print!("{}", self.styled(ANSI_GREEN, "AI: "));
        if self.use_color {
            print!("{ANSI_GREEN}");
        }
        self.in_response = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_response();
        println!();
        self.print_separator();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.end_response();
        println!("\n[interrupted]");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_response();
        eprintln!("\n{}", self.styled(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        self.end_response();
        println!("{}", self.styled(ANSI_YELLOW, info));
    }

    fn clear_screen(&mut self) {
        self.end_response();
        print!("{ANSI_CLEAR_SCREEN}");
        self.flush();
    }
}
