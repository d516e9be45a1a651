//! Output rendering for streaming replies.
//!
//! This module provides the [`Renderer`] trait the chat session reports to, a plain-text
//! implementation for terminals, and an HTML implementation that re-renders the reply's
//! markdown on every update.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::markdown;
use crate::types::Message;

/// ANSI escape code for dim text (used for status lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the tool status).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering streaming output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - HTML re-rendered from the accumulated markdown
pub trait Renderer: Send {
    /// Called once the reply placeholder exists, before the request is sent.
    fn start_reply(&mut self, model: &str) {
        _ = model;
    }

    /// Print a chunk of reply text.
    ///
    /// This is called incrementally as chunks arrive from the backend.
    fn print_text(&mut self, text: &str);

    /// Called when the backend reports that a tool (web search) is in use.
    fn start_tool_use(&mut self, name: &str);

    /// Called when the tool status is cleared at the end of the stream.
    fn finish_tool_use(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply is final, with its final content.
    fn finish_response(&mut self, message: &Message);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self) {}

    /// Returns true if streaming should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer writes the raw markdown of a reply to stdout as it arrives.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
    in_tool_use: bool,
    interrupted: Option<Arc<AtomicBool>>,
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
            line_start: true,
            in_tool_use: false,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Creates a new PlainTextRenderer with specified color and interrupt flag.
    pub fn with_color_and_interrupt(use_color: bool, interrupted: Arc<AtomicBool>) -> Self {
        Self::with_color(use_color).with_interrupt(interrupted)
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{text}");
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    fn ensure_line_start(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }

    fn status(&mut self, text: &str, color: &str) {
        self.ensure_line_start();
        if self.use_color {
            self.write(&format!("{color}{text}{ANSI_RESET}\n"));
        } else {
            self.write(&format!("{text}\n"));
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
        self.write(text);
    }

    fn start_tool_use(&mut self, name: &str) {
        if self.in_tool_use {
            return;
        }
        self.in_tool_use = true;
        self.status(&format!("[using {name}]"), ANSI_CYAN);
    }

    fn finish_tool_use(&mut self) {
        self.in_tool_use = false;
    }

    fn print_error(&mut self, error: &str) {
        self.ensure_line_start();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.status(info, ANSI_DIM);
    }

    fn finish_response(&mut self, message: &Message) {
        _ = message;
        self.ensure_line_start();
    }

    fn print_interrupted(&mut self) {
        self.ensure_line_start();
        self.write("[interrupted]\n");
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Renders the reply to HTML after every update.
///
/// The accumulated markdown is converted in full on each chunk, the way a browser view
/// re-renders the open message.  Status lines and errors are collected for inspection.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    markdown: String,
    html: String,
    updates: usize,
    tool_in_use: bool,
    tools_used: Vec<String>,
    errors: Vec<String>,
    info: Vec<String>,
    finished: bool,
    interrupted: bool,
}

impl HtmlRenderer {
    /// Creates an empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recent rendering of the reply.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Returns the markdown received so far.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Returns how many times the reply was rendered.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Returns true while the tool status is raised.
    pub fn tool_in_use(&self) -> bool {
        self.tool_in_use
    }

    /// Returns the tools reported during the reply.
    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    /// Returns the errors reported so far.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the informational messages reported so far.
    pub fn info(&self) -> &[String] {
        &self.info
    }

    /// Returns true once the reply was finalized.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns true if the reply was interrupted.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    fn rerender(&mut self) {
        self.html = markdown::to_html(&self.markdown);
        self.updates += 1;
    }
}

impl Renderer for HtmlRenderer {
    fn start_reply(&mut self, model: &str) {
        _ = model;
        self.markdown.clear();
        self.html.clear();
        self.finished = false;
        self.interrupted = false;
    }

    fn print_text(&mut self, text: &str) {
        self.markdown.push_str(text);
        self.rerender();
    }

    fn start_tool_use(&mut self, name: &str) {
        if !self.tool_in_use {
            self.tool_in_use = true;
            self.tools_used.push(name.to_string());
        }
    }

    fn finish_tool_use(&mut self) {
        self.tool_in_use = false;
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.info.push(info.to_string());
    }

    fn finish_response(&mut self, message: &Message) {
        // The final content may differ from the chunks seen, e.g. after a failure.
        if message.content != self.markdown {
            self.markdown = message.content.clone();
            self.rerender();
        }
        self.finished = true;
    }

    fn print_interrupted(&mut self) {
        self.interrupted = true;
    }
}
