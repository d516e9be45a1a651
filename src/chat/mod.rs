//! Chat application module for interactive conversations with NexusAI.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! nexuschat client library. It supports:
//!
//! - Streaming responses with real-time display
//! - Several chats with titles, stars, and retry
//! - Image attachments for vision models
//! - Slash commands for session control
//! - A persisted light/dark theme and HTML export
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and backend interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{HtmlRenderer, PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, new_session_id};
pub use session::{ChatSession, IMAGE_CHAT_TITLE, SessionStats};
