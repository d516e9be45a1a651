// Public modules
pub mod about;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod consumer;
pub mod error;
pub mod export;
pub mod markdown;
pub mod preferences;
pub mod render;
pub mod sse;
pub mod store;
pub mod types;

mod observability;

// Re-exports
pub use client::{ByteStream, ChatTransport, NexusClient};
pub use client_logger::ClientLogger;
pub use consumer::{ActivityState, OpenReply, StreamConsumer, TurnOutcome, TurnStatus};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use preferences::{PreferenceStore, Theme};
pub use render::{HtmlRenderer, PlainTextRenderer, Renderer};
pub use store::ChatStore;
pub use types::*;
