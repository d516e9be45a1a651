// Public modules
pub mod attachment;
pub mod chat;
pub mod chat_request;
pub mod message;
pub mod model;
pub mod stream_frame;

// Re-exports
pub use attachment::Attachment;
pub use chat::{Chat, PREVIEW_CHARS, TITLE_CHARS};
pub use chat_request::{ChatRequest, ImageReply};
pub use message::{Message, Role};
pub use model::{DEFAULT_MODEL, MODELS, ModelOption};
pub use stream_frame::StreamFrame;
