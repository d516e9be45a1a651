//! Logging trait for chat traffic.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request a [`ChatSession`](crate::chat::ChatSession) issues and every frame it consumes.

use crate::{ChatRequest, Message, StreamFrame};

/// A trait for logging chat session traffic.
///
/// # Example
///
/// ```rust,ignore
/// use nexuschat::{ChatRequest, ClientLogger, Message, StreamFrame};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_frame(&self, frame: &StreamFrame) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "frame: {}", serde_json::to_string(frame).unwrap()).unwrap();
///     }
///
///     fn log_reply(&self, message: &Message) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "reply: {}", message.content).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request before it is sent.
    fn log_request(&self, request: &ChatRequest);

    /// Log a decoded frame, in arrival order.
    fn log_frame(&self, frame: &StreamFrame);

    /// Log the assistant reply once it is final, whether it completed or failed.
    fn log_reply(&self, message: &Message);
}
