use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the person using the client.
    User,
    /// A reply produced by the assistant backend.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a chat.
///
/// Assistant messages are created empty with `is_streaming` set and grow as frames arrive.
/// Once streaming ends the content is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque message identifier, unique within the process.
    pub id: String,

    /// Who wrote the message.
    pub role: Role,

    /// Message text; markdown for assistant replies.
    pub content: String,

    /// When the message was created.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,

    /// True while content is still arriving.
    #[serde(default)]
    pub is_streaming: bool,

    /// File name of an image sent alongside a user message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl Message {
    /// Creates a finished user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role: Role::User,
            content: content.into(),
            timestamp: now(),
            is_streaming: false,
            attachment: None,
        }
    }

    /// Creates the empty, streaming placeholder for an assistant reply.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: new_id(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: now(),
            is_streaming: true,
            attachment: None,
        }
    }

    /// Attaches an image file name to this message.
    pub fn with_attachment(mut self, name: impl Into<String>) -> Self {
        self.attachment = Some(name.into());
        self
    }

    /// Returns the `HH:MM` time shown next to the message.
    pub fn display_time(&self) -> String {
        let format = format_description!("[hour]:[minute]");
        self.timestamp
            .format(&format)
            .unwrap_or_else(|_| "--:--".to_string())
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
