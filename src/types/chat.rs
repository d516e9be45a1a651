use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::message::{Message, new_id, now};

/// Number of characters of the first prompt used as a chat title.
pub const TITLE_CHARS: usize = 40;

/// Number of characters of the last message cached as the sidebar preview.
pub const PREVIEW_CHARS: usize = 60;

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Opaque chat identifier.
    pub id: String,

    /// Title shown in the chat list.
    pub title: String,

    /// Messages in conversation order.
    pub messages: Vec<Message>,

    /// Starred chats are listed first.
    #[serde(default)]
    pub starred: bool,

    /// When the chat was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,

    /// Cached preview of the last message.
    #[serde(default)]
    pub preview: String,

    /// Model key last used in this chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Chat {
    /// Creates an empty chat with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            messages: Vec::new(),
            starred: false,
            created: now(),
            preview: String::new(),
            model: None,
        }
    }

    /// Derives a title from the first prompt of a chat.
    pub fn title_from_prompt(prompt: &str) -> String {
        let title: String = prompt.trim().chars().take(TITLE_CHARS).collect();
        title.trim_end().to_string()
    }

    /// Returns the last message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the message with `id`, if present.
    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Returns the message currently streaming, if any.
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_streaming)
    }

    /// Recomputes the cached preview from the last message.
    pub fn refresh_preview(&mut self) {
        self.preview = match self.messages.last() {
            Some(message) => {
                let flat = message.content.split_whitespace().collect::<Vec<_>>().join(" ");
                flat.chars().take(PREVIEW_CHARS).collect()
            }
            None => String::new(),
        };
    }
}
