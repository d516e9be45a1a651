use serde::{Deserialize, Serialize};

/// One decoded `data: ` line of the chat stream.
///
/// Every field is optional; a frame may carry a text delta, control signals, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Text delta to append to the open reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,

    /// Set when the backend used its search tool for this reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_used: Option<bool>,

    /// Marks the reply as complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,

    /// Failure reported by the backend after the stream started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamFrame {
    /// Creates a frame carrying a text delta.
    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            chunk: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a terminal frame.
    pub fn done() -> Self {
        Self {
            done: Some(true),
            ..Self::default()
        }
    }

    /// Returns true if the frame signals a tool call.
    pub fn is_search_used(&self) -> bool {
        self.search_used.unwrap_or(false)
    }

    /// Returns true if the frame ends the reply.
    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_frame_deserialization() {
        let frame: StreamFrame = serde_json::from_value(json!({"chunk": "He"})).unwrap();
        assert_eq!(frame, StreamFrame::chunk("He"));
        assert!(!frame.is_done());
        assert!(!frame.is_search_used());
    }

    #[test]
    fn terminal_frame_with_search_flag() {
        let frame: StreamFrame =
            serde_json::from_value(json!({"done": true, "search_used": true})).unwrap();
        assert!(frame.is_done());
        assert!(frame.is_search_used());
        assert!(frame.chunk.is_none());
    }

    #[test]
    fn unknown_keys_and_nulls_are_ignored() {
        let frame: StreamFrame =
            serde_json::from_value(json!({"chunk": null, "done": false, "usage": 12})).unwrap();
        assert_eq!(frame, StreamFrame { done: Some(false), ..StreamFrame::default() });
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let value = serde_json::to_value(StreamFrame::done()).unwrap();
        assert_eq!(value, json!({"done": true}));
    }
}
