use serde::{Deserialize, Serialize};

/// JSON body of a streaming chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The prompt text.
    pub message: String,

    /// Session identifier, stable for the life of the client process.
    pub session_id: String,

    /// Catalog key of the model to answer with.
    pub model: String,
}

impl ChatRequest {
    /// Creates a new request.
    pub fn new(
        message: impl Into<String>,
        session_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            model: model.into(),
        }
    }
}

/// JSON body returned by the image endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReply {
    /// Whether the backend produced a reply.
    #[serde(default)]
    pub success: bool,

    /// The complete reply text.
    #[serde(default)]
    pub response: String,

    /// Set when the backend used its search tool.
    #[serde(default)]
    pub search_used: bool,
}
