use std::fmt;

use serde::Serialize;

/// An entry of the static model catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    /// Catalog key; this is what travels in `ChatRequest::model` and what is displayed.
    pub key: &'static str,
    /// Provider model id the backend resolves the key to.
    pub id: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Whether the model accepts image attachments.
    pub supports_vision: bool,
}

/// Catalog key of the default model.
pub const DEFAULT_MODEL: &str = "GPT-4o-mini";

/// Models offered by the backend.
pub const MODELS: &[ModelOption] = &[
    ModelOption {
        key: "GPT-4o-mini",
        id: "gpt-4o-mini",
        description: "Fast & efficient",
        supports_vision: true,
    },
    ModelOption {
        key: "GPT-4o",
        id: "gpt-4o",
        description: "High quality",
        supports_vision: true,
    },
    ModelOption {
        key: "GPT-4-turbo",
        id: "gpt-4-turbo",
        description: "Balanced",
        supports_vision: true,
    },
    ModelOption {
        key: "o1-mini",
        id: "o1-mini",
        description: "Advanced reasoning",
        supports_vision: false,
    },
];

impl ModelOption {
    /// Looks up a model by catalog key or provider id, ignoring ASCII case.
    pub fn find(name: &str) -> Option<&'static ModelOption> {
        MODELS
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case(name) || m.id.eq_ignore_ascii_case(name))
    }

    /// Returns the default model.
    pub fn default_model() -> &'static ModelOption {
        // MODELS is non-empty and DEFAULT_MODEL is its first key.
        &MODELS[0]
    }
}

impl fmt::Display for ModelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_in_catalog() {
        assert_eq!(ModelOption::default_model().key, DEFAULT_MODEL);
        assert!(ModelOption::find(DEFAULT_MODEL).is_some());
    }

    #[test]
    fn find_by_key_or_id() {
        assert_eq!(ModelOption::find("gpt-4o").map(|m| m.key), Some("GPT-4o"));
        assert_eq!(ModelOption::find("gpt-4-TURBO").map(|m| m.key), Some("GPT-4-turbo"));
        assert!(ModelOption::find("claude").is_none());
    }

    #[test]
    fn reasoning_model_has_no_vision() {
        let model = ModelOption::find("o1-mini").unwrap();
        assert!(!model.supports_vision);
    }
}
