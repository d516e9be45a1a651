//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the process-wide configuration
//! that is resolved once at startup and passed to the session by reference.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arrrg_derive::CommandLine;

use crate::preferences::{PreferenceStore, Theme};
use crate::types::ModelOption;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// File name of the preference store.
const PREFERENCES_FILE: &str = "preferences.yaml";

/// Command-line arguments for the nexus-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend URL (default: $NEXUSCHAT_BASE_URL or http://localhost:8000)", "URL")]
    pub base_url: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: GPT-4o-mini)", "MODEL")]
    pub model: Option<String>,

    /// Preference file holding the theme.
    #[arrrg(optional, "Preference file (default: ~/.config/nexuschat/preferences.yaml)", "PATH")]
    pub preferences: Option<String>,

    /// Connect timeout in seconds.
    #[arrrg(optional, "Connect timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Backend base URL; `None` defers to the environment and then to localhost.
    pub base_url: Option<String>,

    /// The model to use for generating responses.
    pub model: &'static ModelOption,

    /// Connect timeout for backend requests.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Where the theme preference is persisted.
    pub preferences_path: PathBuf,

    /// Theme loaded from the preference store at startup.
    pub theme: Theme,

    /// Identifier sent with every request; fixed for the life of the process.
    pub session_id: String,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: GPT-4o-mini
    /// - Timeout: 60 seconds
    /// - Color: enabled
    /// - Theme: dark
    /// - A fresh session id
    pub fn new() -> Self {
        Self {
            base_url: None,
            model: ModelOption::default_model(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
            preferences_path: default_preferences_path(),
            theme: Theme::default(),
            session_id: new_session_id(),
        }
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: &'static ModelOption) -> Self {
        self.model = model;
        self
    }

    /// Sets the connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the preference file.
    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = path.into();
        self
    }

    /// Sets the theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Sets the session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Returns the preference store named by this configuration.
    pub fn preference_store(&self) -> PreferenceStore {
        PreferenceStore::new(&self.preferences_path)
    }

    /// Reads the persisted theme into this configuration.
    pub fn load_preferences(mut self) -> Self {
        self.theme = self.preference_store().load_theme();
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = match args.model.as_deref() {
            Some(name) => ModelOption::find(name).unwrap_or_else(|| {
                tracing::warn!(model = name, "unknown model; using the default");
                ModelOption::default_model()
            }),
            None => ModelOption::default_model(),
        };

        ChatConfig {
            base_url: args.base_url,
            model,
            timeout: Duration::from_secs(args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            use_color: !args.no_color,
            preferences_path: args
                .preferences
                .map(PathBuf::from)
                .unwrap_or_else(default_preferences_path),
            ..ChatConfig::new()
        }
    }
}

/// Generates a session id of the form `session_<unix millis>_<9 hex digits>`.
pub fn new_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{millis}_{}", &random[..9])
}

fn default_preferences_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("nexuschat")
            .join(PREFERENCES_FILE),
        None => PathBuf::from(PREFERENCES_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_MODEL;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model.key, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
        assert!(config.base_url.is_none());
        assert_eq!(config.theme, Theme::Dark);
        assert!(config.preferences_path.ends_with("preferences.yaml"));
    }

    #[test]
    fn config_from_args_defaults() {
        let args = ChatArgs::default();
        let config = ChatConfig::from(args);
        assert_eq!(config.model.key, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            base_url: Some("http://nexus.internal:9000".to_string()),
            model: Some("gpt-4o".to_string()),
            preferences: Some("/tmp/prefs.yaml".to_string()),
            timeout: Some(5),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.base_url.as_deref(), Some("http://nexus.internal:9000"));
        assert_eq!(config.model.key, "GPT-4o");
        assert_eq!(config.preferences_path, PathBuf::from("/tmp/prefs.yaml"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }

    #[test]
    fn unknown_model_falls_back() {
        let args = ChatArgs {
            model: Some("gpt-9".to_string()),
            ..ChatArgs::default()
        };
        assert_eq!(ChatConfig::from(args).model.key, DEFAULT_MODEL);
    }

    #[test]
    fn config_builder_pattern() {
        let o1 = ModelOption::find("o1-mini").unwrap();
        let config = ChatConfig::new()
            .with_base_url("http://127.0.0.1:8000")
            .with_model(o1)
            .with_timeout(Duration::from_secs(3))
            .without_color()
            .with_preferences_path("prefs.yaml")
            .with_theme(Theme::Light)
            .with_session_id("session_1_abcdef012");

        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:8000"));
        assert_eq!(config.model, o1);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!config.use_color);
        assert_eq!(config.preferences_path, PathBuf::from("prefs.yaml"));
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.session_id, "session_1_abcdef012");
    }

    #[test]
    fn session_id_shape() {
        let id = new_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_session_id());
    }
}
