//! Persisted user preferences.
//!
//! Preferences live in a small YAML file of string keys and values.  The theme is read once at
//! startup and written back every time it is toggled.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Key under which the theme is stored.
pub const THEME_KEY: &str = "nexusai-theme";

/// Color theme of the interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark background, light text.
    #[default]
    Dark,
    /// Light background, dark text.
    Light,
}

impl Theme {
    /// Returns the other theme.
    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Returns the stored name of the theme.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(Error::validation(
                format!("unknown theme {other:?}"),
                Some("theme".to_string()),
            )),
        }
    }
}

/// A YAML file of preference keys and values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Uses the preference file at `path`; the file need not exist yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the path of the preference file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored theme.  A missing file or an unknown value yields the default.
    pub fn load_theme(&self) -> Theme {
        let values = match self.read() {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable preferences");
                return Theme::default();
            }
        };
        values
            .get(THEME_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Stores the theme, keeping any other keys in the file.
    pub fn save_theme(&self, theme: Theme) -> Result<()> {
        let mut values = self.read().unwrap_or_default();
        values.insert(THEME_KEY.to_string(), theme.as_str().to_string());
        self.write(&values)
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(Error::io(
                    format!("failed to read {}", self.path.display()),
                    err,
                ));
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::io(format!("failed to create {}", parent.display()), err)
            })?;
        }
        let content = serde_yaml::to_string(values)?;
        std::fs::write(&self.path, content)
            .map_err(|err| Error::io(format!("failed to write {}", self.path.display()), err))
    }
}
