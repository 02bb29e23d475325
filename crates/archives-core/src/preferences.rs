//! The pin preferences file managed by craft-archives.

use std::fs;
use std::path::{Path, PathBuf};

use archives_schema::{Preference, PreferenceParseError, Priority};
use thiserror::Error;

/// First line of the managed preferences file.
pub const HEADER: &str = "# This file is managed by craft-archives";

/// The preferences file could not be read or written.
#[derive(Error, Debug)]
pub enum PreferencesError {
    /// An entry in the existing file is malformed.
    #[error("Invalid preferences in '{}': {source}", path.display())]
    Parse {
        /// The preferences file.
        path: PathBuf,
        /// What is wrong with the entry.
        source: PreferenceParseError,
    },

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collects pins and writes them as one preferences file.
#[derive(Debug, Clone)]
pub struct AptPreferencesManager {
    path: PathBuf,
    preferences: Vec<Preference>,
}

impl AptPreferencesManager {
    /// Manage the file at `path`, loading whatever it already contains.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let path = path.into();
        let preferences = if path.exists() {
            Self::read(&path)?
        } else {
            Vec::new()
        };
        Ok(Self { path, preferences })
    }

    /// An empty manager for `path`, ignoring any existing content.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preferences: Vec::new(),
        }
    }

    /// Parse every preference in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or an entry is malformed.
    pub fn read(path: &Path) -> Result<Vec<Preference>, PreferencesError> {
        let content = fs::read_to_string(path)?;
        content
            .split("\n\n")
            .filter(|paragraph| {
                paragraph
                    .lines()
                    .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            })
            .map(|paragraph| {
                paragraph.parse().map_err(|source| PreferencesError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .collect()
    }

    /// The managed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Preferences in the order they will be written.
    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    /// Queue a pin. An identical pin already queued is not repeated.
    pub fn add(&mut self, pin: impl Into<String>, priority: Priority) {
        let preference = Preference::new(pin, priority);
        if !self.preferences.contains(&preference) {
            self.preferences.push(preference);
        }
    }

    /// The file content for the queued preferences.
    pub fn render(&self) -> String {
        let mut out = format!("{HEADER}\n\n");
        for preference in &self.preferences {
            out.push_str(&preference.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the queued preferences, or delete the file if there are none.
    ///
    /// Returns `true` if the file on disk changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or removed.
    pub fn write(&self) -> Result<bool, PreferencesError> {
        if self.preferences.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
                tracing::debug!("Removed empty preferences {}", self.path.display());
                return Ok(true);
            }
            return Ok(false);
        }

        let content = self.render();
        if fs::read_to_string(&self.path).is_ok_and(|existing| existing == content) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        tracing::debug!("Wrote preferences {}", self.path.display());
        Ok(true)
    }
}
