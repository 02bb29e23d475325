//! Error types for repository definitions and APT record formats.

use thiserror::Error;

/// Default resolution when nothing more specific applies.
const GENERIC_RESOLUTION: &str = "Verify repository configuration and ensure it is correct.";

/// A package repository definition was rejected.
///
/// The display form names the repository by its location (URL, PPA or
/// cloud) so that users can find the offending entry in their project file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid package repository for '{location}': {brief}")]
pub struct ValidationError {
    /// The URL, PPA or cloud of the offending repository.
    pub location: String,
    /// Short description of what is wrong.
    pub brief: String,
    /// Longer explanation, when one helps.
    pub details: Option<String>,
    /// What the user should do about it.
    pub resolution: String,
}

impl ValidationError {
    /// Create an error with the generic resolution and no details.
    pub fn new(location: impl Into<String>, brief: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            brief: brief.into(),
            details: None,
            resolution: GENERIC_RESOLUTION.to_string(),
        }
    }

    /// Attach details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Replace the resolution of the error.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Resolution pointing the user at a single property.
    pub(crate) fn check_property(self, property: &str) -> Self {
        self.with_resolution(format!(
            "Verify the repository configuration and ensure that '{property}' \
             is correctly specified."
        ))
    }
}

/// A priority value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriorityError {
    /// Zero means "never" in APT and is not allowed here.
    #[error("invalid priority: Priority cannot be zero.")]
    Zero,

    /// A string that is neither a number nor a known priority name.
    #[error(
        "invalid priority '{0}'. Priority must be 'always', 'prefer', 'defer' or a nonzero integer."
    )]
    Unknown(String),

    /// A number that does not fit an APT pin priority.
    #[error("invalid priority {0}: out of range.")]
    OutOfRange(i64),
}

/// A PPA string is not of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to install PPA '{ppa}': invalid PPA format")]
pub struct PpaFormatError {
    /// The PPA as given.
    pub ppa: String,
}

/// An APT source record could not be parsed.
#[derive(Debug, Error)]
pub enum SourceParseError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A one-line `sources.list` entry has too few fields.
    #[error("line {line}: expected 'type uri suite [components]', got '{content}'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// A source type other than `deb` or `deb-src`.
    #[error("unknown source type '{0}'")]
    UnknownType(String),

    /// A deb822 paragraph lists more than one URI.
    #[error("deb822 paragraphs with multiple URIs are unsupported")]
    MultipleUris,

    /// A deb822 paragraph lacks a mandatory field.
    #[error("deb822 paragraph is missing the '{0}' field")]
    MissingField(&'static str),
}

/// An APT preferences entry could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceParseError {
    /// The entry has no `Pin:` line.
    #[error("preference is missing a 'Pin' field")]
    MissingPin,

    /// The entry has no `Pin-Priority:` line.
    #[error("preference is missing a 'Pin-Priority' field")]
    MissingPriority,

    /// The priority is not a valid pin priority.
    #[error(transparent)]
    Priority(#[from] PriorityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_location() {
        let err = ValidationError::new("http://example.com", "invalid URL.");
        assert_eq!(
            err.to_string(),
            "Invalid package repository for 'http://example.com': invalid URL."
        );
        assert_eq!(err.details, None);
        assert_eq!(err.resolution, GENERIC_RESOLUTION);
    }

    #[test]
    fn validation_error_builders() {
        let err = ValidationError::new("", "invalid URL.")
            .with_details("URLs must be non-empty strings.")
            .check_property("url");
        assert_eq!(err.to_string(), "Invalid package repository for '': invalid URL.");
        assert_eq!(err.details.as_deref(), Some("URLs must be non-empty strings."));
        assert_eq!(
            err.resolution,
            "Verify the repository configuration and ensure that 'url' is correctly specified."
        );
    }

    #[test]
    fn ppa_format_error_display() {
        let err = PpaFormatError {
            ppa: "ppa-missing-slash".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to install PPA 'ppa-missing-slash': invalid PPA format"
        );
    }
}
