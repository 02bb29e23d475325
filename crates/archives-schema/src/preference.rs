//! APT pin preferences (`apt_preferences(5)`).

use crate::errors::PreferenceParseError;
use crate::priority::Priority;

/// A single `Package: *` pin entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Preference {
    /// The pin expression, e.g. `origin "example.com"`.
    pub pin: String,
    /// Priority applied to packages matching the pin.
    pub priority: Priority,
}

impl Preference {
    /// Create a preference for every package matching `pin`.
    pub fn new(pin: impl Into<String>, priority: Priority) -> Self {
        Self {
            pin: pin.into(),
            priority,
        }
    }
}

impl std::str::FromStr for Preference {
    type Err = PreferenceParseError;

    /// Parse a single preferences paragraph.
    ///
    /// Only `Package: *` pins are produced by craft-archives, so the
    /// `Package` field is not checked. `Explanation` lines are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pin = None;
        let mut priority = None;
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.trim();
            match field.trim() {
                "Package" => {}
                "Pin" => pin = Some(value.to_string()),
                "Pin-Priority" => priority = Some(value.parse::<Priority>()?),
                "Explanation" => tracing::debug!("Ignoring preference explanation: {value}"),
                other => tracing::debug!("Ignoring unknown preference field: {other}"),
            }
        }
        Ok(Self {
            pin: pin.ok_or(PreferenceParseError::MissingPin)?,
            priority: priority.ok_or(PreferenceParseError::MissingPriority)?,
        })
    }
}

impl std::fmt::Display for Preference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Package: *")?;
        writeln!(f, "Pin: {}", self.pin)?;
        writeln!(f, "Pin-Priority: {}", self.priority)
    }
}
