//! APT pin priorities.

use crate::errors::PriorityError;

/// A non-zero APT pin priority.
///
/// Besides plain integers, three names are accepted for the common cases:
///
/// ```
/// use archives_schema::Priority;
///
/// assert_eq!("always".parse::<Priority>().unwrap(), Priority::ALWAYS);
/// assert_eq!("Prefer".parse::<Priority>().unwrap().get(), 990);
/// assert!("0".parse::<Priority>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(i32);

impl Priority {
    /// Always prefer packages from this origin, even over installed ones.
    pub const ALWAYS: Self = Self(1000);
    /// Prefer packages from this origin over other archives.
    pub const PREFER: Self = Self(990);
    /// Only use this origin when nothing else provides the package.
    pub const DEFER: Self = Self(100);

    /// Create a priority from an integer.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::Zero`] for 0 and
    /// [`PriorityError::OutOfRange`] if the value does not fit in an `i32`.
    pub fn new(value: i64) -> Result<Self, PriorityError> {
        if value == 0 {
            return Err(PriorityError::Zero);
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| PriorityError::OutOfRange(value))
    }

    /// Look up one of the named priorities, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "always" => Some(Self::ALWAYS),
            "prefer" => Some(Self::PREFER),
            "defer" => Some(Self::DEFER),
            _ => None,
        }
    }

    /// The numeric value written to `Pin-Priority:`.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Priority {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(named) = Self::from_name(s) {
            return Ok(named);
        }
        match s.parse::<i64>() {
            Ok(value) => Self::new(value),
            Err(_) => Err(PriorityError::Unknown(s.to_string())),
        }
    }
}

impl From<Priority> for i32 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}
