//! Data model for craft-archives.
//!
//! Everything here is pure: repository definitions and their validation,
//! the marshalled (JSON-shaped) form handed over by build tooling, and the
//! text formats APT reads (`sources.list`, deb822 `.sources` and pin
//! preferences). Touching the host system is the job of `archives-core`.

pub mod errors;
pub mod preference;
pub mod priority;
pub mod repository;
pub mod source;

// Re-exports
pub use errors::*;
pub use preference::Preference;
pub use priority::Priority;
pub use repository::*;
pub use source::{AptSource, DebFormat, SignedBy};

/// Base URL of the Ubuntu Cloud Archive.
pub const UCA_ARCHIVE: &str = "http://ubuntu-cloud.archive.canonical.com/ubuntu";

/// Host part of [`UCA_ARCHIVE`], used for pinning.
pub const UCA_NETLOC: &str = "ubuntu-cloud.archive.canonical.com";

/// Fingerprint of the key that signs the Ubuntu Cloud Archive.
pub const UCA_KEY_ID: &str = "391A9AA2147192839E9DB0315EDB1B62EC4926EA";

/// Keyserver used when a repository does not name one.
pub const DEFAULT_KEY_SERVER: &str = "keyserver.ubuntu.com";
