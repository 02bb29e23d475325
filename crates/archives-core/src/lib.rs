//! Host integration for craft-archives.
//!
//! The pieces here act on a target root filesystem (usually `/`, or a
//! chroot being prepared by a build tool):
//!
//! - [`keys::AptKeyManager`] installs repository signing keys with `gpg`.
//! - [`sources::AptSourcesManager`] writes deb822 `.sources` files.
//! - [`preferences::AptPreferencesManager`] maintains the pin preferences.
//! - [`defaults`] moves end-of-life releases to the old-releases archive.
//! - [`installer::Installer`] runs all of the above for a list of
//!   repositories and reports whether the package index needs a refresh.

pub mod apt;
pub mod defaults;
pub mod gpg;
pub mod installer;
pub mod keys;
pub mod launchpad;
pub mod paths;
pub mod preferences;
pub mod reporter;
pub mod sources;
pub mod uca;

pub use installer::{InstallError, Installer};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("craft-archives/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the network lookups.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}
