//! craft-archives - package repository tooling
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Validates the `package-repositories` of a project file and installs
//! them on a target root: signing keys, deb822 sources and pin preferences.
//!
//! # Project files
//!
//! ```toml
//! [[package-repositories]]
//! type = "apt"
//! ppa = "snappy-dev/snapcraft-daily"
//! priority = "prefer"
//! ```
//!
//! A `.json` file may hold the same object, or the bare list.

pub mod cmd;
pub mod project;
pub mod ui;

use archives_core::defaults::{OLD_RELEASES_URL, OLD_RELEASES_URL_ENV};
use archives_core::gpg::GPG_ENV;
use archives_core::launchpad::{DEFAULT_LAUNCHPAD_API, LAUNCHPAD_API_ENV};
use archives_core::paths::{DEFAULT_DEB822_NAME, KEY_ASSETS_ENV, ROOT_ENV};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "craft-archives")]
#[command(author, version, about = "Install and check APT package repositories")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate the package repositories of a project file
    Check {
        /// Project file (TOML, or JSON with a .json extension)
        file: PathBuf,
    },
    /// List the package repositories of a project file
    Show {
        /// Project file
        file: PathBuf,
    },
    /// Install keys, sources and preferences for a project's repositories
    Install {
        /// Project file
        file: PathBuf,
        /// Root filesystem to install into
        #[arg(long, env = ROOT_ENV, default_value = "/")]
        root: PathBuf,
        /// Directory of bundled <SHORTID>.asc signing keys
        #[arg(long, env = KEY_ASSETS_ENV)]
        key_assets: Option<PathBuf>,
        /// Launchpad API root used to look up PPA signing keys
        #[arg(long, env = LAUNCHPAD_API_ENV, default_value = DEFAULT_LAUNCHPAD_API)]
        launchpad_api: String,
        /// Run `apt-get update` if the package index needs a refresh
        #[arg(long)]
        refresh: bool,
    },
    /// Install packages with apt-get
    Packages {
        /// Package names
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Signing key commands
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Move end-of-life default sources to the old-releases archive
    #[command(name = "old-releases")]
    OldReleases {
        /// Root filesystem to migrate
        #[arg(long, env = ROOT_ENV, default_value = "/")]
        root: PathBuf,
        /// deb822 file holding the default sources
        #[arg(long, default_value = DEFAULT_DEB822_NAME)]
        deb822_name: String,
        /// Old-releases archive URL
        #[arg(long, env = OLD_RELEASES_URL_ENV, default_value = OLD_RELEASES_URL)]
        url: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum KeyCommands {
    /// Print the fingerprints of the keys in a key file
    Fingerprints {
        /// Armored or binary OpenPGP key file
        file: PathBuf,
        /// Root filesystem whose keyrings directory is used
        #[arg(long, env = ROOT_ENV, default_value = "/")]
        root: PathBuf,
        /// gpg binary (defaults to the one on PATH)
        #[arg(long, env = GPG_ENV)]
        gpg: Option<PathBuf>,
    },
    /// Exit successfully if a key is installed, with status 1 if not
    Installed {
        /// Full key fingerprint
        key_id: String,
        /// Root filesystem to check
        #[arg(long, env = ROOT_ENV, default_value = "/")]
        root: PathBuf,
        /// Keyrings directory (defaults to <root>/etc/apt/keyrings)
        #[arg(long)]
        keyring_dir: Option<PathBuf>,
        /// gpg binary (defaults to the one on PATH)
        #[arg(long, env = GPG_ENV)]
        gpg: Option<PathBuf>,
    },
}
