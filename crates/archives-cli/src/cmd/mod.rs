//! Subcommand implementations.

pub mod check;
pub mod install;
pub mod key;
pub mod old_releases;
pub mod packages;
pub mod show;
