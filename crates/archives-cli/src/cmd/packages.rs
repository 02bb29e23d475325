//! Packages command

use anyhow::{Context, Result};
use archives_core::apt::{AptGet, PackageManager};

use crate::ui;

/// Install packages with `apt-get`.
pub fn packages(packages: &[String], dry_run: bool) -> Result<()> {
    if dry_run {
        ui::would(&format!("run 'apt-get {}'", AptGet::install_args(packages).join(" ")));
        return Ok(());
    }

    AptGet::new()
        .install(packages)
        .context("Failed to install packages")?;
    ui::success(&format!("Installed {}", packages.join(", ")));
    Ok(())
}
