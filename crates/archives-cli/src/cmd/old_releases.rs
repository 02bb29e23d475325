//! Old-releases command

use std::path::Path;

use anyhow::{Context, Result};
use archives_core::defaults::{self, OldReleases};

use crate::ui;

/// Point the default sources of `root` at the old-releases archive where
/// their suites have moved.
pub async fn old_releases(root: &Path, deb822_name: &str, url: &str, dry_run: bool) -> Result<()> {
    let client = archives_core::http_client()?;
    let old_releases = OldReleases::new(client, url);

    if dry_run {
        let sources = defaults::default_sources_file(root, deb822_name)?;
        for source in &sources.sources {
            for suite in &source.suites {
                if old_releases.is_on_old_releases(suite).await? {
                    ui::would(&format!(
                        "move {suite} in {} to {}",
                        sources.path.display(),
                        old_releases.url()
                    ));
                }
            }
        }
        return Ok(());
    }

    let changed = defaults::use_old_releases(root, deb822_name, &old_releases)
        .await
        .context("Failed to migrate default sources")?;
    if changed {
        ui::success(&format!("Default sources now use {}", old_releases.url()));
    } else {
        println!("Default sources are on a supported release.");
    }
    Ok(())
}
