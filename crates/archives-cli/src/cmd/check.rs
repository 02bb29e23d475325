//! Check command

use std::path::Path;

use anyhow::Result;

use crate::{project, ui};

/// Validate the repositories of a project file.
pub fn check(file: &Path) -> Result<()> {
    let repos = project::load(file)?;
    let noun = if repos.len() == 1 {
        "repository is"
    } else {
        "repositories are"
    };
    ui::success(&format!("{} package {noun} valid", repos.len()));
    Ok(())
}
