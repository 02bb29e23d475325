//! Install command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use archives_core::apt::{AptGet, PackageManager};
use archives_core::{Installer, paths};
use archives_schema::PackageRepository;

use crate::project;
use crate::ui::{self, ConsoleReporter};

/// Settings of the install command beyond the project and root.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub key_assets: Option<PathBuf>,
    pub launchpad_api: String,
    pub refresh: bool,
}

/// Install the repositories of a project file into `root`.
pub async fn install(
    file: &Path,
    root: &Path,
    options: InstallOptions,
    dry_run: bool,
) -> Result<()> {
    let InstallOptions {
        key_assets,
        launchpad_api,
        refresh,
    } = options;
    let repos = project::load(file)?;

    if dry_run {
        for repo in &repos {
            describe(root, repo);
        }
        if refresh {
            ui::would("run 'apt-get update' if anything changed");
        }
        return Ok(());
    }

    let installer = Installer::new(root, key_assets, &launchpad_api)
        .context("Failed to set up installer")?
        .with_reporter(Arc::new(ConsoleReporter));
    let refresh_required = installer
        .install(&repos)
        .await
        .context("Failed to install package repositories")?;

    if refresh_required && refresh {
        tracing::info!("Refreshing package index");
        AptGet::new()
            .refresh()
            .context("Failed to refresh package index")?;
        ui::success("Package index refreshed");
    } else if refresh_required {
        println!("Run 'apt-get update' to refresh the package index.");
    }
    Ok(())
}

fn describe(root: &Path, repo: &PackageRepository) {
    let sources_dir = paths::sources_list_d(root);
    let name = match repo {
        PackageRepository::Apt(apt) => apt.name(),
        PackageRepository::Ppa(ppa) => match ppa.split() {
            Ok((owner, name)) => format!("ppa-{owner}_{name}"),
            Err(e) => {
                ui::warning(&e.to_string());
                return;
            }
        },
        PackageRepository::Uca(uca) => format!("cloud-{}", uca.cloud()),
    };

    ui::would(&format!(
        "install the signing key for {} into {}",
        repo.location(),
        paths::keyrings_dir(root).display()
    ));
    ui::would(&format!(
        "write {}",
        sources_dir.join(paths::sources_file_name(&name)).display()
    ));
    if let Some(priority) = repo.priority() {
        ui::would(&format!("pin '{}' at priority {priority}", repo.pin()));
    }
}
