//! Show command

use std::path::Path;

use anyhow::Result;
use archives_schema::PackageRepository;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{ContentArrangement, Table};

use crate::project;

/// Print the repositories of a project file as a table.
pub fn show(file: &Path) -> Result<()> {
    let repos = project::load(file)?;
    if repos.is_empty() {
        println!("No package repositories in {}", file.display());
        return Ok(());
    }
    println!("{}", table(&repos));
    Ok(())
}

/// One row per repository: kind, location, suites, priority and pin.
pub fn table(repos: &[PackageRepository]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["TYPE", "LOCATION", "SUITES", "PRIORITY", "PIN"]);

    for repo in repos {
        let suites = match repo {
            PackageRepository::Apt(apt) => match (apt.path(), apt.suites()) {
                (Some(path), _) => path.to_string(),
                (None, Some(suites)) => suites.join(" "),
                (None, None) => String::new(),
            },
            PackageRepository::Ppa(_) => "(host)".to_string(),
            PackageRepository::Uca(uca) => format!("(host)-{}/{}", uca.pocket(), uca.cloud()),
        };
        let priority = repo
            .priority()
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        table.add_row(vec![
            repo.kind().to_string(),
            repo.location().to_string(),
            suites,
            priority,
            repo.pin(),
        ]);
    }
    table
}
