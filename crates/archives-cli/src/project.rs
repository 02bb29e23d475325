//! Project file loading.

use std::path::Path;

use anyhow::{Context, Result, bail};
use archives_schema::PackageRepository;
use serde_json::Value;

/// Key holding the repository list in a project file.
pub const REPOSITORIES_KEY: &str = "package-repositories";

/// The marshalled repository list of a project file.
///
/// A project without the key has no repositories.
pub fn load_values(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let document: Value = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        let table: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        serde_json::to_value(table)?
    };

    match document {
        Value::Array(_) => Ok(document),
        Value::Object(mut map) => Ok(map
            .remove(REPOSITORIES_KEY)
            .unwrap_or_else(|| Value::Array(Vec::new()))),
        _ => bail!(
            "{} must contain a '{REPOSITORIES_KEY}' list",
            path.display()
        ),
    }
}

/// The validated repositories of a project file.
pub fn load(path: &Path) -> Result<Vec<PackageRepository>> {
    let values = load_values(path)?;
    Ok(PackageRepository::unmarshal_package_repositories(Some(&values))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn toml_project() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.toml");
        fs::write(
            &path,
            r#"
name = "demo"

[[package-repositories]]
type = "apt"
ppa = "snappy-dev/snapcraft-daily"
priority = 990

[[package-repositories]]
type = "apt"
cloud = "antelope"
"#,
        )
        .unwrap();

        let repos = load(&path).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].priority().map(|p| p.get()), Some(990));
        assert_eq!(repos[1].kind(), "uca");
    }

    #[test]
    fn json_list_and_missing_key() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("repos.json");
        fs::write(&list, r#"[{"type": "apt", "ppa": "a/b"}]"#).unwrap();
        assert_eq!(load(&list).unwrap().len(), 1);

        let empty = dir.path().join("empty.toml");
        fs::write(&empty, "name = \"nothing\"\n").unwrap();
        assert!(load(&empty).unwrap().is_empty());
    }

    #[test]
    fn invalid_repository_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"package-repositories": [{"type": "apt", "ppa": ""}]}"#).unwrap();

        let err = load(&path).unwrap_err();
        assert_eq!(err.to_string(), "Invalid package repository for '': invalid PPA.");
    }
}
