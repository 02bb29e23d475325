//! Installation of a project's package repositories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use archives_schema::{PackageRepository, ValidationError};
use serde_json::Value;
use thiserror::Error;

use crate::gpg::SystemGpg;
use crate::keys::{AptKeyManager, KeyError};
use crate::launchpad::LaunchpadClient;
use crate::paths;
use crate::preferences::{AptPreferencesManager, PreferencesError};
use crate::reporter::{NullReporter, Reporter};
use crate::sources::{AptSourcesManager, SourcesError};
use crate::uca::UcaClient;

/// Installing repositories failed.
#[derive(Error, Debug)]
pub enum InstallError {
    /// A repository definition is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A signing key could not be installed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// A sources file could not be written.
    #[error(transparent)]
    Sources(#[from] SourcesError),

    /// The preferences file could not be updated.
    #[error(transparent)]
    Preferences(#[from] PreferencesError),

    /// The HTTP client could not be created.
    #[error("Failed to initialise HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// A blocking key installation task panicked or was cancelled.
    #[error("Key installation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Installs keys, sources and pin preferences for package repositories.
#[derive(Clone)]
pub struct Installer {
    keys: AptKeyManager,
    sources: AptSourcesManager,
    preferences_path: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("keys", &self.keys)
            .field("sources", &self.sources)
            .field("preferences_path", &self.preferences_path)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// An installer for `root` using the host `gpg`, the Launchpad API at
    /// `launchpad_api` and the public cloud archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        root: &Path,
        key_assets: Option<PathBuf>,
        launchpad_api: &str,
    ) -> Result<Self, InstallError> {
        let client = crate::http_client()?;
        let keys = AptKeyManager::new(
            paths::keyrings_dir(root),
            key_assets,
            Arc::new(SystemGpg::new()),
        )
        .with_launchpad(LaunchpadClient::with_api(client.clone(), launchpad_api));
        let sources = AptSourcesManager::new(root, UcaClient::new(client));
        Ok(Self::from_parts(keys, sources, paths::preferences_file(root)))
    }

    /// An installer assembled from explicit parts.
    pub fn from_parts(
        keys: AptKeyManager,
        sources: AptSourcesManager,
        preferences_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            keys,
            sources,
            preferences_path: preferences_path.into(),
            reporter: Arc::new(NullReporter),
        }
    }

    /// Report progress to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Install every repository in order, then write the pin preferences.
    ///
    /// The preferences file ends up holding exactly the pins of
    /// `repositories` that set a priority.
    ///
    /// Returns `true` if anything changed and the package index needs a
    /// refresh.
    ///
    /// # Errors
    ///
    /// Stops at the first repository that cannot be installed.
    pub async fn install(&self, repositories: &[PackageRepository]) -> Result<bool, InstallError> {
        let mut refresh_required = false;
        let mut preferences = AptPreferencesManager::empty(&self.preferences_path);
        let mut seen = HashSet::new();

        self.reporter.section("Installing package repositories");
        for repo in repositories {
            let location = repo.location();
            self.reporter.repository(repo.kind(), location);
            if !seen.insert(location) {
                self.reporter.warning(&format!("{location} is listed more than once"));
            }

            let key_id = self.keys.repository_key_id(repo).await?;
            if matches!(repo, PackageRepository::Ppa(_)) {
                self.reporter.info(&format!("Launchpad reports signing key {key_id}"));
            }
            if self.ensure_key(repo, &key_id).await? {
                self.reporter.changed(location, "key installed");
                refresh_required = true;
            } else {
                self.reporter.unchanged(location, "key already installed");
            }

            if self
                .sources
                .install_package_repository_sources(repo, &key_id)
                .await?
            {
                self.reporter.changed(location, "sources written");
                refresh_required = true;
            } else {
                self.reporter.unchanged(location, "sources up to date");
            }

            if let Some(priority) = repo.priority() {
                preferences.add(repo.pin(), priority);
            }
        }

        if preferences.write()? {
            self.reporter.changed(
                &self.preferences_path.display().to_string(),
                "preferences updated",
            );
            refresh_required = true;
        }

        tracing::debug!(
            count = repositories.len(),
            refresh_required,
            "Package repositories installed"
        );
        self.reporter.summary(repositories.len(), refresh_required);
        Ok(refresh_required)
    }

    // gpg may download from a keyserver, so keep it off the runtime.
    async fn ensure_key(
        &self,
        repo: &PackageRepository,
        key_id: &str,
    ) -> Result<bool, InstallError> {
        let keys = self.keys.clone();
        let key_id = key_id.to_string();
        let key_server = match repo {
            PackageRepository::Apt(apt) => apt.key_server().map(str::to_string),
            _ => None,
        };
        let installed =
            tokio::task::spawn_blocking(move || keys.ensure_key(&key_id, key_server.as_deref()))
                .await??;
        Ok(installed)
    }

    /// Validate marshalled repositories, then [`install`](Self::install) them.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions are invalid or installation fails.
    pub async fn install_values(&self, data: &Value) -> Result<bool, InstallError> {
        let repositories = PackageRepository::unmarshal_package_repositories(Some(data))?;
        self.install(&repositories).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpg::testing::RecordingGpg;
    use serde_json::json;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const KEY_A: &str = "78E1918602959B9C59103100F1831DDAFC42E99D";
    const KEY_B: &str = "1234567890ABCDEF1234567890ABCDEF12345678";

    fn installer(root: &Path, gpg: Arc<RecordingGpg>) -> Installer {
        let client = reqwest::Client::new();
        let keys = AptKeyManager::new(paths::keyrings_dir(root), None, gpg)
            .with_launchpad(LaunchpadClient::with_api(client.clone(), "http://127.0.0.1:1"));
        let uca = UcaClient::with_archive(client, "http://127.0.0.1:1");
        let sources = AptSourcesManager::new(root, uca);
        Installer::from_parts(keys, sources, paths::preferences_file(root))
    }

    fn project() -> Value {
        json!([
            {
                "type": "apt",
                "url": "https://download.example.com/debian",
                "key-id": KEY_A,
                "path": "/",
                "priority": "always",
            },
            {
                "type": "apt",
                "url": "http://other.example.com:8080/ubuntu",
                "key-id": KEY_B,
                "name": "other",
                "suites": ["jammy"],
                "components": ["main"],
            },
        ])
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Reporter for Recorder {
        fn section(&self, _: &str) {}
        fn repository(&self, kind: &str, location: &str) {
            self.0.lock().unwrap().push(format!("{kind} {location}"));
        }
        fn changed(&self, _: &str, detail: &str) {
            self.0.lock().unwrap().push(detail.to_string());
        }
        fn unchanged(&self, _: &str, _: &str) {}
        fn info(&self, msg: &str) {
            self.0.lock().unwrap().push(format!("info: {msg}"));
        }
        fn warning(&self, msg: &str) {
            self.0.lock().unwrap().push(format!("warning: {msg}"));
        }
        fn summary(&self, count: usize, refresh: bool) {
            self.0.lock().unwrap().push(format!("{count} {refresh}"));
        }
    }

    #[tokio::test]
    async fn installs_keys_sources_and_preferences() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let gpg = Arc::new(RecordingGpg::new());
        let recorder = Arc::new(Recorder::default());
        let installer = installer(root, gpg.clone()).with_reporter(recorder.clone());

        assert!(installer.install_values(&project()).await.unwrap());

        assert!(root.join("etc/apt/keyrings/craft-FC42E99D.gpg").is_file());
        assert!(root.join("etc/apt/keyrings/craft-12345678.gpg").is_file());
        assert!(
            root.join("etc/apt/sources.list.d/craft-https_download_example_com_debian.sources")
                .is_file()
        );
        let other =
            fs::read_to_string(root.join("etc/apt/sources.list.d/craft-other.sources")).unwrap();
        assert!(other.contains("Signed-By: /etc/apt/keyrings/craft-12345678.gpg\n"));
        assert_eq!(
            fs::read_to_string(root.join("etc/apt/preferences.d/craft-archives")).unwrap(),
            "# This file is managed by craft-archives\n\n\
             Package: *\n\
             Pin: origin \"download.example.com\"\n\
             Pin-Priority: 1000\n\n"
        );
        let events = recorder.0.lock().unwrap();
        assert_eq!(events[0], "apt https://download.example.com/debian");
        assert_eq!(events.last().unwrap(), "2 true");
    }

    #[tokio::test]
    async fn second_install_needs_no_refresh() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let installer = installer(dir.path(), gpg);

        assert!(installer.install_values(&project()).await.unwrap());
        assert!(!installer.install_values(&project()).await.unwrap());
    }

    #[tokio::test]
    async fn dropping_priorities_removes_preferences() {
        let dir = TempDir::new().unwrap();
        let installer = installer(dir.path(), Arc::new(RecordingGpg::new()));
        installer.install_values(&project()).await.unwrap();

        let mut project = project();
        project[0].as_object_mut().unwrap().remove("priority");

        assert!(installer.install_values(&project).await.unwrap());
        assert!(!dir.path().join("etc/apt/preferences.d/craft-archives").exists());
    }

    #[tokio::test]
    async fn invalid_definitions_touch_nothing() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let installer = installer(dir.path(), gpg.clone());

        let err = installer
            .install_values(&json!([{"type": "apt", "url": "", "key-id": KEY_A}]))
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Validation(_)));
        assert!(gpg.calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_repository_is_reported() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let installer =
            installer(dir.path(), Arc::new(RecordingGpg::new())).with_reporter(recorder.clone());
        let mut project = project();
        let first = project[0].clone();
        project.as_array_mut().unwrap().push(first);

        installer.install_values(&project).await.unwrap();

        let events = recorder.0.lock().unwrap();
        assert!(events.contains(
            &"warning: https://download.example.com/debian is listed more than once".to_string()
        ));
    }

    #[tokio::test]
    async fn ppa_key_is_looked_up_and_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/~snappy-dev/+archive/ubuntu/snapcraft-daily")
            .with_status(200)
            .with_body(format!(r#"{{"signing_key_fingerprint": "{KEY_A}"}}"#))
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("etc")).unwrap();
        fs::write(root.join("etc/os-release"), "VERSION_CODENAME=jammy\n").unwrap();
        let client = reqwest::Client::new();
        let keys = AptKeyManager::new(
            paths::keyrings_dir(root),
            None,
            Arc::new(RecordingGpg::new()),
        )
        .with_launchpad(LaunchpadClient::with_api(client.clone(), server.url()));
        let sources =
            AptSourcesManager::new(root, UcaClient::with_archive(client, "http://127.0.0.1:1"));
        let recorder = Arc::new(Recorder::default());
        let installer = Installer::from_parts(keys, sources, paths::preferences_file(root))
            .with_reporter(recorder.clone());

        installer
            .install_values(&json!([{"type": "apt", "ppa": "snappy-dev/snapcraft-daily"}]))
            .await
            .unwrap();

        let events = recorder.0.lock().unwrap();
        assert!(events.contains(&format!("info: Launchpad reports signing key {KEY_A}")));
        assert!(
            root.join("etc/apt/sources.list.d/craft-ppa-snappy-dev_snapcraft-daily.sources")
                .is_file()
        );
    }

    #[tokio::test]
    async fn empty_project() {
        let dir = TempDir::new().unwrap();
        let installer = installer(dir.path(), Arc::new(RecordingGpg::new()));
        assert!(!installer.install(&[]).await.unwrap());
    }
}
