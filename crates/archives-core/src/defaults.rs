//! The system's default sources and their migration to old-releases.
//!
//! Once an Ubuntu release reaches end of life its archive moves from
//! `archive.ubuntu.com` to `old-releases.ubuntu.com`, and a root built from
//! an old image can no longer refresh its package index. [`use_old_releases`]
//! points the default sources at the old-releases archive for every suite
//! that has moved.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use archives_schema::{AptSource, SourceParseError};
use thiserror::Error;

use crate::paths;

/// The Ubuntu old-releases archive.
pub const OLD_RELEASES_URL: &str = "http://old-releases.ubuntu.com/ubuntu";

/// Environment variable overriding [`OLD_RELEASES_URL`].
pub const OLD_RELEASES_URL_ENV: &str = "CRAFT_ARCHIVES_OLD_RELEASES_URL";

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default sources could not be found, probed or rewritten.
#[derive(Error, Debug)]
pub enum DefaultsError {
    /// Neither default sources file exists.
    #[error("No default sources found in '{}' or '{}'", sources_list.display(), deb822.display())]
    NotFound {
        /// The one-line format candidate.
        sources_list: PathBuf,
        /// The deb822 format candidate.
        deb822: PathBuf,
    },

    /// A default sources file is malformed.
    #[error("Failed to parse '{}': {source}", path.display())]
    Parse {
        /// The offending file.
        path: PathBuf,
        /// What went wrong.
        source: SourceParseError,
    },

    /// Only HTTP archives can be probed.
    #[error("Don't know how to handle non-HTTP archives: {url}")]
    NonHttp {
        /// The archive URL.
        url: String,
    },

    /// The archive kept failing after every retry.
    #[error("Failed to probe '{url}': {reason}")]
    Probe {
        /// The probed URL.
        url: String,
        /// Last failure seen.
        reason: String,
    },

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk format of a sources file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcesFormat {
    /// `etc/apt/sources.list` one-line entries.
    OneLine,
    /// deb822 paragraphs.
    Deb822,
}

/// The default sources in use on a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSources {
    /// File the sources were read from.
    pub path: PathBuf,
    /// Format of that file.
    pub format: SourcesFormat,
    /// Every entry in the file.
    pub sources: Vec<AptSource>,
}

impl DefaultSources {
    /// The file content for the current entries, in the original format.
    pub fn render(&self) -> String {
        match self.format {
            SourcesFormat::Deb822 => self
                .sources
                .iter()
                .map(AptSource::to_deb822)
                .collect::<Vec<_>>()
                .join("\n"),
            SourcesFormat::OneLine => {
                let lines: Vec<String> = self
                    .sources
                    .iter()
                    .flat_map(AptSource::to_sources_list)
                    .collect();
                format!("{}\n", lines.join("\n"))
            }
        }
    }

    /// Write the entries back to [`Self::path`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self) -> Result<(), DefaultsError> {
        fs::write(&self.path, self.render())?;
        Ok(())
    }
}

/// Find the default sources of `root`.
///
/// `etc/apt/sources.list` wins if it has any entries; otherwise the deb822
/// file `etc/apt/sources.list.d/<deb822_name>` is used.
///
/// # Errors
///
/// Returns an error if neither file has sources or a file is malformed.
pub fn default_sources_file(
    root: &Path,
    deb822_name: &str,
) -> Result<DefaultSources, DefaultsError> {
    let sources_list = paths::sources_list(root);
    if sources_list.is_file() {
        let sources = AptSource::from_sources_list(&sources_list).map_err(|source| {
            DefaultsError::Parse {
                path: sources_list.clone(),
                source,
            }
        })?;
        if !sources.is_empty() {
            return Ok(DefaultSources {
                path: sources_list,
                format: SourcesFormat::OneLine,
                sources,
            });
        }
        tracing::debug!("{} has no entries", sources_list.display());
    }

    let deb822 = paths::deb822_default_sources(root, deb822_name);
    if !deb822.is_file() {
        return Err(DefaultsError::NotFound {
            sources_list,
            deb822,
        });
    }
    let sources = AptSource::from_deb822(&deb822).map_err(|source| DefaultsError::Parse {
        path: deb822.clone(),
        source,
    })?;
    Ok(DefaultSources {
        path: deb822,
        format: SourcesFormat::Deb822,
        sources,
    })
}

/// Probes an old-releases archive for suites, remembering the answers.
#[derive(Debug)]
pub struct OldReleases {
    client: reqwest::Client,
    url: String,
    retries: u32,
    retry_delay: Duration,
    cache: Mutex<HashMap<String, bool>>,
}

impl OldReleases {
    /// Prober for `url` (see [`OLD_RELEASES_URL`]).
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Base delay between retries. The n-th retry waits `delay / retries_left`.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The archive URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether `suite` is published on the old-releases archive.
    ///
    /// # Errors
    ///
    /// Returns an error for non-HTTP archives, or if the server keeps
    /// failing after all retries.
    pub async fn is_on_old_releases(&self, suite: &str) -> Result<bool, DefaultsError> {
        if let Some(&known) = self.cache_lock().get(suite) {
            return Ok(known);
        }

        let url = format!("{}/dists/{suite}/Release", self.url);
        if !url.starts_with("http") {
            return Err(DefaultsError::NonHttp { url });
        }

        let mut retries = self.retries;
        let found = loop {
            let reason = match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_server_error() => resp.status().to_string(),
                Ok(resp) => break !resp.status().is_client_error(),
                Err(e) => e.to_string(),
            };
            if retries == 0 {
                return Err(DefaultsError::Probe { url, reason });
            }
            tracing::debug!("Probing {url} failed ({reason}), {retries} retries left");
            tokio::time::sleep(self.retry_delay / retries).await;
            retries -= 1;
        };

        tracing::debug!("{suite} on old-releases: {found}");
        self.cache_lock().insert(suite.to_string(), found);
        Ok(found)
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, bool>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Point the default sources of `root` at the old-releases archive for every
/// suite that has moved there.
///
/// Returns `true` if the sources were rewritten.
///
/// # Errors
///
/// Returns an error if the default sources cannot be found, probed or
/// rewritten.
pub async fn use_old_releases(
    root: &Path,
    deb822_name: &str,
    old_releases: &OldReleases,
) -> Result<bool, DefaultsError> {
    let mut defaults = default_sources_file(root, deb822_name)?;
    let mut changed = false;

    for source in &mut defaults.sources {
        for suite in source.suites.clone() {
            if old_releases.is_on_old_releases(&suite).await? {
                tracing::info!("Moving {suite} to {}", old_releases.url());
                source.uris = vec![old_releases.url().to_string()];
                changed = true;
            }
        }
    }

    if changed {
        defaults.write()?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    const SOURCES_LIST: &str = "\
deb http://archive.ubuntu.com/ubuntu mantic main restricted
deb http://archive.ubuntu.com/ubuntu mantic-updates main restricted
";

    const UBUNTU_SOURCES: &str = "\
Types: deb
URIs: http://archive.ubuntu.com/ubuntu
Suites: mantic mantic-updates
Components: main universe
Signed-By: /usr/share/keyrings/ubuntu-archive-keyring.gpg
";

    fn root_with(sources_list: Option<&str>, deb822: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("etc/apt/sources.list.d")).unwrap();
        if let Some(content) = sources_list {
            fs::write(dir.path().join("etc/apt/sources.list"), content).unwrap();
        }
        if let Some(content) = deb822 {
            fs::write(dir.path().join("etc/apt/sources.list.d/ubuntu.sources"), content).unwrap();
        }
        dir
    }

    fn prober(url: &str) -> OldReleases {
        OldReleases::new(reqwest::Client::new(), url).with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn prefers_populated_sources_list() {
        let root = root_with(Some(SOURCES_LIST), Some(UBUNTU_SOURCES));
        let defaults = default_sources_file(root.path(), "ubuntu.sources").unwrap();
        assert_eq!(defaults.format, SourcesFormat::OneLine);
        assert_eq!(defaults.sources.len(), 2);
    }

    #[test]
    fn falls_back_to_deb822() {
        let comment_only = "# Ubuntu sources have moved to ubuntu.sources\n";
        for sources_list in [None, Some(comment_only)] {
            let root = root_with(sources_list, Some(UBUNTU_SOURCES));
            let defaults = default_sources_file(root.path(), "ubuntu.sources").unwrap();
            assert_eq!(defaults.format, SourcesFormat::Deb822);
            assert_eq!(defaults.sources[0].suites, ["mantic", "mantic-updates"]);
        }
    }

    #[test]
    fn no_default_sources() {
        let root = root_with(None, None);
        let err = default_sources_file(root.path(), "ubuntu.sources").unwrap_err();
        assert!(matches!(err, DefaultsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn probe_statuses() {
        let mut server = Server::new_async().await;
        let _found = server
            .mock("GET", "/dists/dapper/Release")
            .with_status(200)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/dists/noble/Release")
            .with_status(404)
            .create_async()
            .await;

        let old = prober(&server.url());
        assert!(old.is_on_old_releases("dapper").await.unwrap());
        assert!(!old.is_on_old_releases("noble").await.unwrap());
    }

    #[tokio::test]
    async fn probe_is_memoised() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/dists/dapper/Release")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let old = prober(&server.url());
        assert!(old.is_on_old_releases("dapper").await.unwrap());
        assert!(old.is_on_old_releases("dapper").await.unwrap());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/dists/dapper/Release")
            .with_status(503)
            .expect(4)
            .create_async()
            .await;

        let old = prober(&server.url());
        let err = old.is_on_old_releases("dapper").await.unwrap_err();

        m.assert_async().await;
        assert!(matches!(err, DefaultsError::Probe { .. }));
    }

    #[tokio::test]
    async fn connection_errors_are_retried() {
        let old = prober("http://127.0.0.1:1");
        let err = old.is_on_old_releases("dapper").await.unwrap_err();

        match err {
            DefaultsError::Probe { url, reason } => {
                assert_eq!(url, "http://127.0.0.1:1/dists/dapper/Release");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(old.cache_lock().is_empty());
    }

    #[tokio::test]
    async fn non_http_archive() {
        let old = prober("ftp://old-releases.ubuntu.com/ubuntu");
        let err = old.is_on_old_releases("dapper").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Don't know how to handle non-HTTP archives: \
             ftp://old-releases.ubuntu.com/ubuntu/dists/dapper/Release"
        );
    }

    #[tokio::test]
    async fn migrates_sources_list() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("GET", "/dists/mantic/Release")
            .with_status(200)
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/dists/mantic-updates/Release")
            .with_status(200)
            .create_async()
            .await;
        let root = root_with(Some(SOURCES_LIST), None);
        let old = prober(&server.url());

        assert!(use_old_releases(root.path(), "ubuntu.sources", &old).await.unwrap());

        let url = server.url();
        assert_eq!(
            fs::read_to_string(root.path().join("etc/apt/sources.list")).unwrap(),
            format!("deb {url} mantic main restricted\ndeb {url} mantic-updates main restricted\n")
        );
    }

    #[tokio::test]
    async fn migrates_deb822() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("GET", "/dists/mantic/Release")
            .with_status(200)
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/dists/mantic-updates/Release")
            .with_status(404)
            .create_async()
            .await;
        let root = root_with(None, Some(UBUNTU_SOURCES));
        let old = prober(&server.url());

        assert!(use_old_releases(root.path(), "ubuntu.sources", &old).await.unwrap());

        let written =
            fs::read_to_string(root.path().join("etc/apt/sources.list.d/ubuntu.sources")).unwrap();
        assert!(written.contains(&format!("URIs: {}\n", server.url())));
        assert!(written.contains("Suites: mantic mantic-updates\n"));
        assert!(written.contains("Signed-By: /usr/share/keyrings/ubuntu-archive-keyring.gpg\n"));
    }

    #[tokio::test]
    async fn migrates_deb822_with_inline_key() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/dists/mantic/Release")
            .with_status(200)
            .create_async()
            .await;
        let inline = "\
Types: deb
URIs: http://archive.ubuntu.com/ubuntu
Suites: mantic
Components: main
Signed-By:
 -----BEGIN PGP PUBLIC KEY BLOCK-----
 .
 mQINBFufwdoBEADv/Gxytx/LcSXYuM0MwKojbBye81s0G1nEx+lz6VAUpIUZnbkq
 -----END PGP PUBLIC KEY BLOCK-----
";
        let root = root_with(None, Some(inline));
        let old = prober(&server.url());

        assert!(use_old_releases(root.path(), "ubuntu.sources", &old).await.unwrap());

        let written =
            fs::read_to_string(root.path().join("etc/apt/sources.list.d/ubuntu.sources")).unwrap();
        let url = "http://archive.ubuntu.com/ubuntu";
        assert_eq!(written, inline.replace(url, &server.url()));
    }

    #[tokio::test]
    async fn supported_release_is_untouched() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let root = root_with(Some(SOURCES_LIST), None);
        let old = prober(&server.url());

        assert!(!use_old_releases(root.path(), "ubuntu.sources", &old).await.unwrap());
        assert_eq!(
            fs::read_to_string(root.path().join("etc/apt/sources.list")).unwrap(),
            SOURCES_LIST
        );
    }
}
