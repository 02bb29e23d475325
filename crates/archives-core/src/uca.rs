//! Ubuntu Cloud Archive release checks.

use archives_schema::{UCA_ARCHIVE, UcaPocket, UcaRepository};
use thiserror::Error;

/// The cloud archive cannot be used on this host.
#[derive(Error, Debug)]
#[error("Failed to install UCA '{cloud}/{pocket}': {reason}")]
pub struct UcaError {
    /// Cloud release name.
    pub cloud: String,
    /// Archive pocket.
    pub pocket: UcaPocket,
    /// What went wrong.
    pub reason: String,
}

/// Checks cloud releases against the archive.
#[derive(Debug, Clone)]
pub struct UcaClient {
    client: reqwest::Client,
    archive: String,
}

impl UcaClient {
    /// Client for the public cloud archive.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_archive(client, UCA_ARCHIVE)
    }

    /// Client for an alternative archive root.
    pub fn with_archive(client: reqwest::Client, archive: impl Into<String>) -> Self {
        Self {
            client,
            archive: archive.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fail unless `repo` is published for the host release `codename`.
    ///
    /// # Errors
    ///
    /// Returns a [`UcaError`] if the archive has no such release or the
    /// request fails.
    pub async fn check_release_compatibility(
        &self,
        codename: &str,
        repo: &UcaRepository,
    ) -> Result<(), UcaError> {
        let pocket = repo.pocket();
        let url = format!("{}/dists/{codename}-{pocket}/{}/", self.archive, repo.cloud());
        let fail = |reason: String| UcaError {
            cloud: repo.cloud().to_string(),
            pocket,
            reason,
        };

        tracing::debug!("Checking cloud archive release at {url}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fail(format!("failed to fetch release: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(fail(format!("not a valid release for '{codename}'")));
        }
        if !status.is_success() {
            return Err(fail(format!(
                "unexpected status code {}: '{}' while fetching release",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(())
    }
}
