//! Launchpad lookups for Personal Package Archives.

use archives_schema::{PpaFormatError, PpaRepository};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the Launchpad API base URL.
pub const LAUNCHPAD_API_ENV: &str = "CRAFT_ARCHIVES_LAUNCHPAD_API";

/// Launchpad web service root.
pub const DEFAULT_LAUNCHPAD_API: &str = "https://api.launchpad.net/devel";

/// A PPA could not be looked up.
#[derive(Error, Debug)]
pub enum LaunchpadError {
    /// The PPA is not `owner/name`.
    #[error(transparent)]
    Format(#[from] PpaFormatError),

    /// Transport failure or unexpected HTTP status.
    #[error("Failed to query Launchpad: {0}")]
    Http(#[from] reqwest::Error),

    /// Launchpad has no such archive.
    #[error("Failed to install PPA '{ppa}': not found on Launchpad")]
    NotFound {
        /// The PPA as given.
        ppa: String,
    },

    /// The archive exists but has no signing key yet.
    #[error("Failed to install PPA '{ppa}': archive has no signing key")]
    NoSigningKey {
        /// The PPA as given.
        ppa: String,
    },
}

#[derive(Debug, Deserialize)]
struct Archive {
    signing_key_fingerprint: Option<String>,
}

/// Client for the parts of the Launchpad API needed to trust a PPA.
#[derive(Debug, Clone)]
pub struct LaunchpadClient {
    client: reqwest::Client,
    api: String,
}

impl LaunchpadClient {
    /// Client for an explicit API root.
    pub fn with_api(client: reqwest::Client, api: impl Into<String>) -> Self {
        Self {
            client,
            api: api.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fingerprint of the key that signs `ppa`.
    ///
    /// # Errors
    ///
    /// Returns an error if the PPA is malformed, unknown to Launchpad, or
    /// the request fails.
    pub async fn ppa_signing_key_id(&self, ppa: &PpaRepository) -> Result<String, LaunchpadError> {
        let (owner, name) = ppa.split()?;
        let url = format!("{}/~{owner}/+archive/ubuntu/{name}", self.api);
        tracing::debug!("Fetching PPA details from {url}");

        let resp = self.client.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LaunchpadError::NotFound {
                ppa: ppa.ppa().to_string(),
            });
        }
        let archive: Archive = resp.error_for_status()?.json().await?;

        archive
            .signing_key_fingerprint
            .filter(|fp| !fp.is_empty())
            .ok_or_else(|| LaunchpadError::NoSigningKey {
                ppa: ppa.ppa().to_string(),
            })
    }
}

/// Archive URL of a PPA.
///
/// # Errors
///
/// Returns a [`PpaFormatError`] if the PPA is not `owner/name`.
pub fn ppa_url(ppa: &PpaRepository) -> Result<String, PpaFormatError> {
    let (owner, name) = ppa.split()?;
    Ok(format!("http://ppa.launchpad.net/{owner}/{name}/ubuntu"))
}
