//! Generation of deb822 `.sources` files for package repositories.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use archives_schema::{
    AptRepository, AptSource, DebFormat, PackageRepository, PpaFormatError, PpaRepository,
    SignedBy, UcaRepository,
};
use thiserror::Error;

use crate::launchpad;
use crate::paths;
use crate::uca::{UcaClient, UcaError};

/// A sources file could not be produced.
#[derive(Error, Debug)]
pub enum SourcesError {
    /// The signing key must be installed before its sources.
    #[error("Failed to install sources for '{name}': keyring '{}' does not exist", keyring.display())]
    MissingKeyring {
        /// Repository name.
        name: String,
        /// Expected keyring location.
        keyring: PathBuf,
    },

    /// An APT repository names neither suites nor a path.
    #[error("Failed to install sources for '{name}': no suites or path specified")]
    NoSuites {
        /// Repository name.
        name: String,
    },

    /// The host release could not be determined.
    #[error("Failed to determine host release from '{}'", path.display())]
    Codename {
        /// The os-release file consulted.
        path: PathBuf,
    },

    /// The PPA is not `owner/name`.
    #[error(transparent)]
    PpaFormat(#[from] PpaFormatError),

    /// The cloud archive does not support the host release.
    #[error(transparent)]
    Uca(#[from] UcaError),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes one `craft-<name>.sources` file per repository.
#[derive(Debug, Clone)]
pub struct AptSourcesManager {
    root: PathBuf,
    sources_list_d: PathBuf,
    keyrings_dir: PathBuf,
    uca: UcaClient,
}

impl AptSourcesManager {
    /// Manage sources under `root`, checking cloud archive releases with `uca`.
    pub fn new(root: impl Into<PathBuf>, uca: UcaClient) -> Self {
        let root = root.into();
        Self {
            sources_list_d: paths::sources_list_d(&root),
            keyrings_dir: paths::keyrings_dir(&root),
            root,
            uca,
        }
    }

    /// Path of the sources file for a repository called `name`.
    pub fn sources_path(&self, name: &str) -> PathBuf {
        self.sources_list_d.join(paths::sources_file_name(name))
    }

    /// Codename of the release installed under the root, e.g. `jammy`.
    ///
    /// # Errors
    ///
    /// Returns an error if `etc/os-release` is unreadable or names no
    /// release.
    pub fn host_codename(&self) -> Result<String, SourcesError> {
        let path = paths::os_release(&self.root);
        let fields = parse_os_release(&fs::read_to_string(&path)?);
        let field = |key: &str| fields.get(key).filter(|c| !c.is_empty());
        field("VERSION_CODENAME")
            .or_else(|| field("UBUNTU_CODENAME"))
            .cloned()
            .ok_or(SourcesError::Codename { path })
    }

    /// Write the sources for `repo`, trusting the keyring of `key_id`.
    ///
    /// Returns `true` if the file was created or its content changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring is missing, a cloud archive is not
    /// available for the host release, or the file cannot be written.
    pub async fn install_package_repository_sources(
        &self,
        repo: &PackageRepository,
        key_id: &str,
    ) -> Result<bool, SourcesError> {
        let (name, mut source) = match repo {
            PackageRepository::Apt(apt) => (apt.name(), apt_source(apt)?),
            PackageRepository::Ppa(ppa) => self.ppa_source(ppa)?,
            PackageRepository::Uca(uca) => self.uca_source(uca).await?,
        };

        let keyring = paths::keyring_path(&self.keyrings_dir, key_id);
        if !keyring.is_file() {
            return Err(SourcesError::MissingKeyring { name, keyring });
        }
        source.signed_by = Some(SignedBy::Path(paths::in_root(&self.root, &keyring)));

        self.write_sources(&name, &source.to_deb822())
    }

    fn ppa_source(&self, ppa: &PpaRepository) -> Result<(String, AptSource), SourcesError> {
        let (owner, name) = ppa.split()?;
        let source = AptSource::new(
            launchpad::ppa_url(ppa)?,
            vec![self.host_codename()?],
            vec!["main".to_string()],
        );
        Ok((format!("ppa-{owner}_{name}"), source))
    }

    async fn uca_source(&self, uca: &UcaRepository) -> Result<(String, AptSource), SourcesError> {
        let codename = self.host_codename()?;
        self.uca.check_release_compatibility(&codename, uca).await?;
        let source = AptSource::new(
            archives_schema::UCA_ARCHIVE,
            vec![format!("{codename}-{}/{}", uca.pocket(), uca.cloud())],
            vec!["main".to_string()],
        );
        Ok((format!("cloud-{}", uca.cloud()), source))
    }

    fn write_sources(&self, name: &str, content: &str) -> Result<bool, SourcesError> {
        let path = self.sources_path(name);
        if fs::read_to_string(&path).is_ok_and(|existing| existing == content) {
            tracing::debug!("Sources {} already up to date", path.display());
            return Ok(false);
        }

        fs::create_dir_all(&self.sources_list_d)?;
        fs::write(&path, content)?;
        tracing::debug!("Wrote sources {}", path.display());
        Ok(true)
    }
}

fn apt_source(apt: &AptRepository) -> Result<AptSource, SourcesError> {
    let (suites, components) = match (apt.path(), apt.suites()) {
        (Some(path), _) => (vec![path.to_string()], Vec::new()),
        (None, Some(suites)) if !suites.is_empty() => {
            (suites.to_vec(), apt.components().unwrap_or_default().to_vec())
        }
        _ => return Err(SourcesError::NoSuites { name: apt.name() }),
    };

    let mut source = AptSource::new(apt.url(), suites, components);
    source.types = apt
        .formats()
        .filter(|f| !f.is_empty())
        .map_or_else(|| vec![DebFormat::Deb], <[DebFormat]>::to_vec);
    source.architectures = apt.architectures().map(<[String]>::to_vec);
    Ok(source)
}

/// `KEY=value` pairs of an os-release file, with quotes removed.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}
