//! Installation of repository signing keys.
//!
//! Each key lives in its own binary keyring under `etc/apt/keyrings`,
//! named after the last eight characters of its fingerprint, so that a
//! sources entry can trust exactly one key with `Signed-By`.

use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use archives_schema::{DEFAULT_KEY_SERVER, PackageRepository, UCA_KEY_ID};
use thiserror::Error;

use crate::gpg::{self, GpgError, GpgRunner, KEY_NOT_FOUND_CODE};
use crate::launchpad::{LaunchpadClient, LaunchpadError};
use crate::paths;

/// Mode of installed keyrings: APT reads them unprivileged.
const KEYRING_MODE: u32 = 0o644;

/// Mode of the throwaway gpg home used for keyserver downloads.
const GPG_HOME_MODE: u32 = 0o700;

/// A key could not be inspected or installed.
#[derive(Error, Debug)]
pub enum KeyError {
    /// `gpg` refused the key or the keyserver lookup failed.
    #[error("Failed to install GPG key: {output}")]
    Install {
        /// Why the key was rejected.
        output: String,
        /// The key ID, when installing from a keyserver.
        key_id: Option<String>,
        /// The keyserver, when installing from one.
        key_server: Option<String>,
    },

    /// `gpg` could not be run.
    #[error(transparent)]
    Gpg(#[from] GpgError),

    /// The signing key of a PPA could not be determined.
    #[error(transparent)]
    Launchpad(#[from] LaunchpadError),

    /// A PPA key was needed but no Launchpad client is configured.
    #[error("Failed to look up the signing key of PPA '{ppa}': Launchpad is not available")]
    NoLaunchpad {
        /// The PPA as given.
        ppa: String,
    },

    /// Filesystem failure around the keyrings.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyError {
    fn install(output: impl Into<String>) -> Self {
        Self::Install {
            output: output.into(),
            key_id: None,
            key_server: None,
        }
    }
}

/// Installs and checks keys in a keyrings directory.
#[derive(Debug, Clone)]
pub struct AptKeyManager {
    keyrings_dir: PathBuf,
    key_assets: Option<PathBuf>,
    gpg: Arc<dyn GpgRunner>,
    launchpad: Option<LaunchpadClient>,
}

impl AptKeyManager {
    /// Create a manager writing to `keyrings_dir`.
    ///
    /// `key_assets` is a directory of bundled `<SHORTID>.asc` keys that are
    /// preferred over keyserver downloads.
    pub fn new(
        keyrings_dir: impl Into<PathBuf>,
        key_assets: Option<PathBuf>,
        gpg: Arc<dyn GpgRunner>,
    ) -> Self {
        Self {
            keyrings_dir: keyrings_dir.into(),
            key_assets,
            gpg,
            launchpad: None,
        }
    }

    /// Look up PPA signing keys with `launchpad`.
    pub fn with_launchpad(mut self, launchpad: LaunchpadClient) -> Self {
        self.launchpad = Some(launchpad);
        self
    }

    /// Directory holding the installed keyrings.
    pub fn keyrings_dir(&self) -> &Path {
        &self.keyrings_dir
    }

    /// The bundled key asset for `key_id`, if there is one.
    pub fn find_asset_with_key_id(&self, key_id: &str) -> Option<PathBuf> {
        let path = self.key_assets.as_ref()?.join(paths::asset_file_name(key_id));
        path.exists().then_some(path)
    }

    /// Fingerprints of every primary key in the armored or binary `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be written out or `gpg` fails.
    pub fn get_key_fingerprints(&self, key: &str) -> Result<Vec<String>, KeyError> {
        let temp = tempfile::NamedTempFile::new()?;
        fs::write(temp.path(), key)?;
        let args = gpg::args([OsStr::new("--show-keys"), temp.path().as_os_str()]);
        let output = self.gpg.run(&args, None)?;
        Ok(gpg::parse_fingerprints(&String::from_utf8_lossy(&output)))
    }

    /// Whether `key_id` is present in its keyring under `keyring_dir`.
    ///
    /// A missing keyring file is reported without calling `gpg`, which
    /// would otherwise create it.
    pub fn is_key_installed(&self, key_id: &str, keyring_dir: &Path) -> bool {
        let keyring = paths::keyring_path(keyring_dir, key_id);
        if !keyring.is_file() {
            tracing::debug!("Keyring file not found: {}", keyring.display());
            return false;
        }

        let mut args = gpg::keyring_args(&keyring);
        args.extend(gpg::args(["--list-keys", key_id]));
        tracing::debug!("Listing keys in keyring...");
        match self.gpg.run(&args, None) {
            Ok(_) => true,
            Err(err) => {
                if err.exit_code() != Some(KEY_NOT_FOUND_CODE) {
                    tracing::warn!("Unexpected gpg failure: {err}");
                }
                tracing::warn!(
                    "Keyring file {} does not contain the expected key.",
                    keyring.display()
                );
                false
            }
        }
    }

    /// Import a single key into its own keyring.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Install`] if `key` holds no key, more than one
    /// key, or `gpg` rejects it.
    pub fn install_key(&self, key: &str) -> Result<(), KeyError> {
        let fingerprints = self
            .get_key_fingerprints(key)
            .map_err(|e| KeyError::install(e.to_string()))?;
        let fingerprint = match fingerprints.as_slice() {
            [] => return Err(KeyError::install("Invalid GPG key")),
            [single] => single,
            _ => return Err(KeyError::install("Key must be a single key, not multiple.")),
        };

        fs::create_dir_all(&self.keyrings_dir)?;
        let keyring = paths::keyring_path(&self.keyrings_dir, fingerprint);
        let mut args = gpg::keyring_args(&keyring);
        args.extend(gpg::args(["--import", "-"]));
        self.gpg
            .run(&args, Some(key.as_bytes()))
            .map_err(|e| KeyError::install(e.to_string()))?;

        fs::set_permissions(&keyring, fs::Permissions::from_mode(KEYRING_MODE))?;
        tracing::debug!("Installed apt repository key {fingerprint}");
        Ok(())
    }

    /// Fetch `key_id` from `key_server` into its own keyring.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Install`] if the download fails.
    pub fn install_key_from_keyserver(
        &self,
        key_id: &str,
        key_server: &str,
    ) -> Result<(), KeyError> {
        let fail = |output: String| KeyError::Install {
            output,
            key_id: Some(key_id.to_string()),
            key_server: Some(key_server.to_string()),
        };

        fs::create_dir_all(&self.keyrings_dir)?;
        let keyring = paths::keyring_path(&self.keyrings_dir, key_id);

        // gpg needs a home directory for its scratch files while downloading.
        let home = tempfile::tempdir()?;
        fs::set_permissions(home.path(), fs::Permissions::from_mode(GPG_HOME_MODE))?;

        let mut args = gpg::keyring_args(&keyring);
        args.extend(gpg::args([
            OsStr::new("--homedir"),
            home.path().as_os_str(),
            OsStr::new("--keyserver"),
            OsStr::new(key_server),
            OsStr::new("--recv-keys"),
            OsStr::new(key_id),
        ]));
        self.gpg.run(&args, None).map_err(|e| fail(e.to_string()))?;

        fs::set_permissions(&keyring, fs::Permissions::from_mode(KEYRING_MODE))?;
        tracing::debug!("Installed key {key_id} from {key_server}");
        Ok(())
    }

    /// The fingerprint of the key that signs `repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if a PPA's key cannot be looked up on Launchpad, or
    /// no Launchpad client is configured.
    pub async fn repository_key_id(&self, repo: &PackageRepository) -> Result<String, KeyError> {
        Ok(match repo {
            PackageRepository::Apt(apt) => apt.key_id().to_string(),
            PackageRepository::Ppa(ppa) => match &self.launchpad {
                Some(launchpad) => launchpad.ppa_signing_key_id(ppa).await?,
                None => {
                    return Err(KeyError::NoLaunchpad {
                        ppa: ppa.ppa().to_string(),
                    });
                }
            },
            PackageRepository::Uca(_) => UCA_KEY_ID.to_string(),
        })
    }

    /// Make sure the key signing `repo` is installed.
    ///
    /// Returns `true` if a key was installed, `false` if it already was.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be determined or installed.
    pub async fn install_package_repository_key(
        &self,
        repo: &PackageRepository,
    ) -> Result<bool, KeyError> {
        let key_id = self.repository_key_id(repo).await?;
        let key_server = match repo {
            PackageRepository::Apt(apt) => apt.key_server(),
            _ => None,
        };
        self.ensure_key(&key_id, key_server)
    }

    /// Install `key_id` unless it is already present.
    ///
    /// A bundled asset is preferred; otherwise the key is fetched from
    /// `key_server`, or `keyserver.ubuntu.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be installed.
    pub fn ensure_key(&self, key_id: &str, key_server: Option<&str>) -> Result<bool, KeyError> {
        if self.is_key_installed(key_id, &self.keyrings_dir) {
            return Ok(false);
        }

        if let Some(asset) = self.find_asset_with_key_id(key_id) {
            tracing::debug!("Installing key {key_id} from {}", asset.display());
            self.install_key(&fs::read_to_string(asset)?)?;
        } else {
            self.install_key_from_keyserver(key_id, key_server.unwrap_or(DEFAULT_KEY_SERVER))?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpg::testing::RecordingGpg;
    use archives_schema::{AptRepository, PpaRepository, UcaPocket, UcaRepository};
    use mockito::Server;
    use tempfile::TempDir;

    const KEY_ID: &str = "78E1918602959B9C59103100F1831DDAFC42E99D";
    const SHOW_ONE: &str = "pub   rsa4096 2017-08-29 [SC]\n      78E1918602959B9C59103100F1831DDAFC42E99D\nuid  x\n";
    const SHOW_TWO: &str = "pub   rsa4096\n      AAAA\npub   rsa4096\n      BBBB\n";

    fn manager(dir: &TempDir, gpg: Arc<RecordingGpg>) -> AptKeyManager {
        let launchpad = LaunchpadClient::with_api(reqwest::Client::new(), "http://127.0.0.1:1");
        AptKeyManager::new(
            dir.path().join("keyrings"),
            Some(dir.path().join("assets")),
            gpg,
        )
        .with_launchpad(launchpad)
    }

    fn not_found() -> GpgError {
        GpgError::Failed {
            code: Some(2),
            output: "gpg: error reading key: No public key".into(),
        }
    }

    fn apt_repo(key_server: Option<&str>) -> PackageRepository {
        AptRepository::builder("http://example.com/debian", KEY_ID)
            .key_server(key_server.map(str::to_string))
            .build()
            .unwrap()
            .into()
    }

    #[test]
    fn find_asset() {
        let dir = TempDir::new().unwrap();
        let keys = manager(&dir, Arc::new(RecordingGpg::new()));
        assert_eq!(keys.find_asset_with_key_id(KEY_ID), None);

        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/FC42E99D.asc"), "key").unwrap();
        assert_eq!(
            keys.find_asset_with_key_id(KEY_ID),
            Some(dir.path().join("assets/FC42E99D.asc"))
        );
    }

    #[test]
    fn fingerprints_via_show_keys() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new().respond(Ok(SHOW_ONE)));
        let keys = manager(&dir, gpg.clone());

        assert_eq!(keys.get_key_fingerprints("KEY").unwrap(), vec![KEY_ID.to_string()]);
        let calls = gpg.calls();
        assert_eq!(calls[0][0], "--show-keys");
        assert_eq!(calls[0].len(), 2);
    }

    #[test]
    fn missing_keyring_skips_gpg() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());

        assert!(!keys.is_key_installed(KEY_ID, keys.keyrings_dir()));
        assert!(gpg.calls().is_empty());
    }

    #[test]
    fn installed_key_is_listed() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());
        fs::create_dir_all(keys.keyrings_dir()).unwrap();
        let keyring = keys.keyrings_dir().join("craft-FC42E99D.gpg");
        fs::write(&keyring, "").unwrap();

        assert!(keys.is_key_installed(KEY_ID, keys.keyrings_dir()));
        assert_eq!(
            gpg.calls()[0],
            vec![
                "--keyring".to_string(),
                format!("gnupg-ring:{}", keyring.display()),
                "--list-keys".to_string(),
                KEY_ID.to_string(),
            ]
        );
    }

    #[test]
    fn key_missing_from_keyring() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new().respond(Err(not_found())));
        let keys = manager(&dir, gpg);
        fs::create_dir_all(keys.keyrings_dir()).unwrap();
        fs::write(keys.keyrings_dir().join("craft-FC42E99D.gpg"), "").unwrap();

        assert!(!keys.is_key_installed(KEY_ID, keys.keyrings_dir()));
    }

    #[test]
    fn install_key_imports_and_sets_mode() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new().respond(Ok(SHOW_ONE)));
        let keys = manager(&dir, gpg.clone());

        keys.install_key("FAKE-KEY").unwrap();

        let keyring = keys.keyrings_dir().join("craft-FC42E99D.gpg");
        let calls = gpg.calls.lock().unwrap();
        let import = &calls[1];
        assert_eq!(import.0[2..], ["--import".to_string(), "-".to_string()]);
        assert_eq!(import.1.as_deref(), Some(b"FAKE-KEY".as_slice()));
        let mode = fs::metadata(&keyring).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn install_key_rejects_bad_input() {
        let dir = TempDir::new().unwrap();

        let keys = manager(&dir, Arc::new(RecordingGpg::new().respond(Ok(""))));
        assert_eq!(
            keys.install_key("nonsense").unwrap_err().to_string(),
            "Failed to install GPG key: Invalid GPG key"
        );

        let keys = manager(&dir, Arc::new(RecordingGpg::new().respond(Ok(SHOW_TWO))));
        assert_eq!(
            keys.install_key("two keys").unwrap_err().to_string(),
            "Failed to install GPG key: Key must be a single key, not multiple."
        );
    }

    #[test]
    fn install_key_import_failure() {
        let dir = TempDir::new().unwrap();
        let failure = GpgError::Failed {
            code: Some(2),
            output: "gpg: no valid OpenPGP data found.".into(),
        };
        let gpg = RecordingGpg::new().respond(Ok(SHOW_ONE)).respond(Err(failure));
        let keys = manager(&dir, Arc::new(gpg));

        assert_eq!(
            keys.install_key("KEY").unwrap_err().to_string(),
            "Failed to install GPG key: gpg: no valid OpenPGP data found."
        );
    }

    #[test]
    fn install_from_keyserver() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());

        keys.install_key_from_keyserver(KEY_ID, "key.server").unwrap();

        let call = &gpg.calls()[0];
        assert_eq!(call[0], "--keyring");
        assert_eq!(call[2], "--homedir");
        assert_eq!(
            call[4..],
            ["--keyserver", "key.server", "--recv-keys", KEY_ID].map(String::from)
        );
        let keyring = keys.keyrings_dir().join("craft-FC42E99D.gpg");
        let mode = fs::metadata(keyring).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn keyserver_failure_names_key_and_server() {
        let dir = TempDir::new().unwrap();
        let failure = GpgError::Failed {
            code: Some(2),
            output: "gpg: keyserver receive failed: No data".into(),
        };
        let keys = manager(&dir, Arc::new(RecordingGpg::new().respond(Err(failure))));

        let err = keys.install_key_from_keyserver(KEY_ID, "key.server").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to install GPG key: gpg: keyserver receive failed: No data"
        );
        let KeyError::Install { key_id, key_server, .. } = err else {
            panic!("unexpected error");
        };
        assert_eq!(key_id.as_deref(), Some(KEY_ID));
        assert_eq!(key_server.as_deref(), Some("key.server"));
    }

    #[tokio::test]
    async fn repository_key_already_installed() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());
        fs::create_dir_all(keys.keyrings_dir()).unwrap();
        fs::write(keys.keyrings_dir().join("craft-FC42E99D.gpg"), "").unwrap();

        assert!(!keys.install_package_repository_key(&apt_repo(None)).await.unwrap());
        assert_eq!(gpg.calls().len(), 1);
    }

    #[tokio::test]
    async fn repository_key_from_asset() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/FC42E99D.asc"), "ASSET-KEY").unwrap();
        let gpg = Arc::new(RecordingGpg::new().respond(Ok(SHOW_ONE)));
        let keys = manager(&dir, gpg.clone());

        assert!(keys.install_package_repository_key(&apt_repo(None)).await.unwrap());
        let calls = gpg.calls.lock().unwrap();
        assert_eq!(calls[1].1.as_deref(), Some(b"ASSET-KEY".as_slice()));
    }

    #[tokio::test]
    async fn repository_key_from_keyserver() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());

        assert!(keys.install_package_repository_key(&apt_repo(None)).await.unwrap());
        assert!(gpg.calls()[0].contains(&"keyserver.ubuntu.com".to_string()));

        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());
        assert!(
            keys.install_package_repository_key(&apt_repo(Some("pgp.example.com")))
                .await
                .unwrap()
        );
        assert!(gpg.calls()[0].contains(&"pgp.example.com".to_string()));
    }

    #[tokio::test]
    async fn uca_key() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = manager(&dir, gpg.clone());
        let repo = UcaRepository::new("antelope", UcaPocket::Updates).unwrap().into();

        assert!(keys.install_package_repository_key(&repo).await.unwrap());
        assert!(gpg.calls()[0].contains(&UCA_KEY_ID.to_string()));
    }

    #[tokio::test]
    async fn ppa_key_from_launchpad() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/~snappy-dev/+archive/ubuntu/snapcraft-daily")
            .with_status(200)
            .with_body(format!(r#"{{"signing_key_fingerprint": "{KEY_ID}"}}"#))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = AptKeyManager::new(dir.path().join("keyrings"), None, gpg.clone())
            .with_launchpad(LaunchpadClient::with_api(reqwest::Client::new(), server.url()));
        let repo = PpaRepository::new("snappy-dev/snapcraft-daily").unwrap().into();

        assert!(keys.install_package_repository_key(&repo).await.unwrap());
        assert!(gpg.calls()[0].contains(&KEY_ID.to_string()));
        assert!(dir.path().join("keyrings/craft-FC42E99D.gpg").is_file());
    }

    #[tokio::test]
    async fn ppa_key_without_launchpad() {
        let dir = TempDir::new().unwrap();
        let gpg = Arc::new(RecordingGpg::new());
        let keys = AptKeyManager::new(dir.path().join("keyrings"), None, gpg.clone());
        let repo = PpaRepository::new("snappy-dev/snapcraft-daily").unwrap().into();

        let err = keys.install_package_repository_key(&repo).await.unwrap_err();

        assert!(
            matches!(err, KeyError::NoLaunchpad { ppa } if ppa == "snappy-dev/snapcraft-daily")
        );
        assert!(gpg.calls().is_empty());
    }
}
