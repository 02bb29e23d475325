//! Key commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use archives_core::gpg::SystemGpg;
use archives_core::keys::AptKeyManager;
use archives_core::paths;

fn key_manager(keyring_dir: PathBuf, gpg: Option<PathBuf>) -> AptKeyManager {
    let gpg = gpg.map_or_else(SystemGpg::new, SystemGpg::with_program);
    AptKeyManager::new(keyring_dir, None, Arc::new(gpg))
}

/// Print the fingerprint of every key in `file`.
pub fn fingerprints(file: &Path, root: &Path, gpg: Option<PathBuf>) -> Result<()> {
    let key = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let fingerprints = key_manager(paths::keyrings_dir(root), gpg)
        .get_key_fingerprints(&key)
        .context("Failed to read key fingerprints")?;

    if fingerprints.is_empty() {
        bail!("No keys found in {}", file.display());
    }
    for fingerprint in fingerprints {
        println!("{fingerprint}");
    }
    Ok(())
}

/// Whether `key_id` is installed in its keyring.
pub fn installed(
    key_id: &str,
    root: &Path,
    keyring_dir: Option<PathBuf>,
    gpg: Option<PathBuf>,
) -> Result<bool> {
    let keyring_dir = keyring_dir.unwrap_or_else(|| paths::keyrings_dir(root));
    let installed = key_manager(keyring_dir.clone(), gpg).is_key_installed(key_id, &keyring_dir);

    if installed {
        println!("Key {key_id} is installed");
    } else {
        println!(
            "Key {key_id} is not installed in {}",
            keyring_dir.display()
        );
    }
    Ok(installed)
}
