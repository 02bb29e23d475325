//! Well-known APT locations, relative to a target root.
//!
//! Every function takes the root explicitly so that a chroot can be
//! prepared from the outside.

use std::path::{Path, PathBuf};

/// Environment variable overriding the target root.
pub const ROOT_ENV: &str = "CRAFT_ARCHIVES_ROOT";

/// Environment variable naming the directory of bundled `.asc` key assets.
pub const KEY_ASSETS_ENV: &str = "CRAFT_ARCHIVES_KEY_ASSETS";

/// Name of the deb822 file holding the default Ubuntu sources.
pub const DEFAULT_DEB822_NAME: &str = "ubuntu.sources";

/// Keyrings for third-party archives: `<root>/etc/apt/keyrings`.
pub fn keyrings_dir(root: &Path) -> PathBuf {
    root.join("etc/apt/keyrings")
}

/// Drop-in sources directory: `<root>/etc/apt/sources.list.d`.
pub fn sources_list_d(root: &Path) -> PathBuf {
    root.join("etc/apt/sources.list.d")
}

/// One-line format default sources: `<root>/etc/apt/sources.list`.
pub fn sources_list(root: &Path) -> PathBuf {
    root.join("etc/apt/sources.list")
}

/// deb822 format default sources, e.g. `<root>/etc/apt/sources.list.d/ubuntu.sources`.
pub fn deb822_default_sources(root: &Path, name: &str) -> PathBuf {
    sources_list_d(root).join(name)
}

/// The pin preferences managed by craft-archives.
pub fn preferences_file(root: &Path) -> PathBuf {
    root.join("etc/apt/preferences.d/craft-archives")
}

/// `<root>/etc/os-release`.
pub fn os_release(root: &Path) -> PathBuf {
    root.join("etc/os-release")
}

/// File name of the generated sources for a repository called `name`.
pub fn sources_file_name(name: &str) -> String {
    format!("craft-{name}.sources")
}

/// The last eight characters of a key ID, upper-cased.
pub fn short_key_id(key_id: &str) -> String {
    let start = key_id.len().saturating_sub(8);
    key_id.get(start..).unwrap_or(key_id).to_ascii_uppercase()
}

/// File name of the keyring holding `key_id`: `craft-<SHORTID>.gpg`.
pub fn keyring_file_name(key_id: &str) -> String {
    format!("craft-{}.gpg", short_key_id(key_id))
}

/// Full path of the keyring holding `key_id` inside `keyrings_dir`.
pub fn keyring_path(keyrings_dir: &Path, key_id: &str) -> PathBuf {
    keyrings_dir.join(keyring_file_name(key_id))
}

/// File name of a bundled key asset: `<SHORTID>.asc`.
pub fn asset_file_name(key_id: &str) -> String {
    format!("{}.asc", short_key_id(key_id))
}

/// `path` as seen from inside `root`.
///
/// Files written under a chroot must reference each other by their
/// in-chroot path. Paths outside `root` are returned unchanged.
pub fn in_root(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(relative) => Path::new("/").join(relative),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "78E1918602959B9C59103100F1831DDAFC42E99D";

    #[test]
    fn key_file_names() {
        assert_eq!(short_key_id(KEY), "FC42E99D");
        assert_eq!(short_key_id("fc42e99d"), "FC42E99D");
        assert_eq!(short_key_id("ABC"), "ABC");
        assert_eq!(keyring_file_name(KEY), "craft-FC42E99D.gpg");
        assert_eq!(asset_file_name(KEY), "FC42E99D.asc");
    }

    #[test]
    fn layout_under_root() {
        let root = Path::new("/tmp/chroot");
        assert_eq!(
            keyring_path(&keyrings_dir(root), KEY),
            Path::new("/tmp/chroot/etc/apt/keyrings/craft-FC42E99D.gpg")
        );
        assert_eq!(
            deb822_default_sources(root, DEFAULT_DEB822_NAME),
            Path::new("/tmp/chroot/etc/apt/sources.list.d/ubuntu.sources")
        );
        assert_eq!(
            preferences_file(root),
            Path::new("/tmp/chroot/etc/apt/preferences.d/craft-archives")
        );
        assert_eq!(sources_file_name("ppa-a_b"), "craft-ppa-a_b.sources");
    }

    #[test]
    fn in_root_strips_prefix() {
        let root = Path::new("/tmp/chroot");
        assert_eq!(
            in_root(root, Path::new("/tmp/chroot/etc/apt/keyrings/k.gpg")),
            Path::new("/etc/apt/keyrings/k.gpg")
        );
        assert_eq!(
            in_root(Path::new("/"), Path::new("/etc/apt/keyrings/k.gpg")),
            Path::new("/etc/apt/keyrings/k.gpg")
        );
        assert_eq!(
            in_root(root, Path::new("/elsewhere/k.gpg")),
            Path::new("/elsewhere/k.gpg")
        );
    }
}
