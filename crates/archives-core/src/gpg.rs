//! Invocation of the host `gpg` tool.
//!
//! All OpenPGP work is delegated to `gpg`. The [`GpgRunner`] trait is the
//! seam between the key manager and the process so the key logic can be
//! exercised without a real keyring.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Options passed to every `gpg` call.
pub const GPG_PREFIX: &[&str] = &["--batch", "--no-default-keyring"];

/// Environment variable naming the `gpg` binary to run.
pub const GPG_ENV: &str = "CRAFT_ARCHIVES_GPG";

/// `gpg` exit code when a requested key is not in the keyring.
pub const KEY_NOT_FOUND_CODE: i32 = 2;

/// A `gpg` invocation failed.
#[derive(Error, Debug)]
pub enum GpgError {
    /// No `gpg` on `PATH`.
    #[error("gpg executable not found: {0}")]
    NotFound(#[from] which::Error),

    /// The process could not be started or fed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `gpg` ran and exited unsuccessfully.
    #[error("{output}")]
    Failed {
        /// Exit code, absent if killed by a signal.
        code: Option<i32>,
        /// Captured stderr followed by stdout.
        output: String,
    },
}

impl GpgError {
    /// Exit code of a failed `gpg` process.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Runs `gpg` with the given arguments and returns its standard output.
///
/// Implementations add [`GPG_PREFIX`] themselves; callers pass only the
/// operation-specific arguments.
pub trait GpgRunner: Send + Sync + std::fmt::Debug {
    /// Run `gpg`, feeding `stdin` to the process when given.
    ///
    /// # Errors
    ///
    /// Returns [`GpgError::Failed`] if `gpg` exits unsuccessfully.
    fn run(&self, args: &[OsString], stdin: Option<&[u8]>) -> Result<Vec<u8>, GpgError>;
}

/// The `gpg` found on `PATH` (or at an explicit location).
#[derive(Debug, Clone, Default)]
pub struct SystemGpg {
    program: Option<PathBuf>,
}

impl SystemGpg {
    /// Search `PATH` for `gpg` on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the `gpg` binary at `program` instead of searching `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

impl GpgRunner for SystemGpg {
    fn run(&self, args: &[OsString], stdin: Option<&[u8]>) -> Result<Vec<u8>, GpgError> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => which::which("gpg")?,
        };

        let mut cmd = Command::new(&program);
        // gpg output is parsed, so pin the locale and keep host settings out.
        cmd.env_clear()
            .env("LANG", "C.UTF-8")
            .args(GPG_PREFIX)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!("Executing command: {} {:?}", program.display(), args);
        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(GpgError::Failed {
                code: output.status.code(),
                output: text.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Arguments selecting `keyring` as the only keyring, in binary format.
pub fn keyring_args(keyring: &Path) -> Vec<OsString> {
    let mut ring = OsString::from("gnupg-ring:");
    ring.push(keyring);
    vec!["--keyring".into(), ring]
}

/// Build an argument list from mixed string and path parts.
pub fn args<I, S>(parts: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    parts.into_iter().map(|p| p.as_ref().to_os_string()).collect()
}

/// Fingerprints listed by `gpg --show-keys` or `--list-keys`.
///
/// Each primary key is printed as a `pub   ...` line followed by its
/// fingerprint on the next line.
pub fn parse_fingerprints(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.lines().collect();
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("pub   "))
        .filter_map(|(index, _)| lines.get(index + 1))
        .map(|line| line.trim().to_string())
        .collect()
}
