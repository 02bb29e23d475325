//! Invocation of the host package manager.

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

/// `apt-get` failed.
#[derive(Error, Debug)]
pub enum AptError {
    /// No `apt-get` on `PATH`.
    #[error("apt-get executable not found: {0}")]
    NotFound(#[from] which::Error),

    /// The process could not be started.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The command ran and failed.
    #[error("'{command}' failed with exit code {}", code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Failed {
        /// The command line that was run.
        command: String,
        /// Exit code, absent if killed by a signal.
        code: Option<i32>,
    },
}

/// The operations the installer needs from a package manager.
pub trait PackageManager: Send + Sync + std::fmt::Debug {
    /// Refresh the package index.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails.
    fn refresh(&self) -> Result<(), AptError>;

    /// Install `packages` without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if installation fails.
    fn install(&self, packages: &[String]) -> Result<(), AptError>;
}

/// `apt-get`, run non-interactively.
#[derive(Debug, Clone, Default)]
pub struct AptGet {
    program: Option<PathBuf>,
}

impl AptGet {
    /// Search `PATH` for `apt-get`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the binary at `program` instead of searching `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    /// The arguments for installing `packages`.
    pub fn install_args(packages: &[String]) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            "--yes".to_string(),
            "--no-install-recommends".to_string(),
        ];
        args.extend(packages.iter().cloned());
        args
    }

    fn run(&self, args: &[String]) -> Result<(), AptError> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => which::which("apt-get")?,
        };
        let command = format!("{} {}", program.display(), args.join(" "));
        tracing::debug!("Executing command: {command}");

        let status = Command::new(&program)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(AptError::Failed {
                command,
                code: status.code(),
            })
        }
    }
}

impl PackageManager for AptGet {
    fn refresh(&self) -> Result<(), AptError> {
        self.run(&["update".to_string()])
    }

    fn install(&self, packages: &[String]) -> Result<(), AptError> {
        if packages.is_empty() {
            return Ok(());
        }
        self.run(&Self::install_args(packages))
    }
}
