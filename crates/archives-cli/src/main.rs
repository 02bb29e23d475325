//! craft-archives - package repository tooling

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use archives_cli::cmd;
use archives_cli::{Cli, Commands, KeyCommands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Check { file } => cmd::check::check(&file)?,
        Commands::Show { file } => cmd::show::show(&file)?,
        Commands::Install {
            file,
            root,
            key_assets,
            launchpad_api,
            refresh,
        } => {
            let options = cmd::install::InstallOptions {
                key_assets,
                launchpad_api,
                refresh,
            };
            cmd::install::install(&file, &root, options, dry_run).await?;
        }
        Commands::Packages { packages } => cmd::packages::packages(&packages, dry_run)?,
        Commands::Key { command } => match command {
            KeyCommands::Fingerprints { file, root, gpg } => {
                cmd::key::fingerprints(&file, &root, gpg)?;
            }
            KeyCommands::Installed {
                key_id,
                root,
                keyring_dir,
                gpg,
            } => {
                if !cmd::key::installed(&key_id, &root, keyring_dir, gpg)? {
                    return Ok(ExitCode::from(1));
                }
            }
        },
        Commands::OldReleases {
            root,
            deb822_name,
            url,
        } => cmd::old_releases::old_releases(&root, &deb822_name, &url, dry_run).await?,
    }

    Ok(ExitCode::SUCCESS)
}
