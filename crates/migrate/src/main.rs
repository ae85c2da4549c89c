//! `firebase-migrate`: copy a Firebase project's Firestore collections,
//! Storage objects and Auth users into another project, clean up the source
//! afterwards, and check that the target is ready.
//!
//! ```bash
//! firebase-migrate migrate            # Firestore, then Storage, then Auth
//! firebase-migrate migrate auth       # one phase only
//! firebase-migrate wait-ready         # poll the target until both services answer
//! firebase-migrate inspect target     # counts per collection, prefix and users
//! firebase-migrate cleanup firestore  # asks for YES before deleting anything
//! RUST_LOG=debug firebase-migrate --config staging.toml migrate
//! ```

mod progress;
mod prompt;

use std::{path::PathBuf, process::ExitCode, str::FromStr};

use anyhow::{Context, Result};
use backend::{Project, firebase};
use clap::{CommandFactory, Parser, Subcommand};
use services::services::{
    cleanup::{CleanupOutcome, CleanupPhase, SourceCleanup},
    config::{MigrationConfig, ProjectRole},
    inspector::ProjectInspector,
    migration::{MigrationPhase, MigrationRunner},
    readiness::ReadinessPoller,
};
use tracing::{error, info};

use crate::{progress::with_spinner, prompt::TerminalConfirmation};

#[derive(Parser, Debug)]
#[command(name = "firebase-migrate", version, about = "Migrate data between Firebase projects")]
struct Cli {
    /// Migration config file
    #[arg(
        long,
        global = true,
        env = "FIREBASE_MIGRATE_CONFIG",
        default_value = "migration.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy data from the source project to the target project
    Migrate {
        /// full, firestore, storage or auth
        phase: Option<String>,
    },
    /// Delete migrated data from the source project
    Cleanup {
        /// full, firestore or auth
        phase: Option<String>,
    },
    /// Poll the target project until Firestore and Auth both respond
    WaitReady,
    /// Count documents, objects and users in one project
    Inspect {
        /// source or target
        project: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    utils::logging::init(progress::LogWriter);
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Parse an optional positional argument, falling back to the default.
/// An unknown value prints the subcommand's usage and yields `None`.
fn parse_arg<T: FromStr + Default>(value: Option<&str>, subcommand: &str) -> Result<Option<T>> {
    let Some(value) = value else {
        return Ok(Some(T::default()));
    };
    match value.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => {
            eprintln!("Unknown argument '{}'\n", value);
            if let Some(command) = Cli::command().find_subcommand_mut(subcommand) {
                command.print_help().context("cannot print usage")?;
            }
            Ok(None)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Migrate { phase } => {
            let Some(phase) = parse_arg::<MigrationPhase>(phase.as_deref(), "migrate")? else {
                return Ok(());
            };
            let config = load_config(&cli.config)?;
            let source = connect(&config, ProjectRole::Source).await?;
            let target = connect(&config, ProjectRole::Target).await?;

            let runner = MigrationRunner::new(&source, &target, &config);
            let report =
                with_spinner(&format!("Migrating ({})", phase), runner.run(phase)).await;
            println!("{}", report);
        }
        Command::Cleanup { phase } => {
            let Some(phase) = parse_arg::<CleanupPhase>(phase.as_deref(), "cleanup")? else {
                return Ok(());
            };
            let config = load_config(&cli.config)?;
            let source = connect(&config, ProjectRole::Source).await?;

            let cleanup = SourceCleanup::new(&source, &config);
            println!(
                "Cleanup does not check that the target holds a complete copy. \
                 Run `firebase-migrate inspect target` first."
            );
            match cleanup.run(phase, &TerminalConfirmation).await? {
                CleanupOutcome::Aborted => println!("Cleanup cancelled, nothing was deleted."),
                CleanupOutcome::Completed(report) => {
                    for collection in &report.collections {
                        println!("{}", collection);
                    }
                    if let Some(auth) = &report.auth {
                        println!("{}", auth);
                    }
                }
            }
        }
        Command::WaitReady => {
            let config = load_config(&cli.config)?;
            let target = connect(&config, ProjectRole::Target).await?;

            let poller =
                ReadinessPoller::new(&target, config.probe_collection(), &config.readiness);
            let report = poller.wait_until_ready().await;
            println!("{}", report);
        }
        Command::Inspect { project } => {
            let Some(role) = parse_arg::<ProjectRole>(project.as_deref(), "inspect")? else {
                return Ok(());
            };
            let config = load_config(&cli.config)?;
            let handle = connect(&config, role).await?;

            let inspector = ProjectInspector::new(
                &handle,
                &config.collections,
                &config.storage_prefixes,
                config.auth_page_size(),
            );
            let report =
                with_spinner(&format!("Inspecting {} project", role), inspector.inspect()).await;
            println!("{}", report);
        }
    }
    Ok(())
}

fn load_config(path: &std::path::Path) -> Result<MigrationConfig> {
    let config = MigrationConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    info!(
        source = %config.source.project_id,
        target = %config.target.project_id,
        collections = config.collections.len(),
        prefixes = config.storage_prefixes.len(),
        "Loaded migration config"
    );
    Ok(config)
}

/// Only the target needs password hash parameters, since users are created there
async fn connect(config: &MigrationConfig, role: ProjectRole) -> Result<Project> {
    let password_hash = match role {
        ProjectRole::Source => None,
        ProjectRole::Target => config.password_hash.clone(),
    };
    firebase::connect(config.project(role), password_hash)
        .await
        .with_context(|| format!("failed to connect to {} project", role))
}
