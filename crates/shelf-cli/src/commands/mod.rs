//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod init;
pub mod load;
pub mod project;
pub mod status;
pub mod sync;

use crate::config::ShelfConfig;
use crate::output;

/// Shelfsync - snapshot reconciliation and graph projection
#[derive(Parser)]
#[command(name = "shelf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "shelfsync.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter configuration file
    Init(init::InitArgs),

    /// Sync source rows into the local snapshots
    Sync(sync::SyncArgs),

    /// Mirror snapshots into the document collections
    Load,

    /// Project document collections into the graph
    Project(project::ProjectArgs),

    /// Full pipeline: sync, load, project
    Run(project::ProjectArgs),

    /// Show watermark, store, and graph counts
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if let Commands::Init(args) = &self.command {
            return init::execute(&self.config, args);
        }

        let config = ShelfConfig::load(&self.config)?;

        match self.command {
            Commands::Init(_) => unreachable!("handled above"),
            Commands::Sync(args) => {
                let report = sync::execute(&config, &args).await?;
                output::print_sync_report(&report);
            }
            Commands::Load => {
                let mirrored = load::execute(&config).await?;
                output::print_mirror_report(&mirrored);
            }
            Commands::Project(args) => {
                let summary = project::execute(&config, &args).await?;
                output::print_projection_summary(&summary);
            }
            Commands::Run(args) => {
                let report = sync::execute(&config, &sync::SyncArgs::default()).await?;
                output::print_sync_report(&report);

                let mirrored = load::execute(&config).await?;
                output::print_mirror_report(&mirrored);

                let summary = project::execute(&config, &args).await?;
                output::print_projection_summary(&summary);
            }
            Commands::Status => status::execute(&config).await?,
        }

        Ok(())
    }
}
