//! # XRay CLI (`xray`)
//!
//! Runs the record copy engine and the structure view against a JSON
//! workspace snapshot.
//!
//! ## Usage
//!
//! ```bash
//! xray --config ./config/xray.toml --workspace ./workspace.json <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `xray copy <record>` | Duplicate a record, write the snapshot back, print the new id |
//! | `xray structure <record>` | Render the structure panel as an HTML page |
//! | `xray backrefs <record>` | List records linking to a record |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use xray::{backrefs_cmd, config, copy_cmd, logging, structure};

/// XRay CLI: copy record trees with their links and backreferences,
/// and inspect record structure.
#[derive(Parser)]
#[command(
    name = "xray",
    about = "XRay: copy record trees and inspect record structure",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/xray.toml")]
    config: PathBuf,

    /// Workspace snapshot (JSON) to operate on.
    #[arg(long, global = true, default_value = "./workspace.json")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a record into a new record titled `<name><suffix>`.
    ///
    /// The copy carries the line tree (links rewritten, inline links
    /// flattened), properties, and a trailing backreference section.
    Copy {
        /// Source record identifier.
        record: String,

        /// Write the updated snapshot here instead of overwriting `--workspace`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render a record's structure view.
    Structure {
        /// Record identifier.
        record: String,

        /// Write the HTML page to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List records that link to a record.
    Backrefs {
        /// Record identifier.
        record: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging);

    match cli.command {
        Commands::Copy { record, out } => {
            copy_cmd::run_copy(&cfg, &cli.workspace, &record, out.as_deref()).await?;
        }
        Commands::Structure { record, out } => {
            structure::run_structure(&cfg, &cli.workspace, &record, out.as_deref()).await?;
        }
        Commands::Backrefs { record } => {
            backrefs_cmd::run_backrefs(&cli.workspace, &record).await?;
        }
    }

    Ok(())
}
