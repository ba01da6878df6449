use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use dbadmin_common::BackupType;

use super::{finish, spinner, Context};
use crate::output::{self, print_view};
use crate::panels::BackupsPanel;

#[derive(Subcommand, Debug, Clone)]
pub enum BackupCommands {
    /// List backups
    List,
    /// Start a new backup
    Create {
        /// Backup type (full, incremental, differential)
        #[arg(short = 't', long = "type", default_value = "full")]
        kind: BackupType,
        /// Compress the backup file
        #[arg(short, long)]
        compressed: bool,
    },
    /// Delete a backup
    Delete { id: String },
    /// Download a backup file
    Download {
        id: String,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

pub async fn handle_backup_command(command: BackupCommands, ctx: &Context) -> Result<()> {
    let mut panel = BackupsPanel::new(ctx.transport.clone(), &ctx.options);

    match command {
        BackupCommands::List => {
            let spinner = spinner("Loading backups...");
            let loaded = panel.refresh().await;
            spinner.finish_and_clear();
            if loaded {
                print_view(&panel.render(), panel.rows(), ctx.format)?;
            }
        }
        BackupCommands::Create { kind, compressed } => {
            let spinner = spinner(format!("Starting {} backup...", kind));
            panel.create(kind, compressed).await;
            spinner.finish_and_clear();
        }
        BackupCommands::Delete { id } => {
            panel.prefetch().await;
            let name = panel
                .rows()
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.filename.clone())
                .unwrap_or_else(|| id.clone());

            panel.request_delete(&id);
            let prompt = format!("Delete backup '{}'? This cannot be undone", name);
            if ctx.confirmer.confirm(&prompt)? {
                panel.confirm().await;
            } else {
                panel.cancel();
                output::print_info("Deletion cancelled");
            }
        }
        BackupCommands::Download { id, dir } => {
            panel.prefetch().await;
            let spinner = spinner(format!("Downloading backup {}...", id));
            panel.download(&id, &dir).await;
            spinner.finish_and_clear();
        }
    }

    finish(&mut panel.core)
}
