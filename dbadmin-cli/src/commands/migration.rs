use anyhow::Result;
use clap::Subcommand;

use super::{finish, spinner, Context};
use crate::output::{self, print_view};
use crate::panels::MigrationsPanel;

#[derive(Subcommand, Debug, Clone)]
pub enum MigrationCommands {
    /// Show migration status
    List,
    /// Apply all pending migrations
    Apply,
    /// Roll back the last applied migration
    Rollback,
}

pub async fn handle_migration_command(command: MigrationCommands, ctx: &Context) -> Result<()> {
    let mut panel = MigrationsPanel::new(ctx.transport.clone(), &ctx.options);

    let loading = spinner("Loading migrations...");
    let loaded = panel.refresh().await;
    loading.finish_and_clear();

    let requested = match command {
        MigrationCommands::List => {
            if loaded {
                print_view(&panel.render(), panel.rows(), ctx.format)?;
            }
            false
        }
        MigrationCommands::Apply => loaded && panel.request_apply(),
        MigrationCommands::Rollback => loaded && panel.request_rollback(),
    };

    if let Some(prompt) = panel.confirmation_message().filter(|_| requested) {
        if ctx.confirmer.confirm(&prompt)? {
            let running = spinner("Running migrations...");
            panel.confirm().await;
            running.finish_and_clear();
        } else {
            panel.cancel();
            output::print_info("Cancelled");
        }
    }

    finish(&mut panel.core)
}
