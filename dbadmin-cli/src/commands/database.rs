use anyhow::Result;
use clap::Subcommand;

use super::{finish, spinner, Context};
use crate::output::print_view;
use crate::panels::DatabasePanel;

#[derive(Subcommand, Debug, Clone)]
pub enum DatabaseCommands {
    /// List database tables
    Tables {
        /// Case-insensitive table name filter
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Show the rows of a table
    Show {
        name: String,
        /// Page to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Sort by column
        #[arg(long)]
        sort: Option<String>,
    },
}

pub async fn handle_database_command(command: DatabaseCommands, ctx: &Context) -> Result<()> {
    let mut panel = DatabasePanel::new(ctx.transport.clone(), &ctx.options);

    match command {
        DatabaseCommands::Tables { search } => {
            let loading = spinner("Loading tables...");
            let loaded = panel.refresh().await;
            loading.finish_and_clear();
            if loaded {
                panel.set_search(search);
                print_view(&panel.render(), panel.catalog.rows(), ctx.format)?;
            }
        }
        DatabaseCommands::Show { name, page, sort } => {
            let loading = spinner(format!("Loading table {}...", name));
            let loaded = panel.open_table(&name).await;
            loading.finish_and_clear();
            if loaded {
                if let Some(column) = sort {
                    if !panel.rows.toggle_sort(&column) {
                        anyhow::bail!("Table {} has no column '{}'", name, column);
                    }
                }
                panel.rows.set_page(page.saturating_sub(1));
                let visible = panel.rows.visible_rows();
                print_view(&panel.render(), &visible, ctx.format)?;
            }
        }
    }

    finish(&mut panel.core)
}
