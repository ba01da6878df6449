use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use dbadmin_common::AuditStatus;

use super::{finish, spinner, Context};
use crate::output::print_view;
use crate::panels::{AuditFilters, AuditLogsPanel};

#[derive(Subcommand, Debug, Clone)]
pub enum AuditCommands {
    /// List audit log entries
    List {
        /// Match user email, action or resource type
        #[arg(short, long, default_value = "")]
        search: String,
        /// Filter by status (success, failure, warning)
        #[arg(long)]
        status: Option<AuditStatus>,
        /// Filter by action
        #[arg(short, long)]
        action: Option<String>,
        /// Page to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show audit statistics
    Stats,
    /// Export audit logs as CSV
    Export {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long)]
        status: Option<AuditStatus>,
        #[arg(short, long)]
        action: Option<String>,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

pub async fn handle_audit_command(command: AuditCommands, ctx: &Context) -> Result<()> {
    let mut panel = AuditLogsPanel::new(ctx.transport.clone(), &ctx.options);

    match command {
        AuditCommands::List {
            search,
            status,
            action,
            page,
        } => {
            panel.set_filters(AuditFilters {
                search,
                status,
                action,
            });
            let loading = spinner("Loading audit logs...");
            let loaded = panel.refresh().await;
            loading.finish_and_clear();
            if loaded {
                panel.table.set_page(page.saturating_sub(1));
                let visible = panel.table.visible_rows();
                print_view(&panel.render(), &visible, ctx.format)?;
            }
        }
        AuditCommands::Stats => {
            let loading = spinner("Loading audit stats...");
            panel.refresh_stats().await;
            loading.finish_and_clear();
            if let Some(stats) = panel.stats() {
                let rendered = crate::output::render_summary(&[
                    ("Total Events", stats.total_events.to_string()),
                    ("Success Rate", format!("{:.1}%", stats.success_rate)),
                    ("Failed Events", stats.failed_events.to_string()),
                ]);
                print_view(&rendered, stats, ctx.format)?;
            }
        }
        AuditCommands::Export {
            search,
            status,
            action,
            dir,
        } => {
            panel.set_filters(AuditFilters {
                search,
                status,
                action,
            });
            let exporting = spinner("Exporting audit logs...");
            panel.export(&dir, Utc::now()).await;
            exporting.finish_and_clear();
        }
    }

    finish(&mut panel.core)
}
