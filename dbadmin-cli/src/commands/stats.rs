use anyhow::Result;

use super::{finish, spinner, Context};
use crate::output::print_view;
use crate::panels::DashboardPanel;

pub async fn handle_stats_command(ctx: &Context) -> Result<()> {
    let mut panel = DashboardPanel::new(ctx.transport.clone(), &ctx.options);

    let loading = spinner("Loading system stats...");
    panel.refresh().await;
    loading.finish_and_clear();

    if let Some(stats) = panel.stats() {
        print_view(&panel.render(), stats, ctx.format)?;
    }

    finish(&mut panel.core)
}
