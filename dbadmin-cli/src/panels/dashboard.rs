//! Overview of system-wide counters and health

use std::sync::Arc;

use colored::Colorize;
use dbadmin_common::{SystemHealth, SystemStats};

use crate::api::Transport;
use crate::output::{format_count, format_timestamp, render_summary};
use crate::query::{QueryKey, Resource};

use super::{PanelCore, PanelOptions};

pub struct DashboardPanel {
    pub core: PanelCore,
    stats: Option<SystemStats>,
}

impl DashboardPanel {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        Self {
            core: PanelCore::new(transport, options),
            stats: None,
        }
    }

    pub fn key() -> QueryKey {
        QueryKey::new(Resource::SystemStats)
    }

    pub async fn refresh(&mut self) -> bool {
        match self.core.load::<SystemStats>(&Self::key(), "system stats").await {
            Some(stats) => {
                self.stats = Some(stats);
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> Option<&SystemStats> {
        self.stats.as_ref()
    }

    pub fn health(&self) -> SystemHealth {
        self.stats.as_ref().map(|s| s.system_health).unwrap_or_default()
    }

    fn health_label(health: SystemHealth) -> String {
        match health {
            SystemHealth::Healthy => "healthy".green().to_string(),
            SystemHealth::Warning => "warning".yellow().to_string(),
            SystemHealth::Critical => "critical".red().bold().to_string(),
            SystemHealth::Unknown => "unknown".dimmed().to_string(),
        }
    }

    pub fn render(&self) -> String {
        let Some(s) = &self.stats else {
            return "System Overview\n\nNo data".to_string();
        };

        let kpis = render_summary(&[
            ("Database Size", s.database_size.clone()),
            ("Tables", format_count(s.table_count)),
            ("Active Connections", format_count(s.active_connections)),
            ("Backups", format_count(s.backup_count)),
            ("Tenants", format_count(s.tenant_count)),
            ("Audit Events", format_count(s.audit_log_count)),
            ("Migrations", s.migration_status.clone()),
            (
                "Last Backup",
                s.last_backup
                    .as_deref()
                    .map(format_timestamp)
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]);

        format!(
            "System Overview\n\n{}\n\nSystem Health: {}",
            kpis,
            Self::health_label(s.system_health)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[tokio::test]
    async fn test_refresh_reads_kpis_and_health() {
        colored::control::set_override(false);
        let backend = FakeBackend::new();
        let mut panel = DashboardPanel::new(backend.transport(), &PanelOptions::default());

        assert_eq!(panel.health(), SystemHealth::Unknown);
        assert!(panel.refresh().await);

        assert_eq!(panel.health(), SystemHealth::Warning);
        assert_eq!(panel.stats().unwrap().table_count, 42);
        let out = panel.render();
        assert!(out.contains("Active Connections  7"));
        assert!(out.contains("System Health: warning"));
    }

    #[tokio::test]
    async fn test_failure_keeps_no_data_view() {
        let backend = FakeBackend::new();
        let mut panel = DashboardPanel::new(backend.transport(), &PanelOptions::default());

        backend.fail_next(503);
        assert!(!panel.refresh().await);
        assert!(panel.render().contains("No data"));
        assert!(panel.core.notifications.has_errors());
    }
}
