//! Tenants panel: list, suspend (confirmed) and activate

use std::sync::Arc;

use dbadmin_common::{TenantRecord, TenantStatus};

use crate::api::Transport;
use crate::confirm::ConfirmationGate;
use crate::mutation::{Action, ActionKind};
use crate::output::{format_date, format_count, render_summary};
use crate::query::{QueryKey, Resource};
use crate::table::{format_plain, Cell, CellValue, ColumnSpec, TableView};

use super::{PanelCore, PanelOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantSummary {
    pub total: usize,
    pub active: usize,
    pub suspended: usize,
    pub total_users: u64,
}

impl TenantSummary {
    pub fn from_rows(rows: &[TenantRecord]) -> Self {
        Self {
            total: rows.len(),
            active: rows.iter().filter(|t| t.status == TenantStatus::Active).count(),
            suspended: rows.iter().filter(|t| t.status == TenantStatus::Suspended).count(),
            total_users: rows.iter().map(|t| t.user_count).sum(),
        }
    }
}

fn format_date_cell(value: &CellValue) -> Cell {
    match value {
        CellValue::Text(raw) => Cell::Text(format_date(raw)),
        other => format_plain(other),
    }
}

fn columns() -> Vec<ColumnSpec<TenantRecord>> {
    vec![
        ColumnSpec::new("id", "ID", |t: &TenantRecord| CellValue::text(&t.id)),
        ColumnSpec::new("name", "Tenant Name", |t: &TenantRecord| CellValue::text(&t.name)),
        ColumnSpec::new("slug", "Slug", |t: &TenantRecord| CellValue::text(&t.slug)),
        ColumnSpec::new("status", "Status", |t: &TenantRecord| CellValue::text(t.status.as_str())),
        ColumnSpec::new("user_count", "Users", |t: &TenantRecord| CellValue::from(t.user_count)),
        ColumnSpec::new("database_size", "DB Size", |t: &TenantRecord| CellValue::text(&t.database_size)),
        ColumnSpec::new("last_active", "Last Active", |t: &TenantRecord| {
            CellValue::from_option(t.last_active.clone())
        })
        .format(format_date_cell),
        ColumnSpec::new("created_at", "Created", |t: &TenantRecord| CellValue::text(&t.created_at))
            .format(format_date_cell),
    ]
}

pub struct TenantsPanel {
    pub core: PanelCore,
    pub gate: ConfirmationGate<Action>,
    pub table: TableView<TenantRecord>,
}

impl TenantsPanel {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        Self {
            core: PanelCore::new(transport, options),
            gate: ConfirmationGate::new(),
            table: TableView::new(columns())
                .with_page_size(options.page_size)
                .with_empty_message("No tenants found"),
        }
    }

    pub fn key() -> QueryKey {
        QueryKey::new(Resource::Tenants)
    }

    pub async fn refresh(&mut self) -> bool {
        match self.core.load::<Vec<TenantRecord>>(&Self::key(), "tenants").await {
            Some(rows) => {
                self.table.set_rows(rows);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[TenantRecord] {
        self.table.rows()
    }

    pub fn tenant(&self, id: &str) -> Option<&TenantRecord> {
        self.table.rows().iter().find(|t| t.id == id)
    }

    pub fn summary(&self) -> TenantSummary {
        TenantSummary::from_rows(self.table.rows())
    }

    /// Open the gate to suspend a tenant. Only active tenants can be
    /// suspended; tenants not loaded yet are let through to the server.
    pub fn request_suspend(&mut self, id: &str) -> bool {
        if let Some(tenant) = self.tenant(id) {
            if tenant.status != TenantStatus::Active {
                let message = format!("Tenant '{}' is {}, not active", tenant.name, tenant.status);
                self.core.notifications.info(message);
                return false;
            }
        }
        self.gate.request(Action::SuspendTenant { id: id.to_string() });
        true
    }

    pub fn cancel(&mut self) {
        self.gate.cancel();
    }

    pub async fn confirm(&mut self) -> bool {
        let Some(action) = self.gate.confirm() else {
            return false;
        };
        let done = self
            .core
            .mutate_confirmed(action, "Tenant suspended successfully")
            .await
            .is_some();
        if done {
            self.refresh().await;
        }
        done
    }

    pub fn is_activating(&self) -> bool {
        self.core.is_pending(ActionKind::ActivateTenant)
    }

    pub async fn activate(&mut self, id: &str) -> bool {
        let action = Action::ActivateTenant { id: id.to_string() };
        let done = self
            .core
            .mutate(action, "Tenant activated successfully")
            .await
            .is_some();
        if done {
            self.refresh().await;
        }
        done
    }

    pub fn render(&self) -> String {
        let s = self.summary();
        let summary = render_summary(&[
            ("Total Tenants", s.total.to_string()),
            ("Active", s.active.to_string()),
            ("Suspended", s.suspended.to_string()),
            ("Total Users", format_count(s.total_users)),
        ]);
        format!("Tenant Management\n\n{}\n\n{}", summary, self.table.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use serde_json::json;

    fn panel(backend: &FakeBackend) -> TenantsPanel {
        TenantsPanel::new(backend.transport(), &PanelOptions::default())
    }

    #[tokio::test]
    async fn test_total_users_is_sum_of_user_counts() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        let summary = panel.summary();
        assert_eq!(summary.active, 2);
        assert_eq!(summary.suspended, 1);
        assert_eq!(summary.total_users, 15);
        assert!(panel.render().contains("Total Users    15"));
    }

    #[tokio::test]
    async fn test_suspend_requires_confirmation() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        assert!(panel.request_suspend("t1"));
        assert!(panel.confirm().await);
        assert_eq!(panel.tenant("t1").unwrap().status, TenantStatus::Suspended);
        assert_eq!(panel.summary().suspended, 2);
    }

    #[tokio::test]
    async fn test_suspend_refused_for_inactive_tenant() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        assert!(!panel.request_suspend("t3"));
        assert!(!panel.gate.is_open());
        assert!(panel.core.notifications.latest().unwrap().message.contains("suspended"));
    }

    #[tokio::test]
    async fn test_activate_dispatches_directly() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        assert!(panel.activate("t3").await);
        assert_eq!(panel.tenant("t3").unwrap().status, TenantStatus::Active);
        assert_eq!(backend.request_count("/tenants/t3/activate"), 1);
    }

    #[tokio::test]
    async fn test_unknown_status_renders_as_unknown() {
        let backend = FakeBackend::new();
        backend.set_tenants(vec![json!({
            "id": "t9", "name": "Odd", "slug": "odd", "status": "archived",
            "user_count": 1, "database_size": "1 MB",
            "created_at": "2024-01-01T00:00:00Z", "last_active": null
        })]);
        let mut panel = panel(&backend);

        assert!(panel.refresh().await);
        let out = panel.render();
        assert!(out.contains("unknown"));
        assert!(out.contains("NULL"));
    }

    #[tokio::test]
    async fn test_empty_list_renders_empty_state() {
        let backend = FakeBackend::new();
        backend.set_tenants(vec![]);
        let mut panel = panel(&backend);

        assert!(panel.refresh().await);
        assert!(panel.render().contains("No tenants found"));
        assert!(!panel.core.notifications.has_errors());
    }
}
