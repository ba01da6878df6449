//! Migrations panel: status list, apply pending, rollback last

use std::sync::Arc;

use dbadmin_common::{MigrationRecord, MigrationStatus};

use crate::api::Transport;
use crate::confirm::ConfirmationGate;
use crate::mutation::{Action, ActionKind};
use crate::output::{format_timestamp, render_summary};
use crate::query::{QueryKey, Resource};
use crate::table::{format_plain, Cell, CellValue, ColumnSpec, SortDirection, TableView};

use super::{PanelCore, PanelOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationCounts {
    pub pending: usize,
    pub applied: usize,
    pub failed: usize,
}

impl MigrationCounts {
    pub fn from_rows(rows: &[MigrationRecord]) -> Self {
        let count = |status| rows.iter().filter(|m| m.status == status).count();
        Self {
            pending: count(MigrationStatus::Pending),
            applied: count(MigrationStatus::Applied),
            failed: count(MigrationStatus::Failed),
        }
    }
}

/// Versions are shown zero-padded to six digits
pub fn format_version(value: &CellValue) -> Cell {
    match value {
        CellValue::Int(v) => Cell::Text(format!("{:06}", v)),
        other => format_plain(other),
    }
}

pub fn format_applied_at(value: &CellValue) -> Cell {
    match value {
        CellValue::Null | CellValue::Missing => Cell::Placeholder("Not applied"),
        CellValue::Text(raw) => Cell::Text(format_timestamp(raw)),
        other => format_plain(other),
    }
}

pub fn format_execution_time(value: &CellValue) -> Cell {
    match value {
        CellValue::Null | CellValue::Missing => Cell::Placeholder("-"),
        other => format_plain(other),
    }
}

fn columns() -> Vec<ColumnSpec<MigrationRecord>> {
    vec![
        ColumnSpec::new("version", "Version", |m: &MigrationRecord| CellValue::from(m.version))
            .format(format_version),
        ColumnSpec::new("name", "Migration Name", |m: &MigrationRecord| CellValue::text(&m.name)),
        ColumnSpec::new("status", "Status", |m: &MigrationRecord| CellValue::text(m.status.as_str())),
        ColumnSpec::new("applied_at", "Applied At", |m: &MigrationRecord| {
            CellValue::from_option(m.applied_at.clone())
        })
        .format(format_applied_at),
        ColumnSpec::new("execution_time", "Execution Time", |m: &MigrationRecord| {
            CellValue::from_option(m.execution_time.clone())
        })
        .format(format_execution_time),
    ]
}

pub struct MigrationsPanel {
    pub core: PanelCore,
    pub gate: ConfirmationGate<Action>,
    pub table: TableView<MigrationRecord>,
}

impl MigrationsPanel {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        let mut table = TableView::new(columns())
            .with_page_size(options.page_size)
            .with_empty_message("No migrations found");
        table.sort_by("version", SortDirection::Ascending);

        Self {
            core: PanelCore::new(transport, options),
            gate: ConfirmationGate::new(),
            table,
        }
    }

    pub fn key() -> QueryKey {
        QueryKey::new(Resource::Migrations)
    }

    pub async fn refresh(&mut self) -> bool {
        match self.core.load::<Vec<MigrationRecord>>(&Self::key(), "migrations").await {
            Some(rows) => {
                self.table.set_rows(rows);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[MigrationRecord] {
        self.table.rows()
    }

    pub fn counts(&self) -> MigrationCounts {
        MigrationCounts::from_rows(self.table.rows())
    }

    /// Apply is offered only when something is pending and no apply is running
    pub fn can_apply(&self) -> bool {
        self.counts().pending > 0 && !self.core.is_pending(ActionKind::ApplyMigrations)
    }

    pub fn can_rollback(&self) -> bool {
        self.counts().applied > 0 && !self.core.is_pending(ActionKind::RollbackMigration)
    }

    /// Ask for confirmation before applying pending migrations
    pub fn request_apply(&mut self) -> bool {
        if !self.can_apply() {
            self.core.notifications.info("No pending migrations to apply");
            return false;
        }
        self.gate.request(Action::ApplyMigrations);
        true
    }

    /// Ask for confirmation before rolling back the last applied migration
    pub fn request_rollback(&mut self) -> bool {
        if !self.can_rollback() {
            self.core.notifications.info("No applied migrations to roll back");
            return false;
        }
        self.gate.request(Action::RollbackMigration);
        true
    }

    /// Prompt text for whatever the gate currently holds
    pub fn confirmation_message(&self) -> Option<String> {
        self.gate.pending().map(|action| match action {
            Action::ApplyMigrations => format!(
                "This will apply {} pending migration(s) to the database. Make sure you have a backup before proceeding.",
                self.counts().pending
            ),
            Action::RollbackMigration => "This will rollback the last applied migration. This action may result in data loss. Make sure you have a backup before proceeding.".to_string(),
            other => format!("{}?", other),
        })
    }

    pub fn cancel(&mut self) {
        self.gate.cancel();
    }

    pub async fn confirm(&mut self) -> bool {
        let Some(action) = self.gate.confirm() else {
            return false;
        };

        let result = if matches!(action.get(), Action::ApplyMigrations) {
            self.core
                .mutate(action.into_inner(), "Migrations applied successfully")
                .await
        } else {
            self.core
                .mutate_confirmed(action, "Migrations rolled back successfully")
                .await
        };

        let done = result.is_some();
        if done {
            self.refresh().await;
        }
        done
    }

    pub fn render(&self) -> String {
        let c = self.counts();
        let summary = render_summary(&[
            ("Pending", c.pending.to_string()),
            ("Applied", c.applied.to_string()),
            ("Failed", c.failed.to_string()),
        ]);
        format!("Database Migrations\n\n{}\n\n{}", summary, self.table.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn panel(backend: &FakeBackend) -> MigrationsPanel {
        MigrationsPanel::new(backend.transport(), &PanelOptions::default())
    }

    #[test]
    fn test_formatters() {
        assert_eq!(format_version(&CellValue::Int(42)), Cell::Text("000042".to_string()));
        assert_eq!(format_applied_at(&CellValue::Null), Cell::Placeholder("Not applied"));
        assert_eq!(
            format_applied_at(&CellValue::text("2024-01-01T00:00:00Z")),
            Cell::Text("2024-01-01 00:00:00".to_string())
        );
        assert_eq!(format_execution_time(&CellValue::Null), Cell::Placeholder("-"));
        assert_eq!(format_execution_time(&CellValue::text("12ms")), Cell::Text("12ms".to_string()));
    }

    #[tokio::test]
    async fn test_apply_moves_all_pending_to_applied() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        let before = panel.counts();
        assert_eq!(before.pending, 3);
        assert_eq!(before.applied, 2);

        assert!(panel.request_apply());
        assert!(panel.confirmation_message().unwrap().contains("apply 3 pending"));
        assert!(panel.confirm().await);

        let after = panel.counts();
        assert_eq!(after.pending, 0);
        assert_eq!(after.applied, before.applied + 3);
        assert!(!panel.can_apply());
    }

    #[tokio::test]
    async fn test_rollback_requires_confirmation_and_reverts_last() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        assert!(panel.request_rollback());
        panel.cancel();
        assert!(!panel.confirm().await);
        assert_eq!(backend.request_count("/migrations/rollback"), 0);

        assert!(panel.request_rollback());
        assert!(panel.confirm().await);

        let counts = panel.counts();
        assert_eq!(counts.applied, 1);
        assert_eq!(counts.pending, 4);
        let m2 = panel.rows().iter().find(|m| m.version == 2).unwrap();
        assert_eq!(m2.status, MigrationStatus::Pending);
        assert_eq!(m2.applied_at, None);
    }

    #[tokio::test]
    async fn test_apply_not_offered_without_pending() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);

        assert!(!panel.request_apply());
        assert!(!panel.gate.is_open());
    }

    #[tokio::test]
    async fn test_failed_apply_keeps_counts() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        panel.request_apply();
        backend.fail_next(500);
        assert!(!panel.confirm().await);

        assert_eq!(panel.counts().pending, 3);
        let latest = panel.core.notifications.latest().unwrap();
        assert!(latest.message.starts_with("Apply migrations failed"));
    }

    #[tokio::test]
    async fn test_render_orders_by_version_and_marks_unapplied() {
        let backend = FakeBackend::new();
        let mut panel = panel(&backend);
        panel.refresh().await;

        let out = panel.render();
        assert!(out.contains("000001"));
        assert!(out.contains("Not applied"));
        assert!(out.find("000001").unwrap() < out.find("000005").unwrap());
    }
}
