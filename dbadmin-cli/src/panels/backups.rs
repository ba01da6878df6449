//! Backups panel: list, create, delete (confirmed) and download

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dbadmin_common::{BackupRecord, BackupStatus, BackupType};

use crate::api::{segment, Transport};
use crate::confirm::ConfirmationGate;
use crate::download;
use crate::mutation::{Action, ActionKind};
use crate::output::{format_bytes, format_timestamp, render_summary};
use crate::query::{QueryKey, Resource};
use crate::table::{format_plain, Cell, CellValue, ColumnSpec, TableView};

use super::{PanelCore, PanelOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub total_size: u64,
}

impl BackupSummary {
    pub fn from_rows(rows: &[BackupRecord]) -> Self {
        let count = |status| rows.iter().filter(|b| b.status == status).count();
        Self {
            total: rows.len(),
            completed: count(BackupStatus::Completed),
            in_progress: count(BackupStatus::InProgress),
            failed: count(BackupStatus::Failed),
            total_size: rows.iter().map(|b| b.size).sum(),
        }
    }
}

fn columns() -> Vec<ColumnSpec<BackupRecord>> {
    vec![
        ColumnSpec::new("id", "ID", |b: &BackupRecord| CellValue::text(&b.id)),
        ColumnSpec::new("filename", "Filename", |b: &BackupRecord| CellValue::text(&b.filename)),
        ColumnSpec::new("type", "Type", |b: &BackupRecord| CellValue::text(b.kind.as_str())),
        ColumnSpec::new("status", "Status", |b: &BackupRecord| CellValue::text(b.status.as_str())),
        ColumnSpec::new("size", "Size", |b: &BackupRecord| CellValue::from(b.size)).format(|v| match v {
            CellValue::Int(n) => Cell::Text(format_bytes((*n).max(0) as u64)),
            other => format_plain(other),
        }),
        ColumnSpec::new("compressed", "Compressed", |b: &BackupRecord| CellValue::from(b.compressed)).format(|v| match v {
            CellValue::Bool(true) => Cell::Text("yes".to_string()),
            CellValue::Bool(false) => Cell::Text("no".to_string()),
            other => format_plain(other),
        }),
        ColumnSpec::new("created_at", "Created", |b: &BackupRecord| CellValue::text(&b.created_at)).format(|v| match v {
            CellValue::Text(raw) => Cell::Text(format_timestamp(raw)),
            other => format_plain(other),
        }),
    ]
}

pub struct BackupsPanel {
    pub core: PanelCore,
    pub gate: ConfirmationGate<Action>,
    pub table: TableView<BackupRecord>,
}

impl BackupsPanel {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        Self {
            core: PanelCore::new(transport, options),
            gate: ConfirmationGate::new(),
            table: TableView::new(columns())
                .with_page_size(options.page_size)
                .with_empty_message("No backups found"),
        }
    }

    pub fn key() -> QueryKey {
        QueryKey::new(Resource::Backups)
    }

    pub async fn refresh(&mut self) -> bool {
        match self.core.load::<Vec<BackupRecord>>(&Self::key(), "backups").await {
            Some(rows) => {
                self.table.set_rows(rows);
                true
            }
            None => false,
        }
    }

    /// Load the list for filename lookups only; a failure is a warning
    pub async fn prefetch(&mut self) -> bool {
        match self.core.load_extra::<Vec<BackupRecord>>(&Self::key(), "backups").await {
            Some(rows) => {
                self.table.set_rows(rows);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[BackupRecord] {
        self.table.rows()
    }

    pub fn summary(&self) -> BackupSummary {
        BackupSummary::from_rows(self.table.rows())
    }

    pub fn is_creating(&self) -> bool {
        self.core.is_pending(ActionKind::CreateBackup)
    }

    pub async fn create(&mut self, kind: BackupType, compressed: bool) -> bool {
        let action = Action::CreateBackup { kind, compressed };
        let done = self
            .core
            .mutate(action, "Backup started successfully")
            .await
            .is_some();
        if done {
            self.refresh().await;
        }
        done
    }

    /// Open the confirmation gate for deleting a backup
    pub fn request_delete(&mut self, id: &str) {
        self.gate.request(Action::DeleteBackup { id: id.to_string() });
    }

    pub fn cancel(&mut self) {
        self.gate.cancel();
    }

    /// Dispatch whatever the gate holds. Returns false when the gate was
    /// closed or the mutation failed.
    pub async fn confirm(&mut self) -> bool {
        let Some(action) = self.gate.confirm() else {
            return false;
        };
        let done = self
            .core
            .mutate_confirmed(action, "Backup deleted successfully")
            .await
            .is_some();
        if done {
            self.refresh().await;
        }
        done
    }

    /// Download a backup into `dir`. Returns the written path.
    pub async fn download(&mut self, id: &str, dir: &Path) -> Option<PathBuf> {
        let path = format!("/backups/{}/download", segment(id));
        let bytes = match self.core.cache().transport().get_bytes(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.core
                    .notifications
                    .error(format!("Failed to download backup {}: {}", id, e.user_message()));
                return None;
            }
        };

        let record = self.table.rows().iter().find(|b| b.id == id);
        let filename = download::backup_filename(id, record);
        match download::save(dir, &filename, &bytes) {
            Ok(written) => {
                self.core
                    .notifications
                    .success(format!("Backup saved to {}", written.display()));
                Some(written)
            }
            Err(e) => {
                self.core
                    .notifications
                    .error(format!("Failed to save backup {}: {}", id, e));
                None
            }
        }
    }

    pub fn render(&self) -> String {
        let s = self.summary();
        let summary = render_summary(&[
            ("Total", s.total.to_string()),
            ("Completed", s.completed.to_string()),
            ("In progress", s.in_progress.to_string()),
            ("Failed", s.failed.to_string()),
            ("Total size", format_bytes(s.total_size)),
        ]);
        format!("Backup Management\n\n{}\n\n{}", summary, self.table.render())
    }
}
