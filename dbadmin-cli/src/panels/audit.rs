//! Audit log panel: filtered list, stats header and CSV export

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dbadmin_common::{AuditLogEntry, AuditStats, AuditStatus};

use crate::api::Transport;
use crate::download;
use crate::output::{format_count, format_timestamp, render_summary, truncate};
use crate::query::{QueryKey, Resource};
use crate::table::{format_plain, Cell, CellValue, ColumnSpec, TableView};

use super::{PanelCore, PanelOptions};

pub const AUDIT_PAGE_SIZE: usize = 20;

/// Server-side filters for the audit log list. Blank values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilters {
    pub search: String,
    pub status: Option<AuditStatus>,
    pub action: Option<String>,
}

impl AuditFilters {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.status.is_none()
            && self.action.as_deref().map_or(true, |a| a.trim().is_empty())
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("search", self.search.clone())];
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(action) = &self.action {
            params.push(("action", action.clone()));
        }
        params
    }

    pub fn key(&self) -> QueryKey {
        self.params()
            .into_iter()
            .fold(QueryKey::new(Resource::AuditLogs), |key, (name, value)| key.param(name, value))
    }

    /// Export path carrying the same filters as the list
    pub fn export_path(&self) -> String {
        let query: Vec<String> = self
            .params()
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v.trim())))
            .collect();
        if query.is_empty() {
            "/audit-logs/export".to_string()
        } else {
            format!("/audit-logs/export?{}", query.join("&"))
        }
    }
}

fn columns() -> Vec<ColumnSpec<AuditLogEntry>> {
    vec![
        ColumnSpec::new("timestamp", "Timestamp", |l: &AuditLogEntry| CellValue::text(&l.timestamp)).format(|v| match v {
            CellValue::Text(raw) => Cell::Text(format_timestamp(raw)),
            other => format_plain(other),
        }),
        ColumnSpec::new("user_email", "User", |l: &AuditLogEntry| CellValue::text(&l.user_email)),
        ColumnSpec::new("action", "Action", |l: &AuditLogEntry| CellValue::text(&l.action)),
        ColumnSpec::new("resource", "Resource", |l: &AuditLogEntry| {
            if l.resource_id.is_empty() {
                CellValue::text(&l.resource_type)
            } else {
                CellValue::text(format!("{}:{}", l.resource_type, l.resource_id))
            }
        }),
        ColumnSpec::new("status", "Status", |l: &AuditLogEntry| CellValue::text(l.status.as_str())),
        ColumnSpec::new("ip_address", "IP Address", |l: &AuditLogEntry| CellValue::text(&l.ip_address)),
        ColumnSpec::new("details", "Details", |l: &AuditLogEntry| CellValue::text(&l.details)).format(|v| match v {
            CellValue::Text(raw) => Cell::Text(truncate(raw, 40)),
            other => format_plain(other),
        }),
    ]
}

pub struct AuditLogsPanel {
    pub core: PanelCore,
    pub table: TableView<AuditLogEntry>,
    filters: AuditFilters,
    stats: Option<AuditStats>,
}

impl AuditLogsPanel {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        Self {
            core: PanelCore::new(transport, options),
            table: TableView::new(columns())
                .with_page_size(AUDIT_PAGE_SIZE)
                .with_empty_message("No audit logs found"),
            filters: AuditFilters::default(),
            stats: None,
        }
    }

    pub fn filters(&self) -> &AuditFilters {
        &self.filters
    }

    pub fn stats(&self) -> Option<&AuditStats> {
        self.stats.as_ref()
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
    }

    pub fn set_status(&mut self, status: Option<AuditStatus>) {
        self.filters.status = status;
    }

    pub fn set_action(&mut self, action: Option<String>) {
        self.filters.action = action.filter(|a| !a.trim().is_empty());
    }

    pub fn set_filters(&mut self, filters: AuditFilters) {
        self.filters = filters;
    }

    pub fn clear_filters(&mut self) {
        self.filters = AuditFilters::default();
    }

    /// Load the list for the current filters and the stats header.
    /// A stats failure only adds a warning.
    pub async fn refresh(&mut self) -> bool {
        let key = self.filters.key();
        let loaded = match self.core.load::<Vec<AuditLogEntry>>(&key, "audit logs").await {
            Some(rows) => {
                self.table.set_rows(rows);
                self.table.set_page(0);
                true
            }
            None => false,
        };

        let stats_key = QueryKey::new(Resource::AuditStats);
        if let Some(stats) = self.core.load_extra::<AuditStats>(&stats_key, "audit stats").await {
            self.stats = Some(stats);
        }

        loaded
    }

    /// Load only the stats header; the log list is left untouched
    pub async fn refresh_stats(&mut self) -> bool {
        let key = QueryKey::new(Resource::AuditStats);
        match self.core.load::<AuditStats>(&key, "audit stats").await {
            Some(stats) => {
                self.stats = Some(stats);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[AuditLogEntry] {
        self.table.rows()
    }

    /// Download the CSV export for the current filters into `dir`
    pub async fn export(&mut self, dir: &Path, now: DateTime<Utc>) -> Option<PathBuf> {
        let path = self.filters.export_path();
        let bytes = match self.core.cache().transport().get_bytes(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.core
                    .notifications
                    .error(format!("Failed to export audit logs: {}", e.user_message()));
                return None;
            }
        };

        match download::save(dir, &download::audit_export_filename(now), &bytes) {
            Ok(written) => {
                self.core
                    .notifications
                    .success(format!("Audit logs exported to {}", written.display()));
                Some(written)
            }
            Err(e) => {
                self.core
                    .notifications
                    .error(format!("Failed to save audit export: {}", e));
                None
            }
        }
    }

    pub fn render(&self) -> String {
        let header = match &self.stats {
            Some(s) => render_summary(&[
                ("Total Events", format_count(s.total_events)),
                ("Success Rate", format!("{:.1}%", s.success_rate)),
                ("Failed Events", format_count(s.failed_events)),
            ]),
            None => "Stats unavailable".to_string(),
        };
        format!("Audit Logs\n\n{}\n\n{}", header, self.table.render())
    }
}
