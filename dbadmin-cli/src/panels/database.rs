//! Database browser: table catalog with client-side search, and drill-down
//! into a single table's rows.
//!
//! A drill-down fetch is tagged with the epoch at which the table was
//! selected. Any later select or deselect bumps the epoch, so a response
//! that arrives for an earlier selection is dropped instead of replacing
//! what is on screen.

use std::sync::Arc;

use dbadmin_common::{ApiError, TableCatalog, TableData, TableDescriptor};
use serde_json::{Map, Value};

use crate::api::Transport;
use crate::output::{format_count, format_timestamp};
use crate::query::{QueryKey, Resource};
use crate::table::{format_plain, Cell, CellValue, ColumnSpec, TableView};

use super::{PanelCore, PanelOptions};

type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatabaseView {
    #[default]
    TableList,
    Table {
        name: String,
    },
}

/// Identifies one drill-down request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDownTicket {
    pub epoch: u64,
    pub table: String,
}

fn catalog_columns() -> Vec<ColumnSpec<TableDescriptor>> {
    vec![
        ColumnSpec::new("table_name", "Table", |t: &TableDescriptor| CellValue::text(&t.table_name)),
        ColumnSpec::new("row_count", "Rows", |t: &TableDescriptor| CellValue::from(t.row_count)).format(|v| match v {
            CellValue::Int(n) => Cell::Text(format_count(*n)),
            other => format_plain(other),
        }),
        ColumnSpec::new("size", "Size", |t: &TableDescriptor| CellValue::text(&t.size)),
        ColumnSpec::new("last_modified", "Last Modified", |t: &TableDescriptor| {
            CellValue::from_option(t.last_modified.clone())
        })
        .format(|v| match v {
            CellValue::Text(raw) => Cell::Text(format_timestamp(raw)),
            other => format_plain(other),
        }),
    ]
}

/// One column per server-declared column name, read straight from the row map
fn row_columns(names: &[String]) -> Vec<ColumnSpec<Row>> {
    names
        .iter()
        .map(|name| {
            let key = name.clone();
            ColumnSpec::new(name.clone(), name.clone(), move |row: &Row| {
                CellValue::from_json(row.get(&key))
            })
        })
        .collect()
}

pub struct DatabasePanel {
    pub core: PanelCore,
    pub catalog: TableView<TableDescriptor>,
    pub rows: TableView<Row>,
    tables: Vec<TableDescriptor>,
    search: String,
    view: DatabaseView,
    epoch: u64,
    total: u64,
}

impl DatabasePanel {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions) -> Self {
        Self {
            core: PanelCore::new(transport, options),
            catalog: TableView::new(catalog_columns())
                .with_page_size(options.page_size)
                .with_empty_message("No tables found"),
            rows: TableView::new(Vec::new())
                .with_page_size(options.page_size)
                .with_empty_message("Table is empty"),
            tables: Vec::new(),
            search: String::new(),
            view: DatabaseView::TableList,
            epoch: 0,
            total: 0,
        }
    }

    pub fn key() -> QueryKey {
        QueryKey::new(Resource::DatabaseTables)
    }

    pub fn table_key(name: &str) -> QueryKey {
        QueryKey::item(Resource::TableData, name)
    }

    pub fn view(&self) -> &DatabaseView {
        &self.view
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub async fn refresh(&mut self) -> bool {
        match self.core.load::<TableCatalog>(&Self::key(), "database tables").await {
            Some(catalog) => {
                self.tables = catalog.into_tables();
                self.apply_search();
                true
            }
            None => false,
        }
    }

    /// Case-insensitive substring filter over table names
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.apply_search();
    }

    fn apply_search(&mut self) {
        let needle = self.search.trim().to_lowercase();
        let visible = self
            .tables
            .iter()
            .filter(|t| needle.is_empty() || t.table_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        self.catalog.set_rows(visible);
    }

    /// Switch to the row view for `name` and hand out a ticket for its fetch
    pub fn select(&mut self, name: &str) -> DrillDownTicket {
        self.epoch += 1;
        self.view = DatabaseView::Table {
            name: name.to_string(),
        };
        self.rows.set_columns(Vec::new());
        self.rows.set_rows(Vec::new());
        self.rows.set_page(0);
        self.total = 0;

        DrillDownTicket {
            epoch: self.epoch,
            table: name.to_string(),
        }
    }

    /// Back to the table list; outstanding tickets become stale
    pub fn deselect(&mut self) {
        self.epoch += 1;
        self.view = DatabaseView::TableList;
    }

    pub fn is_current(&self, ticket: &DrillDownTicket) -> bool {
        ticket.epoch == self.epoch
            && matches!(&self.view, DatabaseView::Table { name } if *name == ticket.table)
    }

    pub async fn fetch_drill_down(&self, ticket: &DrillDownTicket) -> Result<TableData, ApiError> {
        self.core.cache().fetch(&Self::table_key(&ticket.table)).await
    }

    /// Apply a drill-down result. Returns false when the ticket is stale
    /// and the result was discarded.
    pub fn apply_drill_down(&mut self, ticket: DrillDownTicket, result: Result<TableData, ApiError>) -> bool {
        if !self.is_current(&ticket) {
            tracing::debug!(table = %ticket.table, epoch = ticket.epoch, "discarding stale drill-down");
            return false;
        }

        match result {
            Ok(data) => {
                self.rows.set_columns(row_columns(&data.columns));
                self.total = data.total;
                self.rows.set_rows(data.rows);
            }
            Err(e) => {
                self.core.notifications.error(format!(
                    "Failed to load table {}: {}",
                    ticket.table,
                    e.user_message()
                ));
            }
        }
        true
    }

    /// Select a table and load its rows
    pub async fn open_table(&mut self, name: &str) -> bool {
        let ticket = self.select(name);
        let result = self.fetch_drill_down(&ticket).await;
        let ok = result.is_ok();
        self.apply_drill_down(ticket, result) && ok
    }

    pub fn render(&self) -> String {
        match &self.view {
            DatabaseView::TableList => {
                let mut out = format!("Database Tables ({})\n\n", self.tables.len());
                if !self.search.trim().is_empty() {
                    out.push_str(&format!("Filter: {}\n", self.search.trim()));
                }
                out.push_str(&self.catalog.render());
                out
            }
            DatabaseView::Table { name } => format!(
                "Table: {} ({} rows)\n\n{}",
                name,
                format_count(self.total),
                self.rows.render()
            ),
        }
    }
}
