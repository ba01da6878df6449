//! Generic tabular renderer driven by declarative column specs.
//!
//! A [`ColumnSpec`] pairs a value extractor with a pure formatter, so the
//! formatting rules can be tested without rendering. Sorting is client-side,
//! stable and limited to the rows already loaded; it never triggers a fetch.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Placeholder rendered for null values
pub const NULL_MARKER: &str = "NULL";

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Raw value of a cell, used for sorting and as formatter input
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Key not present in the row at all
    Missing,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn from_option<T: Into<CellValue>>(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }

    /// Convert a JSON field; `None` means the key was absent
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None => CellValue::Missing,
            Some(Value::Null) => CellValue::Null,
            Some(Value::Bool(b)) => CellValue::Bool(*b),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => CellValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Some(Value::String(s)) => CellValue::Text(s.clone()),
            Some(other) => CellValue::Text(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Missing => 0,
            CellValue::Null => 1,
            CellValue::Bool(_) => 2,
            CellValue::Int(_) | CellValue::Float(_) => 3,
            CellValue::Text(_) => 4,
        }
    }

    /// Total order used by the sorter: missing < null < bool < number < text
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (a, b) if a.rank() == 3 && b.rank() == 3 => {
                let (x, y) = (a.as_f64(), b.as_f64());
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            CellValue::Int(i) => *i as f64,
            CellValue::Float(f) => *f,
            _ => f64::NAN,
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(CellValue::Int)
            .unwrap_or(CellValue::Float(value as f64))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Formatted cell content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    /// Stand-in for an absent value, shown distinctly from real text
    Placeholder(&'static str),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // quoted so a literal "NULL" never reads as a null cell
            Cell::Text(text) if text == NULL_MARKER => write!(f, "\"{}\"", text),
            Cell::Text(text) => f.write_str(text),
            Cell::Placeholder(marker) => write!(f, "{}", marker.dimmed().italic()),
        }
    }
}

pub type Formatter = fn(&CellValue) -> Cell;

/// Default formatter: nulls become [`NULL_MARKER`], missing keys stay empty
pub fn format_plain(value: &CellValue) -> Cell {
    match value {
        CellValue::Missing => Cell::Text(String::new()),
        CellValue::Null => Cell::Placeholder(NULL_MARKER),
        CellValue::Bool(b) => Cell::Text(b.to_string()),
        CellValue::Int(i) => Cell::Text(i.to_string()),
        CellValue::Float(f) => Cell::Text(f.to_string()),
        CellValue::Text(s) => Cell::Text(s.clone()),
    }
}

type Extractor<R> = Arc<dyn Fn(&R) -> CellValue + Send + Sync>;

/// Column descriptor: key, header label, extractor and formatter
pub struct ColumnSpec<R> {
    key: String,
    label: String,
    extract: Extractor<R>,
    format: Formatter,
}

impl<R> Clone for ColumnSpec<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            label: self.label.clone(),
            extract: Arc::clone(&self.extract),
            format: self.format,
        }
    }
}

impl<R> ColumnSpec<R> {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        extract: impl Fn(&R) -> CellValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            extract: Arc::new(extract),
            format: format_plain,
        }
    }

    pub fn format(mut self, format: Formatter) -> Self {
        self.format = format;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self, row: &R) -> CellValue {
        (self.extract)(row)
    }

    pub fn cell(&self, row: &R) -> Cell {
        (self.format)(&self.value(row))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

/// Rows plus column specs with client-side sort and pagination
pub struct TableView<R> {
    columns: Vec<ColumnSpec<R>>,
    rows: Vec<R>,
    sort: Option<SortState>,
    page: usize,
    page_size: usize,
    empty_message: String,
}

impl<R> TableView<R> {
    pub fn new(columns: Vec<ColumnSpec<R>>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            sort: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            empty_message: "No results found".to_string(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn columns(&self) -> &[ColumnSpec<R>] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnSpec<R>>) {
        if let Some(sort) = &self.sort {
            if !columns.iter().any(|c| c.key == sort.column) {
                self.sort = None;
            }
        }
        self.columns = columns;
    }

    /// Replace the loaded rows; sort order is kept, the page is clamped
    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.page = self.page.min(self.page_count().saturating_sub(1));
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Sort by a column key. Returns false for an unknown column.
    pub fn sort_by(&mut self, column: &str, direction: SortDirection) -> bool {
        if !self.columns.iter().any(|c| c.key == column) {
            return false;
        }
        self.sort = Some(SortState {
            column: column.to_string(),
            direction,
        });
        true
    }

    /// Cycle ascending -> descending -> unsorted for a column
    pub fn toggle_sort(&mut self, column: &str) -> bool {
        let next = match &self.sort {
            Some(s) if s.column == column && s.direction == SortDirection::Ascending => {
                Some(SortDirection::Descending)
            }
            Some(s) if s.column == column => None,
            _ => Some(SortDirection::Ascending),
        };

        match next {
            Some(direction) => self.sort_by(column, direction),
            None => {
                self.sort = None;
                true
            }
        }
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size).max(1)
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Indices of all loaded rows in display order
    fn ordered(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        let Some(sort) = &self.sort else {
            return order;
        };
        let Some(column) = self.columns.iter().find(|c| c.key == sort.column) else {
            return order;
        };

        let values: Vec<CellValue> = self.rows.iter().map(|r| column.value(r)).collect();
        order.sort_by(|&a, &b| {
            let ord = values[a].sort_cmp(&values[b]);
            match sort.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        order
    }

    /// Rows on the current page, sorted
    pub fn visible_rows(&self) -> Vec<&R> {
        self.ordered()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .map(|i| &self.rows[i])
            .collect()
    }

    /// Formatted cells of the current page
    pub fn visible_cells(&self) -> Vec<Vec<Cell>> {
        self.visible_rows()
            .into_iter()
            .map(|row| self.columns.iter().map(|c| c.cell(row)).collect())
            .collect()
    }

    fn header(&self, column: &ColumnSpec<R>) -> String {
        match &self.sort {
            Some(s) if s.column == column.key => match s.direction {
                SortDirection::Ascending => format!("{} ▲", column.label),
                SortDirection::Descending => format!("{} ▼", column.label),
            },
            _ => column.label.clone(),
        }
    }

    /// Render the current page as a text table with a page footer
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return self.empty_message.clone();
        }

        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| self.header(c)));
        for cells in self.visible_cells() {
            builder.push_record(cells.into_iter().map(|c| c.to_string()));
        }

        let mut table = builder.build();
        table.with(Style::rounded());

        let mut out = table.to_string();
        if self.page_count() > 1 {
            out.push_str(&format!(
                "\nPage {} of {} ({} rows)",
                self.page + 1,
                self.page_count(),
                self.rows.len()
            ));
        }
        out
    }
}
