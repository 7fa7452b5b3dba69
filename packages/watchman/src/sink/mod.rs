//! Destination tables and the warehouse capability.
//!
//! The warehouse is treated as three operations: append rows, key-based merge
//! from one table into another, and truncate. Every operation reports a
//! [`JobStatus`]; the [`SinkLoader`] turns anything other than
//! [`JobStatus::Done`] into a load failure.
//!
//! Available backends:
//! - `MemoryWarehouse` - In-memory tables (always available)
//! - `PostgresWarehouse` - PostgreSQL (requires `postgres` feature)

pub mod loader;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use loader::SinkLoader;
pub use memory::MemoryWarehouse;

#[cfg(feature = "postgres")]
pub use postgres::PostgresWarehouse;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, WatchmanError};

/// A validated, optionally schema-qualified table name.
///
/// Segments must match `[A-Za-z_][A-Za-z0-9_]*`; the id is interpolated into
/// SQL, so nothing else gets through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId(String);

impl TableId {
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = !raw.is_empty()
            && raw.split('.').all(|segment| {
                let mut chars = segment.chars();
                matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            });

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(WatchmanError::InvalidTable(raw.to_string()))
        }
    }

    /// Names known valid at compile time.
    pub(crate) fn builtin(name: &'static str) -> Self {
        debug_assert!(Self::parse(name).is_ok(), "invalid builtin table {}", name);
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL, one quote pair per segment.
    pub fn quoted(&self) -> String {
        self.0
            .split('.')
            .map(|segment| format!("\"{}\"", segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    String,
    Integer,
    Float,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Nullable,
    Required,
    /// Array column; the cell is always a (possibly empty) list.
    Repeated,
}

/// One column of a fixed destination schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub mode: Mode,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind, mode: Mode) -> Self {
        Self { name, kind, mode }
    }

    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self::new(name, kind, Mode::Required)
    }

    pub const fn nullable(name: &'static str, kind: ColumnKind) -> Self {
        Self::new(name, kind, Mode::Nullable)
    }

    pub const fn repeated(name: &'static str) -> Self {
        Self::new(name, ColumnKind::String, Mode::Repeated)
    }
}

/// A single cell, typed to match its [`ColumnSpec`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
    Date(Option<NaiveDate>),
    StringList(Vec<String>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::String(v) => v.is_none(),
            CellValue::Integer(v) => v.is_none(),
            CellValue::Float(v) => v.is_none(),
            CellValue::Date(v) => v.is_none(),
            CellValue::StringList(_) => false,
        }
    }

    fn matches(&self, column: &ColumnSpec) -> bool {
        let kind_ok = match (self, column.mode) {
            (CellValue::StringList(_), Mode::Repeated) => column.kind == ColumnKind::String,
            (CellValue::StringList(_), _) | (_, Mode::Repeated) => false,
            (CellValue::String(_), _) => column.kind == ColumnKind::String,
            (CellValue::Integer(_), _) => column.kind == ColumnKind::Integer,
            (CellValue::Float(_), _) => column.kind == ColumnKind::Float,
            (CellValue::Date(_), _) => column.kind == ColumnKind::Date,
        };
        kind_ok && !(column.mode == Mode::Required && self.is_null())
    }
}

/// Cells in schema column order.
pub type Row = Vec<CellValue>;

/// Check a row against the destination schema.
pub fn validate_row(table: &TableId, columns: &[ColumnSpec], row: &Row) -> Result<()> {
    if row.len() != columns.len() {
        return Err(WatchmanError::Schema {
            table: table.to_string(),
            reason: format!("expected {} columns, got {}", columns.len(), row.len()),
        });
    }

    for (column, cell) in columns.iter().zip(row) {
        if !cell.matches(column) {
            return Err(WatchmanError::Schema {
                table: table.to_string(),
                reason: format!("column {} ({:?}, {:?}) cannot hold {:?}", column.name, column.kind, column.mode, cell),
            });
        }
    }

    Ok(())
}

/// Terminal state of a warehouse job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Done,
    Failed(String),
}

impl JobStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, JobStatus::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Done => f.write_str("DONE"),
            JobStatus::Failed(status) => f.write_str(status),
        }
    }
}

/// Key-based merge of `source` into `target`.
///
/// Rows matching on every key column get `update_columns` overwritten; rows
/// with no match are inserted with `key_columns` + `update_columns`. When
/// several source rows share a key, the newest one wins.
#[derive(Debug, Clone)]
pub struct MergeSpec {
    pub target: TableId,
    pub source: TableId,
    pub key_columns: Vec<&'static str>,
    pub update_columns: Vec<&'static str>,
    /// Source column that grows with arrival order. Backends that keep rows
    /// in arrival order may ignore it.
    pub sequence_column: Option<&'static str>,
}

impl MergeSpec {
    pub fn insert_columns(&self) -> Vec<&'static str> {
        self.key_columns
            .iter()
            .chain(self.update_columns.iter())
            .copied()
            .collect()
    }
}

/// Destination capability: append, merge, truncate.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Append rows (already validated against `columns`).
    async fn append(&self, table: &TableId, columns: &[ColumnSpec], rows: Vec<Row>) -> Result<JobStatus>;

    async fn merge(&self, spec: &MergeSpec) -> Result<JobStatus>;

    async fn truncate(&self, table: &TableId) -> Result<JobStatus>;
}

#[async_trait]
impl<T: Warehouse + ?Sized> Warehouse for Arc<T> {
    async fn append(&self, table: &TableId, columns: &[ColumnSpec], rows: Vec<Row>) -> Result<JobStatus> {
        (**self).append(table, columns, rows).await
    }

    async fn merge(&self, spec: &MergeSpec) -> Result<JobStatus> {
        (**self).merge(spec).await
    }

    async fn truncate(&self, table: &TableId) -> Result<JobStatus> {
        (**self).truncate(table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_accepts_qualified_names() {
        let id = TableId::parse("analytics.close_price_delta").unwrap();
        assert_eq!(id.quoted(), "\"analytics\".\"close_price_delta\"");
        assert!(TableId::parse("_tmp1").is_ok());
    }

    #[test]
    fn test_table_id_rejects_injection() {
        assert!(TableId::parse("").is_err());
        assert!(TableId::parse("tweets; DROP TABLE tweets").is_err());
        assert!(TableId::parse("1tweets").is_err());
        assert!(TableId::parse("a..b").is_err());
        assert!(TableId::parse("\"quoted\"").is_err());
    }

    #[test]
    fn test_validate_row_checks_kind_and_mode() {
        let table = TableId::parse("close_price").unwrap();
        let columns = [
            ColumnSpec::required("ticker", ColumnKind::String),
            ColumnSpec::nullable("close_price", ColumnKind::Float),
            ColumnSpec::repeated("tags"),
        ];

        let good = vec![
            CellValue::String(Some("AAPL".into())),
            CellValue::Float(None),
            CellValue::StringList(vec![]),
        ];
        assert!(validate_row(&table, &columns, &good).is_ok());

        let null_required = vec![
            CellValue::String(None),
            CellValue::Float(Some(1.0)),
            CellValue::StringList(vec![]),
        ];
        assert!(validate_row(&table, &columns, &null_required).is_err());

        let wrong_kind = vec![
            CellValue::String(Some("AAPL".into())),
            CellValue::Integer(Some(1)),
            CellValue::StringList(vec![]),
        ];
        assert!(validate_row(&table, &columns, &wrong_kind).is_err());

        let short = vec![CellValue::String(Some("AAPL".into()))];
        assert!(validate_row(&table, &columns, &short).is_err());
    }

    #[test]
    fn test_job_status_display() {
        assert_eq!(JobStatus::Done.to_string(), "DONE");
        assert_eq!(JobStatus::Failed("RUNNING".into()).to_string(), "RUNNING");
    }
}
