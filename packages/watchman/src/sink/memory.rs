//! In-memory warehouse for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{CellValue, ColumnKind, ColumnSpec, JobStatus, MergeSpec, Mode, Row, TableId, Warehouse};
use crate::error::{Result, WatchmanError};

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<ColumnSpec>,
    rows: Vec<Row>,
}

impl Table {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

/// Tables held in memory with the same append/merge/truncate semantics as
/// the PostgreSQL backend.
///
/// A table is created by its first append (or by [`seed`](Self::seed)).
/// [`fail_next_with`](Self::fail_next_with) makes the next job report a
/// non-`DONE` status without touching any table.
pub struct MemoryWarehouse {
    tables: RwLock<HashMap<String, Table>>,
    fail_next: RwLock<Option<String>>,
    jobs: RwLock<usize>,
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            fail_next: RwLock::new(None),
            jobs: RwLock::new(0),
        }
    }

    /// Insert rows directly, bypassing job accounting.
    pub fn seed(&self, table: &TableId, columns: &[ColumnSpec], rows: Vec<Row>) {
        let mut tables = self.tables.write().unwrap();
        let entry = tables.entry(table.to_string()).or_insert_with(|| Table {
            columns: columns.to_vec(),
            rows: Vec::new(),
        });
        entry.rows.extend(rows);
    }

    /// Make the next job finish with `status` instead of `DONE`.
    pub fn fail_next_with(&self, status: impl Into<String>) {
        *self.fail_next.write().unwrap() = Some(status.into());
    }

    /// Rows currently in `table`, empty if the table does not exist.
    pub fn rows(&self, table: &TableId) -> Vec<Row> {
        self.tables
            .read()
            .unwrap()
            .get(table.as_str())
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &TableId) -> usize {
        self.tables
            .read()
            .unwrap()
            .get(table.as_str())
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Values of one column across every row of `table`.
    pub fn column(&self, table: &TableId, column: &str) -> Vec<CellValue> {
        let tables = self.tables.read().unwrap();
        let Some(t) = tables.get(table.as_str()) else {
            return Vec::new();
        };
        let Some(index) = t.position(column) else {
            return Vec::new();
        };
        t.rows.iter().map(|row| row[index].clone()).collect()
    }

    /// Jobs started so far, failed ones included.
    pub fn job_count(&self) -> usize {
        *self.jobs.read().unwrap()
    }

    /// Count the job and take any scripted failure.
    fn start_job(&self) -> Option<String> {
        *self.jobs.write().unwrap() += 1;
        self.fail_next.write().unwrap().take()
    }
}

fn null_cell(column: &ColumnSpec) -> CellValue {
    match (column.mode, column.kind) {
        (Mode::Repeated, _) => CellValue::StringList(Vec::new()),
        (_, ColumnKind::String) => CellValue::String(None),
        (_, ColumnKind::Integer) => CellValue::Integer(None),
        (_, ColumnKind::Float) => CellValue::Float(None),
        (_, ColumnKind::Date) => CellValue::Date(None),
    }
}

fn missing_column(table: &TableId, column: &str) -> WatchmanError {
    WatchmanError::Schema {
        table: table.to_string(),
        reason: format!("no column named {}", column),
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn append(&self, table: &TableId, columns: &[ColumnSpec], rows: Vec<Row>) -> Result<JobStatus> {
        if let Some(status) = self.start_job() {
            return Ok(JobStatus::Failed(status));
        }
        self.seed(table, columns, rows);
        Ok(JobStatus::Done)
    }

    async fn merge(&self, spec: &MergeSpec) -> Result<JobStatus> {
        if let Some(status) = self.start_job() {
            return Ok(JobStatus::Failed(status));
        }

        let mut tables = self.tables.write().unwrap();
        let source = match tables.get(spec.source.as_str()) {
            Some(source) => source.clone(),
            None => return Ok(JobStatus::Done),
        };
        let target = tables
            .entry(spec.target.to_string())
            .or_insert_with(|| Table {
                columns: source.columns.clone(),
                rows: Vec::new(),
            });

        let keys = spec
            .key_columns
            .iter()
            .map(|c| {
                let s = source.position(c).ok_or_else(|| missing_column(&spec.source, c))?;
                let t = target.position(c).ok_or_else(|| missing_column(&spec.target, c))?;
                Ok((s, t))
            })
            .collect::<Result<Vec<_>>>()?;
        let updates = spec
            .update_columns
            .iter()
            .map(|c| {
                let s = source.position(c).ok_or_else(|| missing_column(&spec.source, c))?;
                let t = target.position(c).ok_or_else(|| missing_column(&spec.target, c))?;
                Ok((s, t))
            })
            .collect::<Result<Vec<_>>>()?;

        for incoming in &source.rows {
            let matched = target
                .rows
                .iter_mut()
                .find(|existing| keys.iter().all(|&(s, t)| existing[t] == incoming[s]));

            match matched {
                Some(existing) => {
                    for &(s, t) in &updates {
                        existing[t] = incoming[s].clone();
                    }
                }
                None => {
                    let mut row: Row = target.columns.iter().map(null_cell).collect();
                    for &(s, t) in keys.iter().chain(updates.iter()) {
                        row[t] = incoming[s].clone();
                    }
                    target.rows.push(row);
                }
            }
        }

        Ok(JobStatus::Done)
    }

    async fn truncate(&self, table: &TableId) -> Result<JobStatus> {
        if let Some(status) = self.start_job() {
            return Ok(JobStatus::Failed(status));
        }
        if let Some(t) = self.tables.write().unwrap().get_mut(table.as_str()) {
            t.rows.clear();
        }
        Ok(JobStatus::Done)
    }
}
