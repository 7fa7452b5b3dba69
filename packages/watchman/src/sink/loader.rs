//! Loads result sets into the warehouse.

use tracing::{debug, info};

use super::{validate_row, JobStatus, MergeSpec, Row, TableId, Warehouse};
use crate::error::{Result, WatchmanError};
use crate::records::{ClosePrice, TableRecord};
use crate::result_set::ResultSet;

/// Arrival-order column of the close-price delta table, filled by the database.
const DELTA_SEQUENCE_COLUMN: &str = "seq";

/// Writes typed result sets through a [`Warehouse`].
///
/// Every row is validated against the record's column schema before any
/// job is started, and a job that does not finish as `DONE` fails the call.
/// Failed loads are not retried.
pub struct SinkLoader<W> {
    warehouse: W,
}

impl<W> SinkLoader<W> {
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }
}

impl<W: Warehouse> SinkLoader<W> {
    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Append every record to `table`. Empty sets are skipped.
    pub async fn append<R: TableRecord>(&self, table: &TableId, records: &ResultSet<R>) -> Result<usize> {
        if records.is_empty() {
            debug!(table = %table, "Nothing to append");
            return Ok(0);
        }

        let rows = rows_for(table, records)?;
        let count = rows.len();
        let status = self.warehouse.append(table, R::COLUMNS, rows).await?;
        ensure_done(table, status)?;

        info!(table = %table, rows = count, "Appended rows");
        Ok(count)
    }

    /// Upsert close prices: append to `delta`, merge into `main` on
    /// `(ticker, day)` updating `close_price`, then truncate `delta`.
    ///
    /// The merge and truncate run even for an empty set so a delta left
    /// behind by an earlier failed run is still folded in.
    pub async fn upsert_via_delta(
        &self,
        delta: &TableId,
        main: &TableId,
        records: &ResultSet<ClosePrice>,
    ) -> Result<usize> {
        let rows = rows_for(delta, records)?;
        let count = rows.len();

        if !rows.is_empty() {
            let status = self.warehouse.append(delta, ClosePrice::COLUMNS, rows).await?;
            ensure_done(delta, status)?;
        }

        let spec = MergeSpec {
            target: main.clone(),
            source: delta.clone(),
            key_columns: vec!["ticker", "day"],
            update_columns: vec!["close_price"],
            sequence_column: Some(DELTA_SEQUENCE_COLUMN),
        };
        let status = self.warehouse.merge(&spec).await?;
        ensure_done(main, status)?;

        let status = self.warehouse.truncate(delta).await?;
        ensure_done(delta, status)?;

        info!(delta = %delta, table = %main, rows = count, "Merged close prices");
        Ok(count)
    }
}

fn rows_for<R: TableRecord>(table: &TableId, records: &ResultSet<R>) -> Result<Vec<Row>> {
    records
        .iter()
        .map(|record| {
            let row = record.to_row();
            validate_row(table, R::COLUMNS, &row)?;
            Ok(row)
        })
        .collect()
}

fn ensure_done(table: &TableId, status: JobStatus) -> Result<()> {
    match status {
        JobStatus::Done => Ok(()),
        JobStatus::Failed(status) => Err(WatchmanError::LoadFailure {
            table: table.to_string(),
            status,
        }),
    }
}
