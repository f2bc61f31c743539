use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{Batch, Connection, params};
use tally_core::{
    DateRange, DescriptionCount, DescriptionTotal, NewTransaction, Transaction, TransactionType,
};

use crate::error::{Result, StoreError};
use crate::raw::{RawRow, SqlValue};
use crate::schema::init_schema;

const SELECT_COLUMNS: &str =
    "SELECT id, date, description, type, amount, net_amount, settle_date FROM transactions";

/// Handle to the transaction database.
///
/// Clones share one connection. The lock is held for a single statement (or a
/// single batch insert), never across a lookup followed by an insert, so two
/// workers can both see a row as new before either commits it.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    read_only_queries: bool,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        init_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "opened transaction store");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            read_only_queries: false,
        }
    }

    /// Reject raw statements that would modify the database.
    pub fn with_read_only_queries(mut self, enabled: bool) -> Self {
        self.read_only_queries = enabled;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// True if a row with the same 5-tuple key is already committed.
    pub fn exists(&self, tx: &NewTransaction) -> Result<bool> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT 1 FROM transactions \
             WHERE date = ?1 AND description = ?2 AND amount = ?3 AND net_amount = ?4 AND settle_date = ?5 \
             LIMIT 1",
        )?;
        let (date, description, amount, net_amount, settle_date) = tx.dedup_key();
        Ok(stmt.exists(params![date, description, amount, net_amount, settle_date])?)
    }

    /// Insert every row in one SQL transaction and return the assigned ids.
    /// Either all rows land or none do.
    pub fn insert_batch(&self, rows: &[NewTransaction]) -> Result<Vec<i64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO transactions (date, description, type, amount, net_amount, settle_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.date,
                    row.description,
                    row.kind.as_str(),
                    row.amount,
                    row.net_amount,
                    row.settle_date,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?)
    }

    // -----------------------------------------------------------------------
    // Structured reads
    // -----------------------------------------------------------------------

    pub fn transactions_by_date(&self, range: DateRange) -> Result<Vec<Transaction>> {
        self.select_transactions(
            &format!("{SELECT_COLUMNS} WHERE date BETWEEN ?1 AND ?2"),
            &[range.start.into(), range.end.into()],
        )
    }

    pub fn transactions_by_type(
        &self,
        range: DateRange,
        kind: &TransactionType,
    ) -> Result<Vec<Transaction>> {
        self.select_transactions(
            &format!("{SELECT_COLUMNS} WHERE date BETWEEN ?1 AND ?2 AND type = ?3"),
            &[range.start.into(), range.end.into(), kind.as_str().into()],
        )
    }

    /// Case-insensitive substring match. `%` and `_` in the filter keep their
    /// LIKE meaning; an empty filter matches every row in range.
    pub fn transactions_by_description(
        &self,
        range: DateRange,
        filter: &str,
    ) -> Result<Vec<Transaction>> {
        self.select_transactions(
            &format!("{SELECT_COLUMNS} WHERE date BETWEEN ?1 AND ?2 AND description LIKE ?3"),
            &[
                range.start.into(),
                range.end.into(),
                format!("%{filter}%").into(),
            ],
        )
    }

    /// Unique descriptions in range, ascending by byte order.
    pub fn distinct_descriptions(&self, range: DateRange) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT description FROM transactions \
             WHERE date BETWEEN ?1 AND ?2 ORDER BY description ASC",
        )?;
        let rows = stmt
            .query_map(params![range.start, range.end], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    pub fn description_totals(&self, range: DateRange) -> Result<Vec<DescriptionTotal>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT description, SUM(net_amount) AS total_spent FROM transactions \
             WHERE date BETWEEN ?1 AND ?2 GROUP BY description",
        )?;
        let rows = stmt
            .query_map(params![range.start, range.end], |row| {
                Ok(DescriptionTotal {
                    description: row.get(0)?,
                    total_spent: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn description_counts(&self, range: DateRange) -> Result<Vec<DescriptionCount>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT description, COUNT(*) AS count FROM transactions \
             WHERE date BETWEEN ?1 AND ?2 GROUP BY description",
        )?;
        let rows = stmt
            .query_map(params![range.start, range.end], |row| {
                Ok(DescriptionCount {
                    description: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn select_transactions(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Raw execution
    // -----------------------------------------------------------------------

    /// Run one statement with positional arguments and return every result
    /// row as column/value pairs. Statements without a result set return an
    /// empty vector after running. Text holding more than one statement is
    /// rejected before anything runs.
    pub fn execute_raw(&self, query: &str, args: &[SqlValue]) -> Result<Vec<RawRow>> {
        if query.trim().is_empty() {
            return Err(StoreError::EmptyQuery);
        }
        let conn = self.lock()?;
        let mut batch = Batch::new(&conn, query);
        let Some(mut stmt) = batch.next()? else {
            return Err(StoreError::EmptyQuery);
        };
        if !matches!(batch.next(), Ok(None)) {
            return Err(StoreError::MultipleStatements);
        }
        if self.read_only_queries && !stmt.readonly() {
            return Err(StoreError::ReadOnlyViolation);
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                values.push((name.clone(), SqlValue::from(row.get_ref(i)?)));
            }
            out.push(RawRow::new(values));
        }
        tracing::debug!(rows = out.len(), "raw query executed");
        Ok(out)
    }
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let kind: Option<String> = row.get(3)?;
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get::<_, NaiveDate>(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        kind: TransactionType::from_stored(kind.as_deref().unwrap_or("")),
        amount: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        net_amount: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        settle_date: row.get::<_, NaiveDate>(6)?,
    })
}
