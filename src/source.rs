//! Row source adapters and the providers that open them
//!
//! A [`RowSource`] is a sequential, read-only cursor over one source's
//! projection of a table. The diff engine only ever asks it for the next
//! row, so an implementation decides how much (if anything) to prefetch.

use crate::config::SessionConfig;
use crate::error::{Result, RowdiffError};
use crate::literal::Row;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sequential cursor over a table or query
pub trait RowSource: Send {
    /// Column names of the rows this source yields, in row order
    fn column_names(&self) -> &[String];

    /// Next row, or `None` once the data is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Row count of the table under the same filter
    fn count(&mut self) -> Result<u64>;

    /// Release the underlying cursor and connection. Must be idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Opens row sources for one data source handle
pub trait ConnectionProvider: Send + Sync {
    /// Human-readable name used in errors and reports
    fn name(&self) -> &str;

    fn open(&self, config: &SessionConfig) -> Result<Box<dyn RowSource>>;

    /// Base tables visible through this handle, sorted
    fn table_names(&self) -> Result<Vec<String>>;

    /// Columns `SELECT *` yields for `table`, in order.
    ///
    /// The default opens a source and reads its column names; providers
    /// that can describe a query without running it should override this.
    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut guard = SourceGuard::new(self.name(), self.open(&SessionConfig::new(table))?);
        Ok(guard.source_mut().column_names().to_vec())
    }
}

/// Closes the wrapped source when dropped, so every exit path releases it
pub struct SourceGuard {
    name: String,
    source: Box<dyn RowSource>,
}

impl SourceGuard {
    pub fn new(name: impl Into<String>, source: Box<dyn RowSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_mut(&mut self) -> &mut dyn RowSource {
        self.source.as_mut()
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.source.close() {
            log::warn!("Failed to close source {}: {}", self.name, e);
        }
    }
}

/// An in-memory table
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }
}

/// Provider over in-memory tables, for embedding callers that already hold
/// their rows and for exercising the engine without a database.
///
/// Filters are SQL fragments and cannot be evaluated here; opening with a
/// filter fails with a query error.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    name: String,
    tables: HashMap<String, MemoryTable>,
    reachable: bool,
    fail_after: Option<usize>,
    open_sources: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
            reachable: true,
            fail_after: None,
            open_sources: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, table: MemoryTable) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Every open fails with a connection error
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Fetches fail with a query error after `rows` rows have been served
    pub fn fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    /// Sources opened and not yet closed
    pub fn open_sources(&self) -> usize {
        self.open_sources.load(Ordering::SeqCst)
    }

    fn project(&self, table: &MemoryTable, projection: &[String]) -> Result<MemoryTable> {
        if projection.is_empty() {
            return Ok(table.clone());
        }

        let mut indices = Vec::with_capacity(projection.len());
        for column in projection {
            let index = table
                .columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| {
                    RowdiffError::query(&self.name, format!("Column '{}' not found", column))
                })?;
            indices.push(index);
        }

        let mut rows = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let projected = indices
                .iter()
                .map(|&i| row.get(i).cloned())
                .collect::<Option<Row>>()
                .ok_or(RowdiffError::FormatMismatch {
                    columns: table.columns.len(),
                    cells: row.len(),
                })?;
            rows.push(projected);
        }

        Ok(MemoryTable {
            columns: projection.to_vec(),
            rows,
        })
    }
}

impl ConnectionProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, config: &SessionConfig) -> Result<Box<dyn RowSource>> {
        if !self.reachable {
            return Err(RowdiffError::connection(&self.name, "source unreachable"));
        }

        let table = self.tables.get(&config.table).ok_or_else(|| {
            RowdiffError::query(&self.name, format!("Table '{}' does not exist", config.table))
        })?;

        if config.effective_filter().is_some() {
            return Err(RowdiffError::query(
                &self.name,
                "in-memory sources do not evaluate filters",
            ));
        }

        let projected = self.project(table, &config.projection)?;
        self.open_sources.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySource {
            name: self.name.clone(),
            columns: projected.columns,
            rows: projected.rows.into_iter(),
            served: 0,
            fail_after: self.fail_after,
            open_sources: Some(Arc::clone(&self.open_sources)),
            total: table.rows.len() as u64,
        }))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        if !self.reachable {
            return Err(RowdiffError::connection(&self.name, "source unreachable"));
        }
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

struct MemorySource {
    name: String,
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    served: usize,
    fail_after: Option<usize>,
    open_sources: Option<Arc<AtomicUsize>>,
    total: u64,
}

impl RowSource for MemorySource {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.fail_after.is_some_and(|limit| self.served >= limit) {
            return Err(RowdiffError::query(&self.name, "connection lost while fetching"));
        }
        let row = self.rows.next();
        if row.is_some() {
            self.served += 1;
        }
        Ok(row)
    }

    fn count(&mut self) -> Result<u64> {
        Ok(self.total)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(open) = self.open_sources.take() {
            open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
