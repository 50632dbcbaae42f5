//! DuckDB-backed row sources
//!
//! Each source owns its own connection. Column names and types come from
//! `DESCRIBE`, and every column is then fetched as DuckDB's own VARCHAR
//! rendering and turned back into a [`Cell`] according to its type. Values
//! of any DuckDB type (enums, intervals, nested types, nanosecond
//! timestamps) therefore compare by their canonical text and re-encode as
//! valid SQL.
//!
//! Rows are streamed chunk by chunk by a cursor thread and handed over a
//! rendezvous channel, so neither side's result set is materialized.

use crate::config::SessionConfig;
use crate::connection::{count_query, describe_query, text_select_query, ConnectionSpec};
use crate::duckdb_config::DuckDbSettings;
use crate::error::{Result, RowdiffError};
use crate::literal::{Cell, Number, Row};
use crate::source::{ConnectionProvider, RowSource};
use duckdb::arrow::array::{Array, ArrayRef, AsArray};
use duckdb::arrow::compute::cast;
use duckdb::arrow::datatypes::DataType;
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::{AccessMode, Config, Connection};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

/// Opens DuckDB connections for one source handle
#[derive(Debug, Clone)]
pub struct DuckDbProvider {
    name: String,
    spec: ConnectionSpec,
    settings: DuckDbSettings,
}

impl DuckDbProvider {
    pub fn new(handle: &str, settings: DuckDbSettings) -> Result<Self> {
        let spec = ConnectionSpec::parse(handle)?;
        Ok(Self {
            name: spec.to_string(),
            spec,
            settings,
        })
    }

    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    /// Open a new connection; every failure here is a connection error
    pub fn connect(&self) -> Result<Connection> {
        let connection = match &self.spec {
            ConnectionSpec::InMemory => Connection::open_in_memory(),
            ConnectionSpec::File(path) => {
                if !path.exists() {
                    return Err(RowdiffError::connection(
                        &self.name,
                        format!("database file not found: {}", path.display()),
                    ));
                }
                Config::default()
                    .access_mode(AccessMode::ReadOnly)
                    .and_then(|config| Connection::open_with_flags(path, config))
            }
            ConnectionSpec::Attach { .. } => Connection::open_in_memory(),
        }
        .map_err(|e| RowdiffError::connection(&self.name, e))?;

        self.settings
            .apply(&connection)
            .map_err(|e| RowdiffError::connection(&self.name, e))?;

        if let ConnectionSpec::Attach { statement, alias } = &self.spec {
            connection
                .execute_batch(statement)
                .and_then(|_| connection.execute_batch(&format!("USE {}", alias)))
                .map_err(|e| RowdiffError::connection(&self.name, e))?;
        }

        log::debug!("Connected to {}", self.name);
        Ok(connection)
    }

    /// Column names and DuckDB type names of the row query
    fn describe(&self, connection: &Connection, config: &SessionConfig) -> Result<Vec<(String, String)>> {
        let sql = describe_query(config);
        log::debug!("[{}] {}", self.name, sql);

        let mut stmt = connection
            .prepare(&sql)
            .map_err(|e| RowdiffError::query(&self.name, e))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| RowdiffError::query(&self.name, e))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(|e| RowdiffError::query(&self.name, e))?);
        }

        if columns.is_empty() {
            return Err(RowdiffError::query(
                &self.name,
                format!("query on {} has no columns", config.table),
            ));
        }
        Ok(columns)
    }
}

impl ConnectionProvider for DuckDbProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, config: &SessionConfig) -> Result<Box<dyn RowSource>> {
        let connection = self.connect()?;
        let described = self.describe(&connection, config)?;

        let columns: Vec<String> = described.iter().map(|(name, _)| name.clone()).collect();
        let kinds: Vec<ColumnKind> = described
            .iter()
            .map(|(_, type_name)| ColumnKind::from_type_name(type_name))
            .collect();

        let sql = text_select_query(config, &columns);
        log::debug!("[{}] {}", self.name, sql);
        let cursor = Cursor::start(&connection, sql, kinds, &self.name)?;

        Ok(Box::new(DuckDbSource {
            name: self.name.clone(),
            connection: Some(connection),
            count_sql: count_query(config),
            columns,
            cursor: Some(cursor),
        }))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare(
                "SELECT table_schema, table_name FROM information_schema.tables \
                 WHERE table_type = 'BASE TABLE' AND table_catalog = current_database() \
                 ORDER BY table_schema, table_name",
            )
            .map_err(|e| RowdiffError::query(&self.name, e))?;

        let rows = stmt
            .query_map([], |row| {
                let schema: String = row.get(0)?;
                let table: String = row.get(1)?;
                Ok(if schema == "main" {
                    table
                } else {
                    format!("{}.{}", schema, table)
                })
            })
            .map_err(|e| RowdiffError::query(&self.name, e))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(|e| RowdiffError::query(&self.name, e))?);
        }
        Ok(names)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let connection = self.connect()?;
        let described = self.describe(&connection, &SessionConfig::new(table))?;
        Ok(described.into_iter().map(|(name, _)| name).collect())
    }
}

/// How the VARCHAR text of a column becomes a cell
#[derive(Debug, Clone, PartialEq)]
enum ColumnKind {
    Text,
    Integer,
    /// FLOAT or DOUBLE; non-finite values fall back to a cast literal
    Float(String),
    Decimal,
    Boolean,
    /// Written as `TYPE 'text'`
    Typed(String),
    /// Written as `'text'::TYPE`
    Cast(String),
}

impl ColumnKind {
    fn from_type_name(type_name: &str) -> Self {
        let type_name = type_name.trim();
        let upper = type_name.to_uppercase();
        match upper.as_str() {
            "VARCHAR" => ColumnKind::Text,
            "BOOLEAN" => ColumnKind::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" | "UHUGEINT" => ColumnKind::Integer,
            "FLOAT" | "DOUBLE" => ColumnKind::Float(upper.clone()),
            "DATE" | "TIME" | "TIMESTAMP" | "INTERVAL" => ColumnKind::Typed(upper.clone()),
            _ if upper.starts_with("DECIMAL") => ColumnKind::Decimal,
            _ if upper.starts_with("ENUM") => ColumnKind::Text,
            _ => ColumnKind::Cast(type_name.to_string()),
        }
    }

    fn to_cell(&self, text: &str) -> Cell {
        match self {
            ColumnKind::Text => Cell::Text(text.to_string()),
            // UHUGEINT can exceed i128; keep its digits as they are
            ColumnKind::Integer => match text.parse::<i128>() {
                Ok(value) => Cell::Number(Number::Int(value)),
                Err(_) => Cell::Number(Number::Decimal(text.to_string())),
            },
            ColumnKind::Float(type_name) => match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Cell::Number(Number::Float(value)),
                _ => Cell::Other(format!("{}::{}", quote_text(text), type_name)),
            },
            ColumnKind::Decimal => Cell::Number(Number::Decimal(text.to_string())),
            ColumnKind::Boolean => Cell::Other(text.to_uppercase()),
            ColumnKind::Typed(type_name) => Cell::Other(format!("{} {}", type_name, quote_text(text))),
            ColumnKind::Cast(type_name) => Cell::Other(format!("{}::{}", quote_text(text), type_name)),
        }
    }
}

/// Quote DuckDB text for a typed literal. Backslashes are literal in DuckDB
/// strings (a BLOB's `\xAB` must stay as is), so only quotes are doubled.
fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

type RowMessage = std::result::Result<Option<Row>, String>;

/// Background cursor streaming one query's rows
struct Cursor {
    rows: Receiver<RowMessage>,
    handle: JoinHandle<()>,
}

impl Cursor {
    /// Start `sql` on a clone of `connection` and wait until it is executing
    fn start(
        connection: &Connection,
        sql: String,
        kinds: Vec<ColumnKind>,
        source_name: &str,
    ) -> Result<Self> {
        let cursor_connection = connection
            .try_clone()
            .map_err(|e| RowdiffError::connection(source_name, e))?;

        let (ready_tx, ready_rx) = mpsc::channel();
        let (row_tx, row_rx) = mpsc::sync_channel(0);

        let handle = thread::Builder::new()
            .name(format!("rowdiff-cursor-{}", source_name))
            .spawn(move || stream_rows(cursor_connection, &sql, &kinds, ready_tx, row_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                rows: row_rx,
                handle,
            }),
            Ok(Err(message)) => {
                let _ = handle.join();
                Err(RowdiffError::query(source_name, message))
            }
            Err(_) => {
                let _ = handle.join();
                Err(RowdiffError::query(source_name, "cursor stopped before the query ran"))
            }
        }
    }

    fn stop(self) -> std::result::Result<(), String> {
        // Dropping the receiver unblocks a pending send
        drop(self.rows);
        self.handle
            .join()
            .map_err(|_| "cursor thread panicked".to_string())
    }
}

fn stream_rows(
    connection: Connection,
    sql: &str,
    kinds: &[ColumnKind],
    ready: Sender<std::result::Result<(), String>>,
    rows: SyncSender<RowMessage>,
) {
    let mut stmt = match connection.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    let mut batches = match stmt.stream_arrow([]) {
        Ok(batches) => batches,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        return;
    }

    loop {
        let batch = match next_batch(&mut batches) {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                let _ = rows.send(Ok(None));
                return;
            }
            Err(message) => {
                let _ = rows.send(Err(message));
                return;
            }
        };

        let columns = match text_columns(&batch, kinds) {
            Ok(columns) => columns,
            Err(message) => {
                let _ = rows.send(Err(message));
                return;
            }
        };

        let row_count = columns.first().map_or(0, |column| column.len());
        for index in 0..row_count {
            if rows.send(read_row(&columns, kinds, index)).is_err() {
                return;
            }
        }
    }
}

/// Fetch the next chunk. The arrow iterator panics on fetch errors, so the
/// panic is turned back into an error message.
fn next_batch<I>(batches: &mut I) -> std::result::Result<Option<RecordBatch>, String>
where
    I: Iterator<Item = RecordBatch>,
{
    panic::catch_unwind(AssertUnwindSafe(|| batches.next())).map_err(|payload| {
        payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "failed to fetch rows".to_string())
    })
}

fn text_columns(batch: &RecordBatch, kinds: &[ColumnKind]) -> std::result::Result<Vec<ArrayRef>, String> {
    if batch.num_columns() != kinds.len() {
        return Err(format!(
            "expected {} columns, got {}",
            kinds.len(),
            batch.num_columns()
        ));
    }
    batch
        .columns()
        .iter()
        .map(|column| cast(column, &DataType::Utf8).map_err(|e| e.to_string()))
        .collect()
}

fn read_row(columns: &[ArrayRef], kinds: &[ColumnKind], index: usize) -> RowMessage {
    let mut cells = Vec::with_capacity(columns.len());
    for (column, kind) in columns.iter().zip(kinds) {
        if column.is_null(index) {
            cells.push(Cell::Null);
            continue;
        }
        let text = column
            .as_string_opt::<i32>()
            .ok_or_else(|| format!("column of type {} was not rendered as text", column.data_type()))?;
        cells.push(kind.to_cell(text.value(index)));
    }
    Ok(Some(cells))
}

/// A DuckDB query streamed row by row
struct DuckDbSource {
    name: String,
    connection: Option<Connection>,
    count_sql: String,
    columns: Vec<String>,
    cursor: Option<Cursor>,
}

impl RowSource for DuckDbSource {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let cursor = match &self.cursor {
            Some(cursor) => cursor,
            None => return Ok(None),
        };

        match cursor.rows.recv() {
            Ok(Ok(Some(row))) => Ok(Some(row)),
            Ok(Ok(None)) => {
                self.finish_cursor()?;
                Ok(None)
            }
            Ok(Err(message)) => {
                let _ = self.finish_cursor();
                Err(RowdiffError::query(&self.name, message))
            }
            Err(_) => {
                let _ = self.finish_cursor();
                Err(RowdiffError::query(&self.name, "cursor ended unexpectedly"))
            }
        }
    }

    fn count(&mut self) -> Result<u64> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| RowdiffError::query(&self.name, "source already closed"))?;

        log::debug!("[{}] {}", self.name, self.count_sql);
        let count: i64 = connection
            .query_row(&self.count_sql, [], |row| row.get(0))
            .map_err(|e| RowdiffError::query(&self.name, e))?;
        Ok(count.max(0) as u64)
    }

    fn close(&mut self) -> Result<()> {
        let stopped = self.finish_cursor();
        self.connection.take();
        stopped
    }
}

impl DuckDbSource {
    fn finish_cursor(&mut self) -> Result<()> {
        match self.cursor.take() {
            Some(cursor) => cursor
                .stop()
                .map_err(|message| RowdiffError::query(&self.name, message)),
            None => Ok(()),
        }
    }
}

impl Drop for DuckDbSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
