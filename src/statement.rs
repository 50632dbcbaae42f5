//! INSERT statement formatting and diff entries

use crate::error::{Result, RowdiffError};
use crate::literal::{encode, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which source a diff entry was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source1,
    Source2,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source1 => f.write_str("source1"),
            Side::Source2 => f.write_str("source2"),
        }
    }
}

/// How a diff entry is rendered for display or export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Full `INSERT INTO ...;` statement
    Insert,
    /// Just the parenthesised literal list, `(...);`
    Values,
}

impl RenderMode {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "values" => Ok(Self::Values),
            _ => Err(format!("Invalid render mode: {}. Use 'insert' or 'values'", s)),
        }
    }
}

/// Build `INSERT INTO {table} ({cols}) VALUES ({literals})`.
///
/// The column list and the row must have the same length; a mismatch means
/// the row source handed out a row that does not match its own columns.
pub fn format_insert(table: &str, columns: &[String], row: &Row) -> Result<String> {
    if columns.len() != row.len() {
        return Err(RowdiffError::FormatMismatch {
            columns: columns.len(),
            cells: row.len(),
        });
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        render_values_only(row)
    ))
}

/// Render only the literal list of a row: `(lit1, lit2, ...)`
pub fn render_values_only(row: &Row) -> String {
    let literals: Vec<String> = row.iter().map(encode).collect();
    format!("({})", literals.join(", "))
}

/// A row present in one source with no equal counterpart at the same
/// position in the other source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub side: Side,
    pub row: Row,
    pub statement: String,
}

impl DiffEntry {
    pub fn new(side: Side, table: &str, columns: &[String], row: Row) -> Result<Self> {
        let statement = format_insert(table, columns, &row)?;
        Ok(Self {
            side,
            row,
            statement,
        })
    }

    pub fn values(&self) -> String {
        render_values_only(&self.row)
    }

    /// One display/export line, terminated with `;`
    pub fn render(&self, mode: RenderMode) -> String {
        match mode {
            RenderMode::Insert => format!("{};", self.statement),
            RenderMode::Values => format!("{};", self.values()),
        }
    }
}
