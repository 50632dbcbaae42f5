//! Typed cell values and their SQL literal encoding

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric cell value in its source-native precision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i128),
    Float(f64),
    /// Fixed-point values keep the source's own decimal text
    Decimal(String),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // Integral floats keep a fractional digit so they read back as floats
            Number::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            Number::Float(v) => write!(f, "{}", v),
            Number::Decimal(d) => f.write_str(d),
        }
    }
}

/// One value of a row, positionally aligned with the projection's column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Null,
    Text(String),
    Number(Number),
    /// Raw textual fallback for types with no dedicated variant (dates, booleans, blobs)
    Other(String),
}

/// A row as produced by a row source
pub type Row = Vec<Cell>;

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Number(Number::Int(i as i128))
    }
}

impl From<i32> for Cell {
    fn from(i: i32) -> Self {
        Cell::Number(Number::Int(i as i128))
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(Number::Float(v))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Encode a cell as a SQL literal suitable for a VALUES list.
///
/// Text is escaped by doubling backslashes first and single quotes second,
/// then wrapped in single quotes. Numbers and fallback values are emitted
/// unquoted in their textual form.
pub fn encode(cell: &Cell) -> String {
    match cell {
        Cell::Null => "NULL".to_string(),
        Cell::Text(s) => {
            let escaped = s.replace('\\', "\\\\").replace('\'', "''");
            format!("'{}'", escaped)
        }
        Cell::Number(n) => n.to_string(),
        Cell::Other(raw) => raw.clone(),
    }
}
