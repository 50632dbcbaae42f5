//! Error types for rowdiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RowdiffError>;

#[derive(Error, Debug)]
pub enum RowdiffError {
    #[error("Connection error on {source_name}: {message}")]
    Connection { source_name: String, message: String },

    #[error("Query error on {source_name}: {message}")]
    Query { source_name: String, message: String },

    #[error("Column/cell count mismatch: {columns} columns but {cells} cells")]
    FormatMismatch { columns: usize, cells: usize },

    #[error("Comparison cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl RowdiffError {
    pub fn connection(source_name: impl Into<String>, msg: impl ToString) -> Self {
        Self::Connection {
            source_name: source_name.into(),
            message: msg.to_string(),
        }
    }

    pub fn query(source_name: impl Into<String>, msg: impl ToString) -> Self {
        Self::Query {
            source_name: source_name.into(),
            message: msg.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// True for the caller-initiated abort outcome, which is not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
