//! # rowdiff
//!
//! Row-synchronized table diff between two SQL data sources. Both sources
//! are read in lockstep and every position where the rows differ is
//! reported as an `INSERT` statement for the side that holds it.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod duckdb_config;
pub mod duckdb_source;
pub mod engine;
pub mod error;
pub mod literal;
pub mod output;
pub mod progress;
pub mod session;
pub mod source;
pub mod statement;

pub use config::SessionConfig;
pub use engine::{CancelToken, PositionalDiff};
pub use error::{Result, RowdiffError};
pub use literal::{encode, Cell, Number, Row};
pub use session::{ComparisonResult, ComparisonSession, SessionEvent, SessionHandle};
pub use source::{ConnectionProvider, RowSource};
pub use statement::{format_insert, DiffEntry, RenderMode, Side};
