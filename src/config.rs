//! Session and file-based configuration

use crate::duckdb_config::DuckDbSettings;
use crate::error::{Result, RowdiffError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// What one comparison run reads from both sources.
///
/// The filter is a raw boolean SQL fragment placed verbatim after `WHERE`.
/// It is not sanitised and must only come from trusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub table: String,
    #[serde(default)]
    pub filter: Option<String>,
    /// Empty means every column, expanded independently by each source
    #[serde(default)]
    pub projection: Vec<String>,
}

impl SessionConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            projection: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = if filter.trim().is_empty() {
            None
        } else {
            Some(filter)
        };
        self
    }

    pub fn with_projection<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = columns.into_iter().map(Into::into).collect();
        self
    }

    /// The filter, if one is set and not blank
    pub fn effective_filter(&self) -> Option<&str> {
        self.filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(RowdiffError::config("Table name must not be empty"));
        }

        let mut seen = HashSet::new();
        for column in &self.projection {
            if column.trim().is_empty() {
                return Err(RowdiffError::config("Column names must not be empty"));
            }
            if !seen.insert(column.as_str()) {
                return Err(RowdiffError::config(format!(
                    "Column '{}' selected more than once",
                    column
                )));
            }
        }

        Ok(())
    }
}

/// Defaults loaded from a JSON config file; command line flags take precedence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowdiffConfig {
    pub source1: Option<String>,
    pub source2: Option<String>,
    pub table: Option<String>,
    pub filter: Option<String>,
    pub columns: Vec<String>,
    pub duckdb: DuckDbSettings,
}

impl RowdiffConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RowdiffError::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RowdiffError::config(format!("Invalid config file '{}': {}", path.display(), e))
        })
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Split a comma-separated column list, dropping blanks
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
