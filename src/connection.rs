//! Connection spec parsing and SQL query construction

use crate::config::SessionConfig;
use crate::error::{Result, RowdiffError};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a source handle string maps onto a DuckDB connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSpec {
    /// `:memory:`
    InMemory,
    /// A DuckDB database file
    File(PathBuf),
    /// An `ATTACH ... AS alias (TYPE ...)` statement run on an in-memory database
    Attach { statement: String, alias: String },
}

impl ConnectionSpec {
    /// Parse a source handle. `{VAR}` placeholders in ATTACH statements are
    /// replaced from the environment.
    pub fn parse(handle: &str) -> Result<Self> {
        let trimmed = handle.trim();
        if trimmed.is_empty() {
            return Err(RowdiffError::invalid_input("Source must not be empty"));
        }

        if trimmed == ":memory:" {
            return Ok(Self::InMemory);
        }

        if trimmed.to_uppercase().starts_with("ATTACH ") {
            let statement = substitute_env_vars(trimmed.trim_end_matches(';'))?;
            let alias = attach_alias(&statement).ok_or_else(|| {
                RowdiffError::invalid_input(format!(
                    "ATTACH statement needs an 'AS <alias>' clause: {}",
                    trimmed
                ))
            })?;
            return Ok(Self::Attach { statement, alias });
        }

        Ok(Self::File(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for ConnectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSpec::InMemory => f.write_str(":memory:"),
            ConnectionSpec::File(path) => write!(f, "{}", path.display()),
            // The statement may carry credentials, so only the alias is shown
            ConnectionSpec::Attach { alias, .. } => write!(f, "attached:{}", alias),
        }
    }
}

/// Extract the alias following the last quoted section of an ATTACH statement
fn attach_alias(statement: &str) -> Option<String> {
    let after_target = match statement.rfind('\'') {
        Some(pos) => &statement[pos + 1..],
        None => statement,
    };
    let upper = after_target.to_uppercase();
    let as_pos = upper.find(" AS ")?;
    let alias: String = after_target[as_pos + 4..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if alias.is_empty() {
        None
    } else {
        Some(alias)
    }
}

/// Substitute environment variables in a connection string
pub fn substitute_env_vars(connection_string: &str) -> Result<String> {
    let mut result = connection_string.to_string();

    // Placeholders look like {VAR_NAME}
    let mut start = 0;
    while let Some(open_pos) = result[start..].find('{') {
        let open_pos = start + open_pos;
        if let Some(close_pos) = result[open_pos..].find('}') {
            let close_pos = open_pos + close_pos;
            let var_name = &result[open_pos + 1..close_pos];

            let var_value = env::var(var_name).map_err(|_| {
                RowdiffError::invalid_input(format!(
                    "Environment variable '{}' not found. Make sure it's set in your .env file or environment.",
                    var_name
                ))
            })?;

            result.replace_range(open_pos..=close_pos, &var_value);
            start = open_pos + var_value.len();
        } else {
            start = open_pos + 1;
        }
    }

    Ok(result)
}

/// Load environment variables from .env file if it exists
pub fn load_env_file() -> Result<()> {
    if Path::new(".env").exists() {
        dotenv::dotenv().map_err(|e| {
            RowdiffError::invalid_input(format!("Failed to load .env file: {}", e))
        })?;
    }

    Ok(())
}

fn where_clause(config: &SessionConfig) -> String {
    match config.effective_filter() {
        Some(filter) => format!(" WHERE {}", filter),
        None => String::new(),
    }
}

/// `SELECT COUNT(*) FROM table [WHERE filter]`
pub fn count_query(config: &SessionConfig) -> String {
    format!("SELECT COUNT(*) FROM {}{}", config.table, where_clause(config))
}

/// `SELECT cols|* FROM table [WHERE filter]`
pub fn select_query(config: &SessionConfig) -> String {
    let columns = if config.projection.is_empty() {
        "*".to_string()
    } else {
        config.projection.join(", ")
    };
    format!("SELECT {} FROM {}{}", columns, config.table, where_clause(config))
}

/// `DESCRIBE` of the row query: column names and types, no rows read
pub fn describe_query(config: &SessionConfig) -> String {
    format!("DESCRIBE {}", select_query(config))
}

/// The row query with every column rendered as DuckDB's own VARCHAR text
pub fn text_select_query(config: &SessionConfig, columns: &[String]) -> String {
    let casts: Vec<String> = columns
        .iter()
        .map(|column| {
            let quoted = quote_identifier(column);
            format!("CAST({} AS VARCHAR) AS {}", quoted, quoted)
        })
        .collect();
    format!(
        "SELECT {} FROM ({}) AS rowdiff_rows",
        casts.join(", "),
        select_query(config)
    )
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
