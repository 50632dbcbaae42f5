//! DuckDB library discovery and per-connection settings

use crate::error::{Result, RowdiffError};
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Settings applied to every DuckDB connection a row source opens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDbSettings {
    /// e.g. "4GB"
    pub memory_limit: Option<String>,
    pub threads: Option<usize>,
}

impl DuckDbSettings {
    /// Apply the settings to a freshly opened connection.
    ///
    /// Insertion order is always preserved: positional comparison depends on
    /// plain scans coming back in a stable order.
    pub fn apply(&self, connection: &Connection) -> Result<()> {
        connection.execute_batch(
            "SET preserve_insertion_order=true; SET enable_progress_bar=false;",
        )?;

        if let Some(limit) = &self.memory_limit {
            if limit.contains('\'') {
                return Err(RowdiffError::config(format!("Invalid memory_limit: {}", limit)));
            }
            connection.execute_batch(&format!("SET memory_limit='{}'", limit))?;
        }

        if let Some(threads) = self.threads {
            if threads == 0 {
                return Err(RowdiffError::config("threads must be greater than 0"));
            }
            connection.execute_batch(&format!("SET threads={}", threads))?;
        }

        Ok(())
    }
}

/// Where the DuckDB shared library was found, if anywhere
#[derive(Debug)]
pub struct DuckDbLibrary {
    pub library_path: Option<PathBuf>,
}

impl DuckDbLibrary {
    pub fn discover() -> Self {
        let from_env = env::var("DUCKDB_LIB_PATH")
            .ok()
            .map(PathBuf::from)
            .filter(|p| Self::contains_library(p));

        let library_path =
            from_env.or_else(|| Self::standard_paths().into_iter().find(|p| Self::contains_library(p)));

        Self { library_path }
    }

    fn standard_paths() -> Vec<PathBuf> {
        let paths: &[&str] = if cfg!(target_os = "macos") {
            &["/opt/homebrew/lib", "/usr/local/lib", "/opt/local/lib"]
        } else if cfg!(target_os = "linux") {
            &[
                "/usr/lib",
                "/usr/local/lib",
                "/lib",
                "/usr/lib/x86_64-linux-gnu",
                "/usr/lib64",
            ]
        } else if cfg!(target_os = "windows") {
            &["C:\\Program Files\\DuckDB\\lib", "C:\\duckdb\\lib"]
        } else {
            &[]
        };
        paths.iter().map(PathBuf::from).collect()
    }

    fn contains_library(path: &Path) -> bool {
        let names: &[&str] = if cfg!(target_os = "windows") {
            &["duckdb.dll", "libduckdb.dll"]
        } else if cfg!(target_os = "macos") {
            &["libduckdb.dylib", "libduckdb.so"]
        } else {
            &["libduckdb.so", "libduckdb.so.1"]
        };
        names.iter().any(|name| path.join(name).exists())
    }

    pub fn validate(&self) -> Result<()> {
        if cfg!(feature = "bundled") || self.library_path.is_some() {
            return Ok(());
        }
        Err(RowdiffError::config(missing_library_message()))
    }
}

fn missing_library_message() -> String {
    let mut message = String::from("DuckDB library not found!\n\nPossible solutions:\n");
    if cfg!(target_os = "macos") {
        message.push_str("1. Install DuckDB: brew install duckdb\n");
    } else {
        message.push_str("1. Install DuckDB: https://duckdb.org/docs/installation/\n");
    }
    message.push_str("2. Set custom path: export DUCKDB_LIB_PATH=/path/to/duckdb/lib\n");
    message.push_str("3. Rebuild with bundled DuckDB: cargo build --features bundled\n");
    message
}

/// Check the DuckDB installation before any source is opened
pub fn init_duckdb() -> Result<DuckDbLibrary> {
    let library = DuckDbLibrary::discover();
    library.validate()?;

    if cfg!(feature = "bundled") {
        log::debug!("Using bundled DuckDB library");
    } else if let Some(path) = &library.library_path {
        log::debug!("Using DuckDB library from: {}", path.display());
    }

    Ok(library)
}
