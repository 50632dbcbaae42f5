//! Command-line interface for rowdiff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowdiff")]
#[command(about = "Compare a table between two SQL data sources row by row")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON config file with default sources, table, filter and columns
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare a table between two sources
    Compare {
        /// First source: DuckDB file, ":memory:" or an ATTACH statement
        source1: Option<String>,

        /// Second source
        source2: Option<String>,

        /// Table to compare
        #[arg(long)]
        table: Option<String>,

        /// Raw SQL condition appended after WHERE (trusted input only)
        #[arg(long)]
        filter: Option<String>,

        /// Comma-separated columns to compare (default: all columns)
        #[arg(long)]
        columns: Option<String>,

        /// Output format: "pretty", "json", "sql"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Render mode: "insert" or "values"
        #[arg(long, default_value = "insert")]
        mode: String,

        /// Write one SQL file per source into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Exit with status 2 when differences are found
        #[arg(long)]
        fail_on_diff: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List tables present in both sources
    Tables {
        source1: Option<String>,

        source2: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// List a table's columns
    Columns {
        source: Option<String>,

        /// Table to inspect
        #[arg(long)]
        table: Option<String>,

        /// Second source to check column presence against
        #[arg(long)]
        compare_to: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
    Sql,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "sql" => Ok(Self::Sql),
            _ => Err(format!("Invalid output format: {}. Use 'pretty', 'json' or 'sql'", s)),
        }
    }
}
