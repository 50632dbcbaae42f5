//! Output formatting utilities

use crate::catalog::ColumnPresence;
use crate::error::Result;
use crate::session::ComparisonResult;
use crate::statement::{DiffEntry, RenderMode};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Pretty printer for rowdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print a comparison result with both sides' entries
    pub fn print_comparison(result: &ComparisonResult, mode: RenderMode) {
        println!("🔍 Comparison: {} ↔ {}", result.source1, result.source2);
        println!("├─ Table: {}", result.table);
        if let Some(filter) = &result.filter {
            println!("├─ Filter: {}", filter);
        }
        println!("├─ Rows compared: {}", result.processed_rows);

        if result.is_identical() {
            println!("└─ ✅ {}", result.summary());
            return;
        }

        println!("└─ ❌ {}", result.summary());
        Self::print_side(
            &format!(
                "{} rows only in {} (table {})",
                result.only_in_source1.len(),
                result.source1,
                result.table
            ),
            &result.only_in_source1,
            mode,
        );
        Self::print_side(
            &format!(
                "{} rows only in {} (table {})",
                result.only_in_source2.len(),
                result.source2,
                result.table
            ),
            &result.only_in_source2,
            mode,
        );
    }

    fn print_side(title: &str, entries: &[DiffEntry], mode: RenderMode) {
        println!();
        println!("{}:", title);
        for entry in entries {
            println!("{}", entry.render(mode));
        }
    }

    /// Print tables common to both sources
    pub fn print_table_list(source1: &str, source2: &str, tables: &[String]) {
        if tables.is_empty() {
            println!("No common tables found in {} and {}.", source1, source2);
            return;
        }

        println!("📋 Tables in both {} and {}:", source1, source2);
        for (i, table) in tables.iter().enumerate() {
            let prefix = if i == tables.len() - 1 { "└─" } else { "├─" };
            println!("{} {}", prefix, table);
        }
    }

    /// Print a table's columns, optionally marking presence in a second source
    pub fn print_columns(table: &str, presence: &IndexMap<String, ColumnPresence>, compared: bool) {
        println!("📋 Columns of {}:", table);
        for (i, (name, p)) in presence.iter().enumerate() {
            let prefix = if i == presence.len() - 1 { "└─" } else { "├─" };
            if !compared {
                println!("{} {}", prefix, name);
            } else if p.in_source1 && p.in_source2 {
                println!("{} ✅ {}", prefix, name);
            } else if p.in_source1 {
                println!("{} ❌ {} (only in source 1)", prefix, name);
            } else {
                println!("{} ❌ {} (only in source 2)", prefix, name);
            }
        }
    }
}

/// JSON formatter for rowdiff output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_table_list(source1: &str, source2: &str, tables: &[String]) -> Result<String> {
        let json = serde_json::json!({
            "source1": source1,
            "source2": source2,
            "common_tables": tables,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_columns(table: &str, presence: &IndexMap<String, ColumnPresence>) -> Result<String> {
        let json = serde_json::json!({
            "table": table,
            "columns": presence,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// Renders diff entries as SQL script text
pub struct SqlWriter;

impl SqlWriter {
    /// One rendered line per entry
    pub fn render(entries: &[DiffEntry], mode: RenderMode) -> String {
        let mut script = String::new();
        for entry in entries {
            script.push_str(&entry.render(mode));
            script.push('\n');
        }
        script
    }

    /// Both sides as one script, each under a comment header
    pub fn render_comparison(result: &ComparisonResult, mode: RenderMode) -> String {
        format!(
            "-- Rows only in {} (table {})\n{}-- Rows only in {} (table {})\n{}",
            result.source1,
            result.table,
            Self::render(&result.only_in_source1, mode),
            result.source2,
            result.table,
            Self::render(&result.only_in_source2, mode)
        )
    }

    /// Write `<table>_source1.sql` and `<table>_source2.sql` into `dir`
    pub fn write_files(result: &ComparisonResult, mode: RenderMode, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let stem = sanitize_file_stem(&result.table);

        let mut written = Vec::new();
        for (suffix, entries) in [
            ("source1", &result.only_in_source1),
            ("source2", &result.only_in_source2),
        ] {
            let path = dir.join(format!("{}_{}.sql", stem, suffix));
            fs::write(&path, Self::render(entries, mode))?;
            log::debug!("Wrote {} entries to {}", entries.len(), path.display());
            written.push(path);
        }

        Ok(written)
    }
}

/// File-name-safe version of a (possibly schema-qualified) table name
fn sanitize_file_stem(table: &str) -> String {
    table
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
