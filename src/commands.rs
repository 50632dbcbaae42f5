//! Command implementations for rowdiff CLI

use crate::catalog::{column_presence, common_tables, table_columns};
use crate::cli::{Commands, OutputFormat};
use crate::config::{parse_column_list, RowdiffConfig, SessionConfig};
use crate::duckdb_source::DuckDbProvider;
use crate::error::{Result, RowdiffError};
use crate::output::{JsonFormatter, PrettyPrinter, SqlWriter};
use crate::progress::ProgressReporter;
use crate::session::{ComparisonResult, ComparisonSession};
use crate::source::ConnectionProvider;
use crate::statement::RenderMode;
use std::path::Path;
use std::sync::Arc;

/// Exit status for a successful command
pub const EXIT_OK: i32 = 0;

/// Exit status for `compare --fail-on-diff` when differences were found
pub const EXIT_DIFFERENCES: i32 = 2;

/// Execute a command, returning the process exit status
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<i32> {
    let file_config = RowdiffConfig::load_optional(config_path)?;

    match command {
        Commands::Compare {
            source1,
            source2,
            table,
            filter,
            columns,
            format,
            mode,
            output_dir,
            fail_on_diff,
            no_progress,
        } => {
            let options = CompareOptions {
                format: OutputFormat::parse(&format).map_err(RowdiffError::invalid_input)?,
                mode: RenderMode::parse(&mode).map_err(RowdiffError::invalid_input)?,
                output_dir: output_dir.as_deref(),
                show_progress: !no_progress,
            };
            let session_config = SessionConfig::new(require(table, &file_config.table, "table")?)
                .with_filter(filter.or_else(|| file_config.filter.clone()).unwrap_or_default())
                .with_projection(match columns {
                    Some(list) => parse_column_list(&list),
                    None => file_config.columns.clone(),
                });

            let result = compare_command(
                &require(source1, &file_config.source1, "source1")?,
                &require(source2, &file_config.source2, "source2")?,
                session_config,
                &file_config,
                &options,
            )?;

            if fail_on_diff && !result.is_identical() {
                Ok(EXIT_DIFFERENCES)
            } else {
                Ok(EXIT_OK)
            }
        }
        Commands::Tables {
            source1,
            source2,
            format,
        } => {
            tables_command(
                &require(source1, &file_config.source1, "source1")?,
                &require(source2, &file_config.source2, "source2")?,
                &file_config,
                &format,
            )?;
            Ok(EXIT_OK)
        }
        Commands::Columns {
            source,
            table,
            compare_to,
            format,
        } => {
            columns_command(
                &require(source, &file_config.source1, "source")?,
                &require(table, &file_config.table, "table")?,
                compare_to.as_deref(),
                &file_config,
                &format,
            )?;
            Ok(EXIT_OK)
        }
    }
}

/// A command line value, falling back to the config file
fn require(value: Option<String>, fallback: &Option<String>, what: &str) -> Result<String> {
    value.or_else(|| fallback.clone()).ok_or_else(|| {
        RowdiffError::invalid_input(format!(
            "Missing {}: pass it on the command line or set it in the config file",
            what
        ))
    })
}

/// How the result of a comparison is presented
pub struct CompareOptions<'a> {
    pub format: OutputFormat,
    pub mode: RenderMode,
    pub output_dir: Option<&'a Path>,
    pub show_progress: bool,
}

/// Compare a table between two sources and print the result
pub fn compare_command(
    source1: &str,
    source2: &str,
    session_config: SessionConfig,
    file_config: &RowdiffConfig,
    options: &CompareOptions<'_>,
) -> Result<ComparisonResult> {
    let provider1 = DuckDbProvider::new(source1, file_config.duckdb.clone())?;
    let provider2 = DuckDbProvider::new(source2, file_config.duckdb.clone())?;

    let mut reporter = if options.show_progress {
        ProgressReporter::new_for_compare(&session_config.table)
    } else {
        ProgressReporter::new_minimal()
    };

    let handle = ComparisonSession::new(Arc::new(provider1), Arc::new(provider2), session_config).spawn()?;
    let result = handle.wait(|percent| reporter.update(percent))?;
    reporter.finish("Comparison complete");

    match options.format {
        OutputFormat::Pretty => PrettyPrinter::print_comparison(&result, options.mode),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&result)?),
        OutputFormat::Sql => print!("{}", SqlWriter::render_comparison(&result, options.mode)),
    }

    if let Some(dir) = options.output_dir {
        let paths = SqlWriter::write_files(&result, options.mode, dir)?;
        for path in paths {
            log::info!("Wrote {}", path.display());
        }
    }

    Ok(result)
}

/// List tables present in both sources
fn tables_command(source1: &str, source2: &str, file_config: &RowdiffConfig, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(RowdiffError::invalid_input)?;
    let provider1 = DuckDbProvider::new(source1, file_config.duckdb.clone())?;
    let provider2 = DuckDbProvider::new(source2, file_config.duckdb.clone())?;

    let tables = common_tables(&provider1, &provider2)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            JsonFormatter::format_table_list(provider1.name(), provider2.name(), &tables)?
        ),
        _ => PrettyPrinter::print_table_list(provider1.name(), provider2.name(), &tables),
    }

    Ok(())
}

/// List a table's columns, optionally against a second source
fn columns_command(
    source: &str,
    table: &str,
    compare_to: Option<&str>,
    file_config: &RowdiffConfig,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(RowdiffError::invalid_input)?;
    let provider = DuckDbProvider::new(source, file_config.duckdb.clone())?;
    let columns1 = table_columns(&provider, table)?;

    let columns2 = match compare_to {
        Some(other) => {
            let other = DuckDbProvider::new(other, file_config.duckdb.clone())?;
            Some(table_columns(&other, table)?)
        }
        None => None,
    };

    let presence = column_presence(&columns1, columns2.as_deref().unwrap_or(&columns1));

    match format {
        OutputFormat::Json => println!("{}", JsonFormatter::format_columns(table, &presence)?),
        _ => PrettyPrinter::print_columns(table, &presence, columns2.is_some()),
    }

    Ok(())
}
