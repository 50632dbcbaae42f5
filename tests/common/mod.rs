//! Common test utilities and helpers

use duckdb::Connection;
use rowdiff::duckdb_config::DuckDbSettings;
use rowdiff::duckdb_source::DuckDbProvider;
use rowdiff::{ComparisonResult, ComparisonSession, Result, SessionConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary directory holding DuckDB database files that act as sources
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a database file by running `sql` against it
    pub fn create_db(&self, name: &str, sql: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        let conn = Connection::open(&path)?;
        conn.execute_batch(sql)?;
        Ok(path)
    }

    /// Create a database with one two-column table `t (id INTEGER, name VARCHAR)`
    pub fn create_people_db(&self, name: &str, rows: &[(i64, Option<&str>)]) -> Result<PathBuf> {
        let mut sql = String::from("CREATE TABLE t (id INTEGER, name VARCHAR);\n");
        for (id, value) in rows {
            let literal = match value {
                Some(v) => format!("'{}'", v.replace('\'', "''")),
                None => "NULL".to_string(),
            };
            sql.push_str(&format!("INSERT INTO t VALUES ({}, {});\n", id, literal));
        }
        self.create_db(name, &sql)
    }

    pub fn provider(&self, path: &Path) -> Result<DuckDbProvider> {
        DuckDbProvider::new(&path.to_string_lossy(), DuckDbSettings::default())
    }

    /// Compare two database files on the calling thread, collecting progress
    pub fn compare(
        &self,
        db1: &Path,
        db2: &Path,
        config: SessionConfig,
    ) -> Result<(ComparisonResult, Vec<u8>)> {
        let session = self.session(db1, db2, config)?;
        let mut progress = Vec::new();
        let result = session.run(|p| progress.push(p))?;
        Ok((result, progress))
    }

    pub fn session(&self, db1: &Path, db2: &Path, config: SessionConfig) -> Result<ComparisonSession> {
        Ok(ComparisonSession::new(
            Arc::new(self.provider(db1)?),
            Arc::new(self.provider(db2)?),
            config,
        ))
    }
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a rowdiff command and return its exit status
    pub fn run_command(&self, args: &[&str]) -> Result<i32> {
        use clap::Parser;
        use rowdiff::cli::Cli;
        use rowdiff::commands::execute_command;

        let mut cmd_args = vec!["rowdiff"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| rowdiff::RowdiffError::invalid_input(e.to_string()))?;

        execute_command(cli.command, cli.config.as_deref())
    }

    /// Run a command and expect it to succeed, returning the exit status
    pub fn expect_success(&self, args: &[&str]) -> i32 {
        self.run_command(args).expect("Command should succeed")
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> rowdiff::RowdiffError {
        self.run_command(args).expect_err("Command should fail")
    }
}

/// Statements of one side of a result, for compact assertions
pub fn statements(entries: &[rowdiff::DiffEntry]) -> Vec<String> {
    entries.iter().map(|e| e.statement.clone()).collect()
}

/// Path as a CLI argument
pub fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
