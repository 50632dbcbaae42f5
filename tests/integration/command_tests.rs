//! Integration tests running complete rowdiff commands

use crate::common::{arg, CliTestRunner};
use rowdiff::commands::{EXIT_DIFFERENCES, EXIT_OK};
use rowdiff::RowdiffError;
use std::fs;

#[test]
fn test_compare_identical_sources() {
    let runner = CliTestRunner::new().unwrap();
    let rows = [(1, Some("a")), (2, Some("b"))];
    let db1 = runner.fixture().create_people_db("db1.duckdb", &rows).unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &rows).unwrap();

    let status = runner.expect_success(&[
        "compare",
        &arg(&db1),
        &arg(&db2),
        "--table",
        "t",
        "--fail-on-diff",
        "--no-progress",
    ]);
    assert_eq!(status, EXIT_OK);
}

#[test]
fn test_fail_on_diff_exit_status() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner.fixture().create_people_db("db1.duckdb", &[(1, Some("a"))]).unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &[(1, Some("b"))]).unwrap();

    let without_flag = runner.expect_success(&[
        "compare",
        &arg(&db1),
        &arg(&db2),
        "--table",
        "t",
        "--no-progress",
    ]);
    assert_eq!(without_flag, EXIT_OK);

    let with_flag = runner.expect_success(&[
        "compare",
        &arg(&db1),
        &arg(&db2),
        "--table",
        "t",
        "--format",
        "json",
        "--fail-on-diff",
        "--no-progress",
    ]);
    assert_eq!(with_flag, EXIT_DIFFERENCES);
}

#[test]
fn test_compare_writes_sql_files() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner
        .fixture()
        .create_people_db("db1.duckdb", &[(1, Some("a")), (2, Some("O'Brien"))])
        .unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &[(1, Some("a"))]).unwrap();
    let out = runner.fixture().root().join("out");

    runner.expect_success(&[
        "compare",
        &arg(&db1),
        &arg(&db2),
        "--table",
        "t",
        "--format",
        "sql",
        "--output-dir",
        &arg(&out),
        "--no-progress",
    ]);

    assert_eq!(
        fs::read_to_string(out.join("t_source1.sql")).unwrap(),
        "INSERT INTO t (id, name) VALUES (2, 'O''Brien');\n"
    );
    assert_eq!(fs::read_to_string(out.join("t_source2.sql")).unwrap(), "");
}

#[test]
fn test_compare_values_mode_with_columns() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner.fixture().create_people_db("db1.duckdb", &[(1, Some("a"))]).unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &[(2, Some("a"))]).unwrap();
    let out = runner.fixture().root().join("out");

    let status = runner.expect_success(&[
        "compare",
        &arg(&db1),
        &arg(&db2),
        "--table",
        "t",
        "--columns",
        "name",
        "--mode",
        "values",
        "--output-dir",
        &arg(&out),
        "--fail-on-diff",
        "--no-progress",
    ]);

    assert_eq!(status, EXIT_OK);
    assert_eq!(fs::read_to_string(out.join("t_source1.sql")).unwrap(), "");
}

#[test]
fn test_config_file_supplies_defaults() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner.fixture().create_people_db("db1.duckdb", &[(1, Some("a")), (2, Some("b"))]).unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &[(1, Some("a")), (2, Some("c"))]).unwrap();

    let config_path = runner.fixture().root().join("rowdiff.json");
    let config = serde_json::json!({
        "source1": arg(&db1),
        "source2": arg(&db2),
        "table": "t",
        "filter": "id = 1",
        "duckdb": { "threads": 1 }
    });
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let status = runner.expect_success(&[
        "--config",
        &arg(&config_path),
        "compare",
        "--fail-on-diff",
        "--no-progress",
    ]);
    assert_eq!(status, EXIT_OK);

    // A command line filter overrides the config file
    let status = runner.expect_success(&[
        "--config",
        &arg(&config_path),
        "compare",
        "--filter",
        "id = 2",
        "--fail-on-diff",
        "--no-progress",
    ]);
    assert_eq!(status, EXIT_DIFFERENCES);
}

#[test]
fn test_invalid_config_file() {
    let runner = CliTestRunner::new().unwrap();
    let config_path = runner.fixture().root().join("broken.json");
    fs::write(&config_path, "{ not json").unwrap();

    let err = runner.expect_failure(&["--config", &arg(&config_path), "compare"]);
    assert!(matches!(err, RowdiffError::Config { .. }));
}

#[test]
fn test_missing_table_argument() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner.fixture().create_people_db("db1.duckdb", &[]).unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &[]).unwrap();

    let err = runner.expect_failure(&["compare", &arg(&db1), &arg(&db2), "--no-progress"]);
    assert!(matches!(err, RowdiffError::InvalidInput { .. }));
    assert!(err.to_string().contains("table"));
}

#[test]
fn test_invalid_format_and_mode() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner.fixture().create_people_db("db1.duckdb", &[]).unwrap();
    let db2 = runner.fixture().create_people_db("db2.duckdb", &[]).unwrap();

    let err = runner.expect_failure(&[
        "compare", &arg(&db1), &arg(&db2), "--table", "t", "--format", "xml",
    ]);
    assert!(matches!(err, RowdiffError::InvalidInput { .. }));

    let err = runner.expect_failure(&[
        "compare", &arg(&db1), &arg(&db2), "--table", "t", "--mode", "upsert",
    ]);
    assert!(matches!(err, RowdiffError::InvalidInput { .. }));
}

#[test]
fn test_compare_missing_source_fails() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner.fixture().create_people_db("db1.duckdb", &[]).unwrap();
    let missing = runner.fixture().root().join("missing.duckdb");

    let err = runner.expect_failure(&[
        "compare",
        &arg(&db1),
        &arg(&missing),
        "--table",
        "t",
        "--no-progress",
    ]);
    assert!(matches!(err, RowdiffError::Connection { .. }));
}

#[test]
fn test_tables_command() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner
        .fixture()
        .create_db("db1.duckdb", "CREATE TABLE a (id INTEGER); CREATE TABLE b (id INTEGER);")
        .unwrap();
    let db2 = runner
        .fixture()
        .create_db("db2.duckdb", "CREATE TABLE b (id INTEGER); CREATE TABLE c (id INTEGER);")
        .unwrap();

    assert_eq!(runner.expect_success(&["tables", &arg(&db1), &arg(&db2)]), EXIT_OK);
    assert_eq!(
        runner.expect_success(&["tables", &arg(&db1), &arg(&db2), "--format", "json"]),
        EXIT_OK
    );
}

#[test]
fn test_columns_command() {
    let runner = CliTestRunner::new().unwrap();
    let db1 = runner
        .fixture()
        .create_db("db1.duckdb", "CREATE TABLE t (id INTEGER, name VARCHAR);")
        .unwrap();
    let db2 = runner
        .fixture()
        .create_db("db2.duckdb", "CREATE TABLE t (id INTEGER, email VARCHAR);")
        .unwrap();

    assert_eq!(
        runner.expect_success(&["columns", &arg(&db1), "--table", "t"]),
        EXIT_OK
    );
    assert_eq!(
        runner.expect_success(&[
            "columns",
            &arg(&db1),
            "--table",
            "t",
            "--compare-to",
            &arg(&db2),
            "--format",
            "json",
        ]),
        EXIT_OK
    );

    let err = runner.expect_failure(&["columns", &arg(&db1), "--table", "missing"]);
    assert!(matches!(err, RowdiffError::Query { .. }));
}
