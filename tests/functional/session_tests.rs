//! Functional tests for session lifecycle: background runs, cancellation
//! and source failures

use crate::common::TestFixture;
use rowdiff::source::{MemoryProvider, MemoryTable};
use rowdiff::{
    Cell, ComparisonSession, ConnectionProvider, Result, Row, RowSource, RowdiffError,
    SessionConfig, SessionEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn numbered_rows(fixture: &TestFixture, name: &str, count: i64) -> std::path::PathBuf {
    let rows: Vec<(i64, Option<&str>)> = (1..=count).map(|i| (i, Some("row"))).collect();
    fixture.create_people_db(name, &rows).unwrap()
}

#[test]
fn test_spawned_session_event_stream() {
    let fixture = TestFixture::new().unwrap();
    let db1 = numbered_rows(&fixture, "db1.duckdb", 10);
    let db2 = numbered_rows(&fixture, "db2.duckdb", 5);

    let handle = fixture.session(&db1, &db2, SessionConfig::new("t")).unwrap().spawn().unwrap();

    let mut progress = Vec::new();
    let mut terminal = None;
    for event in handle.events().iter() {
        match event {
            SessionEvent::Progress(p) => progress.push(p),
            other => {
                terminal = Some(other);
                break;
            }
        }
    }

    assert_eq!(progress, (1..=10).map(|i| (i * 10) as u8).collect::<Vec<_>>());
    match terminal {
        Some(SessionEvent::Done(result)) => {
            assert_eq!(result.only_in_source1.len(), 5);
            assert!(result.only_in_source2.is_empty());
        }
        other => panic!("Expected Done event, got {:?}", other),
    }
}

#[test]
fn test_cancel_after_progress_stops_the_run() {
    let fixture = TestFixture::new().unwrap();
    let db1 = numbered_rows(&fixture, "db1.duckdb", 100);
    let db2 = fixture.create_people_db("db2.duckdb", &[]).unwrap();

    let session = fixture.session(&db1, &db2, SessionConfig::new("t")).unwrap();
    let cancel = session.cancel_token();

    let mut progress = Vec::new();
    let err = session
        .run(|p| {
            progress.push(p);
            if p >= 10 {
                cancel.cancel();
            }
        })
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(progress.last(), Some(&10));
}

#[test]
fn test_cancelled_handle_reports_cancelled() {
    let fixture = TestFixture::new().unwrap();
    let db1 = numbered_rows(&fixture, "db1.duckdb", 20);
    let db2 = numbered_rows(&fixture, "db2.duckdb", 20);

    let session = fixture.session(&db1, &db2, SessionConfig::new("t")).unwrap();
    session.cancel_token().cancel();

    let err = session.spawn().unwrap().wait(|_| {}).unwrap_err();
    assert!(matches!(err, RowdiffError::Cancelled));
}

#[test]
fn test_failure_is_delivered_through_handle() {
    let fixture = TestFixture::new().unwrap();
    let db1 = numbered_rows(&fixture, "db1.duckdb", 3);
    let missing = fixture.root().join("missing.duckdb");

    let handle = fixture
        .session(&db1, &missing, SessionConfig::new("t"))
        .unwrap()
        .spawn()
        .unwrap();
    let err = handle.wait(|_| {}).unwrap_err();
    assert!(matches!(err, RowdiffError::Connection { .. }));
}

/// Source whose rows do not match its column list
struct MalformedSource {
    columns: Vec<String>,
    rows: Vec<Row>,
    closed: Arc<AtomicUsize>,
}

impl RowSource for MalformedSource {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop())
    }

    fn count(&mut self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MalformedProvider {
    closed: Arc<AtomicUsize>,
}

impl ConnectionProvider for MalformedProvider {
    fn name(&self) -> &str {
        "malformed"
    }

    fn open(&self, _config: &SessionConfig) -> Result<Box<dyn RowSource>> {
        Ok(Box::new(MalformedSource {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![Cell::from(1i64)]],
            closed: Arc::clone(&self.closed),
        }))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        Ok(vec!["t".to_string()])
    }
}

#[test]
fn test_row_shape_mismatch_is_format_error() {
    let closed = Arc::new(AtomicUsize::new(0));
    let good = MemoryProvider::new("memory").with_table("t", MemoryTable::new(["id", "name"]));
    let session = ComparisonSession::new(
        Arc::new(MalformedProvider {
            closed: Arc::clone(&closed),
        }),
        Arc::new(good.clone()),
        SessionConfig::new("t"),
    );

    let err = session.run(|_| {}).unwrap_err();
    assert!(matches!(
        err,
        RowdiffError::FormatMismatch {
            columns: 2,
            cells: 1
        }
    ));
    assert!(closed.load(Ordering::SeqCst) >= 1);
    assert_eq!(good.open_sources(), 0);
}
