//! Comparison sessions: one diff run between two sources
//!
//! A session opens both sources with the same table, filter and
//! projection, counts rows on each side for the progress denominator, runs
//! the positional diff, and releases both sources on every exit path.

use crate::config::SessionConfig;
use crate::engine::{CancelToken, PositionalDiff};
use crate::error::{Result, RowdiffError};
use crate::source::{ConnectionProvider, SourceGuard};
use crate::statement::DiffEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use uuid::Uuid;

/// Outcome of a completed comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub session_id: Uuid,
    pub source1: String,
    pub source2: String,
    pub table: String,
    pub filter: Option<String>,
    pub only_in_source1: Vec<DiffEntry>,
    pub only_in_source2: Vec<DiffEntry>,
    /// Larger of the two row counts, used as the progress denominator
    pub expected_total: u64,
    pub processed_rows: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ComparisonResult {
    pub fn is_identical(&self) -> bool {
        self.only_in_source1.is_empty() && self.only_in_source2.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_identical() {
            format!(
                "All rows of table {} are identical in {} and {}.",
                self.table, self.source1, self.source2
            )
        } else {
            format!(
                "Comparison finished. Found {} differing rows in {} and {} differing rows in {} for table {}.",
                self.only_in_source1.len(),
                self.source1,
                self.only_in_source2.len(),
                self.source2,
                self.table
            )
        }
    }
}

/// Events delivered by a background session, in emission order.
///
/// Exactly one of `Done`, `Failed` or `Cancelled` ends the stream.
#[derive(Debug)]
pub enum SessionEvent {
    Progress(u8),
    Done(ComparisonResult),
    Failed(RowdiffError),
    Cancelled,
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionEvent::Progress(_))
    }
}

pub struct ComparisonSession {
    source1: Arc<dyn ConnectionProvider>,
    source2: Arc<dyn ConnectionProvider>,
    config: SessionConfig,
    cancel: CancelToken,
}

impl ComparisonSession {
    pub fn new(
        source1: Arc<dyn ConnectionProvider>,
        source2: Arc<dyn ConnectionProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            source1,
            source2,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the comparison on the calling thread
    pub fn run<F>(&self, on_progress: F) -> Result<ComparisonResult>
    where
        F: FnMut(u8),
    {
        self.config.validate()?;

        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let name1 = self.source1.name().to_string();
        let name2 = self.source2.name().to_string();

        log::info!(
            "Session {}: comparing table {} between {} and {}",
            session_id,
            self.config.table,
            name1,
            name2
        );

        let mut left = SourceGuard::new(&name1, self.source1.open(&self.config)?);
        let mut right = SourceGuard::new(&name2, self.source2.open(&self.config)?);

        let count1 = left.source_mut().count()?;
        let count2 = right.source_mut().count()?;
        let expected_total = count1.max(count2);
        log::debug!(
            "Session {}: {} rows in {}, {} rows in {}",
            session_id,
            count1,
            left.name(),
            count2,
            right.name()
        );

        let output = PositionalDiff::new(&self.config.table, expected_total, self.cancel.clone())
            .run(left.source_mut(), right.source_mut(), on_progress);

        drop(left);
        drop(right);

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                if e.is_cancelled() {
                    log::info!("Session {} cancelled", session_id);
                } else {
                    log::error!("Session {} failed: {}", session_id, e);
                }
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        log::info!(
            "Session {}: {} rows compared, {} only in {}, {} only in {} ({:.2?})",
            session_id,
            output.processed_rows,
            output.only_in_source1.len(),
            name1,
            output.only_in_source2.len(),
            name2,
            elapsed
        );

        Ok(ComparisonResult {
            session_id,
            source1: name1,
            source2: name2,
            table: self.config.table.clone(),
            filter: self.config.effective_filter().map(str::to_string),
            only_in_source1: output.only_in_source1,
            only_in_source2: output.only_in_source2,
            expected_total,
            processed_rows: output.processed_rows,
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Run the comparison on a worker thread.
    ///
    /// Progress events are forwarded only when the percentage changes.
    pub fn spawn(self) -> Result<SessionHandle> {
        let cancel = self.cancel.clone();
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("rowdiff-session".to_string())
            .spawn(move || {
                let mut last = None;
                let progress_tx = tx.clone();
                let outcome = self.run(|percent| {
                    if last != Some(percent) {
                        last = Some(percent);
                        let _ = progress_tx.send(SessionEvent::Progress(percent));
                    }
                });

                let event = match outcome {
                    Ok(result) => SessionEvent::Done(result),
                    Err(RowdiffError::Cancelled) => SessionEvent::Cancelled,
                    Err(e) => SessionEvent::Failed(e),
                };
                let _ = tx.send(event);
            })?;

        Ok(SessionHandle {
            events: rx,
            cancel,
            handle: Some(handle),
        })
    }
}

/// A session running on a worker thread
pub struct SessionHandle {
    events: Receiver<SessionEvent>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Ask the worker to stop before its next fetch
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Block until the session ends, passing progress to `on_progress`
    pub fn wait<F>(mut self, mut on_progress: F) -> Result<ComparisonResult>
    where
        F: FnMut(u8),
    {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                SessionEvent::Progress(percent) => on_progress(percent),
                SessionEvent::Done(result) => {
                    outcome = Some(Ok(result));
                    break;
                }
                SessionEvent::Failed(e) => {
                    outcome = Some(Err(e));
                    break;
                }
                SessionEvent::Cancelled => {
                    outcome = Some(Err(RowdiffError::Cancelled));
                    break;
                }
            }
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(anyhow::anyhow!("comparison worker panicked").into());
            }
        }

        outcome.unwrap_or_else(|| {
            Err(anyhow::anyhow!("comparison worker stopped without a result").into())
        })
    }
}
