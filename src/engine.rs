//! Positional diff of two row sources read in lockstep
//!
//! Row N of the first source is compared only with row N of the second,
//! whatever their content. Sources must therefore return rows in a stable,
//! comparable order; an inserted or deleted row shifts every following
//! position and shows up as a difference on both sides.

use crate::error::{Result, RowdiffError};
use crate::source::RowSource;
use crate::statement::{DiffEntry, Side};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller sets to abort a running comparison
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Rows that differ at the same position, per side, in scan order
#[derive(Debug, Clone, Default)]
pub struct DiffOutput {
    pub only_in_source1: Vec<DiffEntry>,
    pub only_in_source2: Vec<DiffEntry>,
    /// Positions where at least one side produced a row
    pub processed_rows: u64,
}

/// Percentage of `expected_total` covered by `processed`, capped at 100
pub fn progress_percent(processed: u64, expected_total: u64) -> u8 {
    if expected_total == 0 {
        return 100;
    }
    let percent = (processed as u128 * 100) / expected_total as u128;
    percent.min(100) as u8
}

pub struct PositionalDiff<'a> {
    table: &'a str,
    expected_total: u64,
    cancel: CancelToken,
}

impl<'a> PositionalDiff<'a> {
    pub fn new(table: &'a str, expected_total: u64, cancel: CancelToken) -> Self {
        Self {
            table,
            expected_total,
            cancel,
        }
    }

    /// Drive both sources to exhaustion.
    ///
    /// `on_progress` receives a percentage after every position. Nothing is
    /// reported when `expected_total` is zero. The cancel token is checked
    /// before each fetch; a cancelled run returns `RowdiffError::Cancelled`.
    pub fn run<F>(
        &self,
        left: &mut dyn RowSource,
        right: &mut dyn RowSource,
        mut on_progress: F,
    ) -> Result<DiffOutput>
    where
        F: FnMut(u8),
    {
        let mut output = DiffOutput::default();

        loop {
            if self.cancel.is_cancelled() {
                log::debug!("Diff of {} cancelled after {} rows", self.table, output.processed_rows);
                return Err(RowdiffError::Cancelled);
            }

            let left_row = left.next_row()?;
            let right_row = right.next_row()?;

            if left_row.is_none() && right_row.is_none() {
                break;
            }

            output.processed_rows += 1;
            if self.expected_total > 0 {
                on_progress(progress_percent(output.processed_rows, self.expected_total));
            }

            if left_row == right_row {
                continue;
            }

            if let Some(row) = left_row {
                output.only_in_source1.push(DiffEntry::new(
                    Side::Source1,
                    self.table,
                    left.column_names(),
                    row,
                )?);
            }
            if let Some(row) = right_row {
                output.only_in_source2.push(DiffEntry::new(
                    Side::Source2,
                    self.table,
                    right.column_names(),
                    row,
                )?);
            }
        }

        Ok(output)
    }
}
