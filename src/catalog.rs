//! Table and column discovery across two sources

use crate::error::Result;
use crate::source::ConnectionProvider;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// Tables present in both sources, sorted by name
pub fn common_tables(
    source1: &dyn ConnectionProvider,
    source2: &dyn ConnectionProvider,
) -> Result<Vec<String>> {
    let tables1: BTreeSet<String> = source1.table_names()?.into_iter().collect();
    let tables2: BTreeSet<String> = source2.table_names()?.into_iter().collect();
    log::debug!(
        "{} tables in {}, {} tables in {}",
        tables1.len(),
        source1.name(),
        tables2.len(),
        source2.name()
    );

    Ok(tables1.intersection(&tables2).cloned().collect())
}

/// Columns `SELECT *` yields for a table, in order
pub fn table_columns(source: &dyn ConnectionProvider, table: &str) -> Result<Vec<String>> {
    let columns = source.table_columns(table)?;
    log::debug!("{} columns in {}.{}", columns.len(), source.name(), table);
    Ok(columns)
}

/// Which source carries a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnPresence {
    pub in_source1: bool,
    pub in_source2: bool,
}

/// Column presence across two sources, in source 1 order followed by
/// columns only source 2 has
pub fn column_presence(columns1: &[String], columns2: &[String]) -> IndexMap<String, ColumnPresence> {
    let mut presence = IndexMap::new();
    for column in columns1 {
        presence.insert(
            column.clone(),
            ColumnPresence {
                in_source1: true,
                in_source2: false,
            },
        );
    }
    for column in columns2 {
        presence
            .entry(column.clone())
            .or_insert(ColumnPresence {
                in_source1: false,
                in_source2: false,
            })
            .in_source2 = true;
    }
    presence
}
