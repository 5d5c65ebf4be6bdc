//! Schema Diff Engine
//!
//! Compares the modeled schema against the live one. Columns are matched by
//! name, so reordering a source table never counts as drift; a column whose
//! type changed is reported as modified with its live definition.

use crate::models::{ColumnSnapshot, SchemaChange, TableSnapshot};
use std::collections::{HashMap, HashSet};

/// The diff engine
pub struct DiffEngine;

impl DiffEngine {
    /// Diff `current` (modeled) against `live`. `None` means no drift.
    pub fn diff(current: &[TableSnapshot], live: &[TableSnapshot]) -> Option<SchemaChange> {
        let live_tables: HashMap<&str, &TableSnapshot> =
            live.iter().map(|t| (t.name.as_str(), t)).collect();

        let mut deleted_tables = Vec::new();
        let mut deleted_columns = Vec::new();
        let mut modified_columns = Vec::new();

        for table in current {
            let Some(live_table) = live_tables.get(table.name.as_str()) else {
                deleted_tables.push(table.clone());
                continue;
            };

            let (deleted, modified) = Self::diff_columns(table, live_table);

            if !deleted.is_empty() {
                deleted_columns.push(TableSnapshot::new(table.name.clone(), deleted));
            }
            if !modified.is_empty() {
                modified_columns.push(TableSnapshot::new(table.name.clone(), modified));
            }
        }

        let change = SchemaChange {
            deleted_tables: non_empty(deleted_tables),
            deleted_columns: non_empty(deleted_columns),
            modified_columns: non_empty(modified_columns),
        };

        if change.is_empty() {
            None
        } else {
            Some(change)
        }
    }

    /// Returns (deleted, modified) columns of one table.
    ///
    /// Deleted columns carry the modeled definition, modified ones the live
    /// definition.
    fn diff_columns(
        current: &TableSnapshot,
        live: &TableSnapshot,
    ) -> (Vec<ColumnSnapshot>, Vec<ColumnSnapshot>) {
        let live_exact: HashSet<&ColumnSnapshot> = live.columns.iter().collect();
        let live_by_name: HashMap<&str, &ColumnSnapshot> =
            live.columns.iter().map(|c| (c.name.as_str(), c)).collect();

        let mut deleted = Vec::new();
        let mut modified = Vec::new();

        for column in &current.columns {
            if live_exact.contains(column) {
                continue;
            }
            match live_by_name.get(column.name.as_str()) {
                Some(live_column) => modified.push((*live_column).clone()),
                None => deleted.push(column.clone()),
            }
        }

        (deleted, modified)
    }
}

fn non_empty(tables: Vec<TableSnapshot>) -> Option<Vec<TableSnapshot>> {
    if tables.is_empty() {
        None
    } else {
        Some(tables)
    }
}
