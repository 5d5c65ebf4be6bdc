//! Schema change records and drift categories

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Column projection used for diffing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnSnapshot {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Lightweight table projection, compared between the modeled and live schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnSnapshot>,
}

impl TableSnapshot {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSnapshot>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Drift detected between two schema snapshots.
///
/// Each category is `None` when it holds no tables, so a persisted change only
/// carries the keys that actually drifted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_tables: Option<Vec<TableSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_columns: Option<Vec<TableSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_columns: Option<Vec<TableSnapshot>>,
}

impl SchemaChange {
    pub fn is_empty(&self) -> bool {
        SchemaChangeCategory::ALL
            .iter()
            .all(|category| self.tables(*category).is_empty())
    }

    /// Tables recorded under a category (empty slice when absent)
    pub fn tables(&self, category: SchemaChangeCategory) -> &[TableSnapshot] {
        let tables = match category {
            SchemaChangeCategory::DeletedTables => &self.deleted_tables,
            SchemaChangeCategory::DeletedColumns => &self.deleted_columns,
            SchemaChangeCategory::ModifiedColumns => &self.modified_columns,
        };
        tables.as_deref().unwrap_or(&[])
    }

    /// Categories that carry at least one table
    pub fn categories(&self) -> Vec<SchemaChangeCategory> {
        SchemaChangeCategory::ALL
            .into_iter()
            .filter(|category| !self.tables(*category).is_empty())
            .collect()
    }

    /// SHA-256 of the canonical JSON form, stable for equal changes
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        let canonical = serde_json::to_string(self).unwrap_or_default();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Per-category resolution flags.
///
/// `None` means the category never drifted, `Some(false)` is pending and
/// `Some(true)` is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_tables: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_columns: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_columns: Option<bool>,
}

impl ResolveState {
    /// Initial flags for a freshly recorded change: pending where drift exists
    pub fn pending_for(change: &SchemaChange) -> Self {
        let mut state = Self::default();
        for category in change.categories() {
            state.set(category, false);
        }
        state
    }

    pub fn get(&self, category: SchemaChangeCategory) -> Option<bool> {
        match category {
            SchemaChangeCategory::DeletedTables => self.deleted_tables,
            SchemaChangeCategory::DeletedColumns => self.deleted_columns,
            SchemaChangeCategory::ModifiedColumns => self.modified_columns,
        }
    }

    pub fn set(&mut self, category: SchemaChangeCategory, resolved: bool) {
        let slot = match category {
            SchemaChangeCategory::DeletedTables => &mut self.deleted_tables,
            SchemaChangeCategory::DeletedColumns => &mut self.deleted_columns,
            SchemaChangeCategory::ModifiedColumns => &mut self.modified_columns,
        };
        *slot = Some(resolved);
    }

    pub fn status(&self, category: SchemaChangeCategory) -> ResolutionStatus {
        match self.get(category) {
            None => ResolutionStatus::Absent,
            Some(false) => ResolutionStatus::Pending,
            Some(true) => ResolutionStatus::Resolved,
        }
    }

    pub fn pending(&self) -> Vec<SchemaChangeCategory> {
        SchemaChangeCategory::ALL
            .into_iter()
            .filter(|category| self.status(*category) == ResolutionStatus::Pending)
            .collect()
    }
}

/// Lifecycle of a single category within a change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Absent,
    Pending,
    Resolved,
}

/// Persisted drift ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaChangeRecord {
    pub id: i32,
    pub project_id: i32,
    pub change: SchemaChange,
    pub resolve: ResolveState,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Independently trackable kind of drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaChangeCategory {
    DeletedTables,
    DeletedColumns,
    ModifiedColumns,
}

impl SchemaChangeCategory {
    pub const ALL: [SchemaChangeCategory; 3] = [
        SchemaChangeCategory::DeletedTables,
        SchemaChangeCategory::DeletedColumns,
        SchemaChangeCategory::ModifiedColumns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaChangeCategory::DeletedTables => "deletedTables",
            SchemaChangeCategory::DeletedColumns => "deletedColumns",
            SchemaChangeCategory::ModifiedColumns => "modifiedColumns",
        }
    }
}

impl fmt::Display for SchemaChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaChangeCategory {
    type Err = AppError;

    /// Case-insensitive; accepts `deletedTables`, `DELETED_TABLES` and `deleted_tables`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "deletedtables" => Ok(SchemaChangeCategory::DeletedTables),
            "deletedcolumns" => Ok(SchemaChangeCategory::DeletedColumns),
            "modifiedcolumns" => Ok(SchemaChangeCategory::ModifiedColumns),
            _ => Err(AppError::Validation(format!(
                "Unsupported schema change type: {}",
                s
            ))),
        }
    }
}

/// Categories that have a resolution action.
///
/// Modified columns are informational only, so they cannot be expressed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolvableCategory {
    DeletedTables,
    DeletedColumns,
}

impl ResolvableCategory {
    pub fn category(&self) -> SchemaChangeCategory {
        match self {
            ResolvableCategory::DeletedTables => SchemaChangeCategory::DeletedTables,
            ResolvableCategory::DeletedColumns => SchemaChangeCategory::DeletedColumns,
        }
    }
}

impl fmt::Display for ResolvableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.category().fmt(f)
    }
}

impl TryFrom<SchemaChangeCategory> for ResolvableCategory {
    type Error = AppError;

    fn try_from(category: SchemaChangeCategory) -> Result<Self, Self::Error> {
        match category {
            SchemaChangeCategory::DeletedTables => Ok(ResolvableCategory::DeletedTables),
            SchemaChangeCategory::DeletedColumns => Ok(ResolvableCategory::DeletedColumns),
            SchemaChangeCategory::ModifiedColumns => Err(AppError::Validation(
                "Modified columns have no resolution action".to_string(),
            )),
        }
    }
}

impl FromStr for ResolvableCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SchemaChangeCategory>()?.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orders_change() -> SchemaChange {
        SchemaChange {
            deleted_columns: Some(vec![TableSnapshot::new(
                "orders",
                vec![ColumnSnapshot::new("total", "float")],
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn test_category_parsing_is_case_insensitive() {
        for raw in ["deletedTables", "DELETED_TABLES", "deleted_tables", "DeletedTables"] {
            assert_eq!(
                raw.parse::<SchemaChangeCategory>().unwrap(),
                SchemaChangeCategory::DeletedTables
            );
        }
        assert!("dropped_views".parse::<SchemaChangeCategory>().is_err());
    }

    #[test]
    fn test_modified_columns_is_not_resolvable() {
        let result = "MODIFIED_COLUMNS".parse::<ResolvableCategory>();
        assert!(matches!(result, Err(AppError::Validation(_))));

        let ok = "deletedColumns".parse::<ResolvableCategory>().unwrap();
        assert_eq!(ok, ResolvableCategory::DeletedColumns);
    }

    #[test]
    fn test_pending_flags_follow_non_empty_categories() {
        let resolve = ResolveState::pending_for(&orders_change());

        assert_eq!(resolve.deleted_columns, Some(false));
        assert_eq!(resolve.deleted_tables, None);
        assert_eq!(resolve.modified_columns, None);
        assert_eq!(resolve.pending(), vec![SchemaChangeCategory::DeletedColumns]);
    }

    #[test]
    fn test_change_serializes_only_drifted_categories() {
        let json = serde_json::to_value(orders_change()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "deletedColumns": [
                    { "name": "orders", "columns": [{ "name": "total", "type": "float" }] }
                ]
            })
        );
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(orders_change().checksum(), orders_change().checksum());
        assert_ne!(orders_change().checksum(), SchemaChange::default().checksum());
    }
}
