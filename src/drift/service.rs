//! Schema change service
//!
//! The two engine entry points (detect, resolve) plus the report served to
//! the UI. Detection cycles of one project never overlap.

use super::diff::DiffEngine;
use super::impact::AffectedResources;
use super::ledger::ChangeLedger;
use super::reader::SnapshotReader;
use super::resolution::{ModelImpact, ResolutionCoordinator};
use crate::db::{
    ModelRepository, ProjectRepository, RelationshipRepository, SchemaChangeRepository,
};
use crate::error::AppError;
use crate::introspection::LiveSchemaFetcher;
use crate::models::{
    ColumnSnapshot, ResolutionStatus, ResolvableCategory, ResolveState, SchemaChangeCategory,
    SchemaChangeRecord, TableSnapshot,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// One drifted table as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    pub source_table_name: String,
    pub columns: Vec<ColumnSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_display_name: Option<String>,
    /// Only computed while the category is pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_resources: Option<AffectedResources>,
}

/// The current schema change of a project
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaChangeReport {
    pub id: i32,
    pub deleted_tables: Vec<TableReport>,
    pub deleted_columns: Vec<TableReport>,
    pub modified_columns: Vec<TableReport>,
    pub resolve: ResolveState,
    pub last_schema_change_time: DateTime<Utc>,
}

pub struct SchemaChangeService {
    reader: SnapshotReader,
    ledger: Arc<ChangeLedger>,
    coordinator: ResolutionCoordinator,
    detect_locks: RwLock<HashMap<i32, Arc<Mutex<()>>>>,
}

impl SchemaChangeService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        models: Arc<dyn ModelRepository>,
        relationships: Arc<dyn RelationshipRepository>,
        changes: Arc<dyn SchemaChangeRepository>,
        live: Arc<dyn LiveSchemaFetcher>,
    ) -> Self {
        let ledger = Arc::new(ChangeLedger::new(changes));

        Self {
            reader: SnapshotReader::new(projects, models.clone(), live),
            coordinator: ResolutionCoordinator::new(models, relationships, ledger.clone()),
            ledger,
            detect_locks: RwLock::new(HashMap::new()),
        }
    }

    /// Run one detection cycle. Returns whether drift exists right now.
    pub async fn detect_schema_change(&self, project_id: i32) -> Result<bool, AppError> {
        let lock = self.detect_lock(project_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.detect_cycle(project_id).await
        };
        drop(lock);
        self.release_detect_lock(project_id).await;
        result
    }

    async fn detect_cycle(&self, project_id: i32) -> Result<bool, AppError> {
        let cycle = Uuid::new_v4();
        debug!("Detection cycle {} started for project {}", cycle, project_id);

        let current = self.reader.current_schema(project_id).await?;
        let live = self.reader.live_schema(project_id).await?;

        match DiffEngine::diff(&current, &live) {
            Some(change) => {
                info!(
                    "Detection cycle {}: project {} drifted ({})",
                    cycle,
                    project_id,
                    change
                        .categories()
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                self.ledger.record(project_id, &change).await?;
                Ok(true)
            }
            None => {
                debug!("Detection cycle {}: project {} in sync", cycle, project_id);
                self.ledger.auto_resolve_if_stale(project_id).await?;
                Ok(false)
            }
        }
    }

    /// Resolve one category of the current schema change.
    ///
    /// `change_type` is parsed before any storage access, so unsupported
    /// values never touch the model.
    pub async fn resolve_schema_change(
        &self,
        project_id: i32,
        change_type: &str,
    ) -> Result<SchemaChangeRecord, AppError> {
        let category: ResolvableCategory = change_type.parse()?;
        self.coordinator.resolve(project_id, category).await
    }

    /// The current schema change with its impact, `None` when nothing was recorded
    pub async fn get_last_schema_change(
        &self,
        project_id: i32,
    ) -> Result<Option<SchemaChangeReport>, AppError> {
        self.reader.project(project_id).await?;

        let Some(record) = self.ledger.last(project_id).await? else {
            return Ok(None);
        };

        let mut deleted = HashMap::new();
        for category in [ResolvableCategory::DeletedTables, ResolvableCategory::DeletedColumns] {
            let tables = record.change.tables(category.category());
            let pending =
                record.resolve.status(category.category()) == ResolutionStatus::Pending;
            let reports: Vec<TableReport> = if pending {
                let impacts = self
                    .coordinator
                    .analyze(project_id, category, &record.change)
                    .await?;
                tables
                    .iter()
                    .map(|table| Self::enriched_table(table, &impacts))
                    .collect()
            } else {
                tables.iter().map(Self::plain_table).collect()
            };
            deleted.insert(category, reports);
        }

        Ok(Some(SchemaChangeReport {
            id: record.id,
            deleted_tables: deleted
                .remove(&ResolvableCategory::DeletedTables)
                .unwrap_or_default(),
            deleted_columns: deleted
                .remove(&ResolvableCategory::DeletedColumns)
                .unwrap_or_default(),
            modified_columns: record
                .change
                .tables(SchemaChangeCategory::ModifiedColumns)
                .iter()
                .map(Self::plain_table)
                .collect(),
            resolve: record.resolve,
            last_schema_change_time: record.created_at,
        }))
    }

    async fn detect_lock(&self, project_id: i32) -> Arc<Mutex<()>> {
        if let Some(lock) = self.detect_locks.read().await.get(&project_id) {
            return lock.clone();
        }
        self.detect_locks
            .write()
            .await
            .entry(project_id)
            .or_default()
            .clone()
    }

    /// Forget the project's lock once no other cycle holds or waits on it
    async fn release_detect_lock(&self, project_id: i32) {
        let mut locks = self.detect_locks.write().await;
        if locks
            .get(&project_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&project_id);
        }
    }

    fn plain_table(table: &TableSnapshot) -> TableReport {
        TableReport {
            source_table_name: table.name.clone(),
            columns: table.columns.clone(),
            model_display_name: None,
            affected_resources: None,
        }
    }

    fn enriched_table(table: &TableSnapshot, impacts: &[ModelImpact]) -> TableReport {
        let mut report = Self::plain_table(table);

        for impact in impacts.iter().filter(|i| i.model.source_table_name == table.name) {
            report
                .model_display_name
                .get_or_insert_with(|| impact.model.display_name.clone());
            report
                .affected_resources
                .get_or_insert_with(AffectedResources::default)
                .merge(impact.affected.clone());
        }

        report
    }
}
