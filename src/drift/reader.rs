//! Loads the two schema snapshots compared by the diff engine

use crate::db::{ModelRepository, ProjectRepository};
use crate::error::{not_found_error, AppError};
use crate::introspection::LiveSchemaFetcher;
use crate::models::{ColumnSnapshot, Project, TableSnapshot};
use std::sync::Arc;
use tracing::debug;

pub struct SnapshotReader {
    projects: Arc<dyn ProjectRepository>,
    models: Arc<dyn ModelRepository>,
    live: Arc<dyn LiveSchemaFetcher>,
}

impl SnapshotReader {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        models: Arc<dyn ModelRepository>,
        live: Arc<dyn LiveSchemaFetcher>,
    ) -> Self {
        Self {
            projects,
            models,
            live,
        }
    }

    pub async fn project(&self, project_id: i32) -> Result<Project, AppError> {
        self.projects
            .find_project(project_id)
            .await?
            .ok_or_else(|| not_found_error(format!("Project {} not found", project_id)))
    }

    /// Modeled schema: one table per model, built from its non-calculated columns
    pub async fn current_schema(&self, project_id: i32) -> Result<Vec<TableSnapshot>, AppError> {
        let models = self.models.list_models(project_id).await?;
        let model_ids: Vec<i32> = models.iter().map(|m| m.id).collect();
        let columns = self.models.list_columns(&model_ids).await?;

        let tables: Vec<TableSnapshot> = models
            .iter()
            .map(|model| {
                let columns = columns
                    .iter()
                    .filter(|c| c.model_id == model.id && !c.is_calculated)
                    .map(|c| ColumnSnapshot::new(c.source_column_name.clone(), c.data_type.clone()))
                    .collect();
                TableSnapshot::new(model.source_table_name.clone(), columns)
            })
            .collect();

        debug!("Project {} models {} tables", project_id, tables.len());
        Ok(tables)
    }

    /// Live schema of the project's data source. Fetch errors propagate as is.
    pub async fn live_schema(&self, project_id: i32) -> Result<Vec<TableSnapshot>, AppError> {
        let project = self.project(project_id).await?;
        self.live.fetch_tables(&project).await
    }
}
