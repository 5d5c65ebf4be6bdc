// Model and column repository backed by PostgreSQL

use super::{queries, CascadePlan, ModelRepository};
use crate::error::AppError;
use crate::models::{Lineage, Model, ModelColumn};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::debug;

pub struct PgModelRepository {
    pool: Pool,
}

impl PgModelRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn model_from_row(row: &Row) -> Model {
    Model {
        id: row.get("id"),
        project_id: row.get("project_id"),
        source_table_name: row.get("source_table_name"),
        reference_name: row.get("reference_name"),
        display_name: row.get("display_name"),
    }
}

fn column_from_row(row: &Row) -> Result<ModelColumn, AppError> {
    let id: i32 = row.get("id");
    let lineage = row
        .get::<_, Option<serde_json::Value>>("lineage")
        .map(serde_json::from_value::<Lineage>)
        .transpose()
        .map_err(|e| AppError::Internal(format!("Invalid lineage on column {}: {}", id, e)))?;

    Ok(ModelColumn {
        id,
        model_id: row.get("model_id"),
        source_column_name: row.get("source_column_name"),
        reference_name: row.get("reference_name"),
        display_name: row.get("display_name"),
        data_type: row.get("type"),
        is_calculated: row.get("is_calculated"),
        lineage,
    })
}

#[async_trait]
impl ModelRepository for PgModelRepository {
    async fn list_models(&self, project_id: i32) -> Result<Vec<Model>, AppError> {
        let client = self.pool.get().await?;
        let rows = client.query(queries::LIST_MODELS_BY_PROJECT, &[&project_id]).await?;
        Ok(rows.iter().map(model_from_row).collect())
    }

    async fn list_columns(&self, model_ids: &[i32]) -> Result<Vec<ModelColumn>, AppError> {
        if model_ids.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let rows = client.query(queries::LIST_COLUMNS_BY_MODEL_IDS, &[&model_ids]).await?;
        rows.iter().map(column_from_row).collect()
    }

    async fn list_columns_by_names(
        &self,
        model_id: i32,
        source_column_names: &[String],
    ) -> Result<Vec<ModelColumn>, AppError> {
        if source_column_names.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let rows = client
            .query(queries::LIST_COLUMNS_BY_NAMES, &[&model_id, &source_column_names])
            .await?;
        rows.iter().map(column_from_row).collect()
    }

    async fn list_calculated_fields(&self, project_id: i32) -> Result<Vec<ModelColumn>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(queries::LIST_CALCULATED_FIELDS_BY_PROJECT, &[&project_id])
            .await?;
        rows.iter().map(column_from_row).collect()
    }

    async fn apply_cascade(&self, plan: &CascadePlan) -> Result<(), AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let calculated = tx
            .execute(queries::DELETE_COLUMNS_BY_IDS, &[&plan.calculated_field_ids])
            .await?;
        let relations = tx
            .execute(queries::DELETE_RELATIONS_BY_IDS, &[&plan.relationship_ids])
            .await?;
        let columns = tx
            .execute(queries::DELETE_COLUMNS_BY_IDS, &[&plan.column_ids])
            .await?;
        let models = if plan.drop_model {
            tx.execute(queries::DELETE_MODEL_BY_ID, &[&plan.model_id]).await?
        } else {
            0
        };

        tx.commit().await?;

        debug!(
            "Cascade for model {} removed {} calculated fields, {} relationships, {} columns, \
             {} models",
            plan.model_name, calculated, relations, columns, models
        );
        Ok(())
    }
}
