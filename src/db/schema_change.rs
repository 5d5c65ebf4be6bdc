// Schema change ledger backed by PostgreSQL
//
// The newest row per project (highest id) is the current record; older rows
// are kept as history.

use super::{queries, SchemaChangeRepository};
use crate::error::AppError;
use crate::models::{ResolveState, SchemaChange, SchemaChangeRecord};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

pub struct PgSchemaChangeRepository {
    pool: Pool,
}

impl PgSchemaChangeRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &Row) -> Result<SchemaChangeRecord, AppError> {
    let id: i32 = row.get("id");
    let change: SchemaChange = serde_json::from_value(row.get("change"))
        .map_err(|e| {
            AppError::Internal(format!("Invalid change on schema change {}: {}", id, e))
        })?;
    let resolve: ResolveState = serde_json::from_value(row.get("resolve"))
        .map_err(|e| {
            AppError::Internal(format!("Invalid resolve on schema change {}: {}", id, e))
        })?;

    Ok(SchemaChangeRecord {
        id,
        project_id: row.get("project_id"),
        change,
        resolve,
        checksum: row.get("checksum"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("Serialization error: {}", e)))
}

#[async_trait]
impl SchemaChangeRepository for PgSchemaChangeRepository {
    async fn find_last(&self, project_id: i32) -> Result<Option<SchemaChangeRecord>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(queries::FIND_LAST_SCHEMA_CHANGE, &[&project_id])
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn create(
        &self,
        project_id: i32,
        change: &SchemaChange,
        resolve: ResolveState,
    ) -> Result<SchemaChangeRecord, AppError> {
        let client = self.pool.get().await?;
        let now = Utc::now();
        let row = client
            .query_one(
                queries::INSERT_SCHEMA_CHANGE,
                &[
                    &project_id,
                    &to_json(change)?,
                    &to_json(&resolve)?,
                    &change.checksum(),
                    &now,
                ],
            )
            .await?;
        record_from_row(&row)
    }

    async fn update_resolve(
        &self,
        record_id: i32,
        resolve: ResolveState,
    ) -> Result<SchemaChangeRecord, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                queries::UPDATE_SCHEMA_CHANGE_RESOLVE,
                &[&record_id, &to_json(&resolve)?, &Utc::now()],
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Schema change {} not found", record_id)))?;
        record_from_row(&row)
    }
}
