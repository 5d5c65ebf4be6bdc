//! Metadata store access
//!
//! Repository traits the drift engine depends on, plus their PostgreSQL
//! implementations. The engine only sees the traits, so tests swap in the
//! in-memory store.

pub mod model;
pub mod project;
pub mod queries;
pub mod relationship;
pub mod schema_change;

#[cfg(test)]
pub mod memory;

use crate::error::AppError;
use crate::models::{
    Model, ModelColumn, Project, Relationship, ResolveState, SchemaChange, SchemaChangeRecord,
};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde::Serialize;
use tracing::info;

pub use model::PgModelRepository;
pub use project::PgProjectRepository;
pub use relationship::PgRelationshipRepository;
pub use schema_change::PgSchemaChangeRepository;

/// Ordered deletions for one model, applied as a single transaction.
///
/// Order: calculated fields, relationships, columns, then the model itself
/// (which drops any remaining columns through the foreign key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadePlan {
    pub project_id: i32,
    pub model_id: i32,
    pub model_name: String,
    pub calculated_field_ids: Vec<i32>,
    pub relationship_ids: Vec<i32>,
    pub column_ids: Vec<i32>,
    /// Delete the model itself last, once its source table went away
    pub drop_model: bool,
}

impl CascadePlan {
    pub fn is_empty(&self) -> bool {
        self.calculated_field_ids.is_empty()
            && self.relationship_ids.is_empty()
            && self.column_ids.is_empty()
            && !self.drop_model
    }
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_project(&self, project_id: i32) -> Result<Option<Project>, AppError>;
}

#[async_trait]
pub trait ModelRepository: Send + Sync {
    async fn list_models(&self, project_id: i32) -> Result<Vec<Model>, AppError>;

    /// All columns (base and calculated) of the given models
    async fn list_columns(&self, model_ids: &[i32]) -> Result<Vec<ModelColumn>, AppError>;

    /// Columns of one model matching the given source column names
    async fn list_columns_by_names(
        &self,
        model_id: i32,
        source_column_names: &[String],
    ) -> Result<Vec<ModelColumn>, AppError>;

    /// Every calculated field across the project's models
    async fn list_calculated_fields(&self, project_id: i32) -> Result<Vec<ModelColumn>, AppError>;

    /// Apply a cascade plan atomically
    async fn apply_cascade(&self, plan: &CascadePlan) -> Result<(), AppError>;
}

#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Relationships whose `from` or `to` column is one of `column_ids`
    async fn find_by_column_ids(&self, column_ids: &[i32]) -> Result<Vec<Relationship>, AppError>;
}

#[async_trait]
pub trait SchemaChangeRepository: Send + Sync {
    /// Newest record of the project, if any
    async fn find_last(&self, project_id: i32) -> Result<Option<SchemaChangeRecord>, AppError>;

    async fn create(
        &self,
        project_id: i32,
        change: &SchemaChange,
        resolve: ResolveState,
    ) -> Result<SchemaChangeRecord, AppError>;

    async fn update_resolve(
        &self,
        record_id: i32,
        resolve: ResolveState,
    ) -> Result<SchemaChangeRecord, AppError>;
}

/// Create the metadata tables if they don't exist
pub async fn create_tables(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;

    for statement in queries::CREATE_TABLES {
        client.execute(*statement, &[]).await?;
    }

    info!("✅ Metadata tables initialized");
    Ok(())
}
