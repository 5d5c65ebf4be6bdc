//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::connection::DataSourceManager;
use crate::db::{
    PgModelRepository, PgProjectRepository, PgRelationshipRepository, PgSchemaChangeRepository,
};
use crate::drift::SchemaChangeService;
use deadpool_postgres::Pool;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Metadata store connection pool
    pub db_pool: Pool,

    /// Drift detection and resolution engine
    pub schema_changes: SchemaChangeService,
}

impl AppState {
    pub fn new(pool: Pool, data_sources: DataSourceManager) -> Self {
        let schema_changes = SchemaChangeService::new(
            Arc::new(PgProjectRepository::new(pool.clone())),
            Arc::new(PgModelRepository::new(pool.clone())),
            Arc::new(PgRelationshipRepository::new(pool.clone())),
            Arc::new(PgSchemaChangeRepository::new(pool.clone())),
            Arc::new(data_sources),
        );

        Self {
            db_pool: pool,
            schema_changes,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
