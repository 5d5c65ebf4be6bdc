// Project repository backed by PostgreSQL

use super::{queries, ProjectRepository};
use crate::error::AppError;
use crate::models::Project;
use async_trait::async_trait;
use deadpool_postgres::Pool;

pub struct PgProjectRepository {
    pool: Pool,
}

impl PgProjectRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn find_project(&self, project_id: i32) -> Result<Option<Project>, AppError> {
        let client = self.pool.get().await?;

        let row = client.query_opt(queries::GET_PROJECT, &[&project_id]).await?;

        Ok(row.map(|r| Project {
            id: r.get("id"),
            display_name: r.get("display_name"),
            connection_string: r.get("connection_string"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }
}
