// Relationship repository backed by PostgreSQL

use super::{queries, RelationshipRepository};
use crate::error::AppError;
use crate::models::{JoinType, Relationship};
use async_trait::async_trait;
use deadpool_postgres::Pool;

pub struct PgRelationshipRepository {
    pool: Pool,
}

impl PgRelationshipRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationshipRepository for PgRelationshipRepository {
    async fn find_by_column_ids(&self, column_ids: &[i32]) -> Result<Vec<Relationship>, AppError> {
        if column_ids.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let rows = client
            .query(queries::FIND_RELATIONS_BY_COLUMN_IDS, &[&column_ids])
            .await?;

        rows.iter()
            .map(|r| {
                let id: i32 = r.get("id");
                let join_type: String = r.get("join_type");
                let join_type = JoinType::parse(&join_type).ok_or_else(|| {
                    AppError::Internal(format!(
                        "Unknown join type '{}' on relationship {}",
                        join_type, id
                    ))
                })?;

                Ok(Relationship {
                    id,
                    project_id: r.get("project_id"),
                    name: r.get("name"),
                    from_column_id: r.get("from_column_id"),
                    to_column_id: r.get("to_column_id"),
                    join_type,
                })
            })
            .collect()
    }
}
