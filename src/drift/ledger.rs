//! Change Ledger
//!
//! Persists detected drift as schema change records. The newest record of a
//! project is the current one; a new record is written only when the drift
//! signature differs from it.

use crate::db::SchemaChangeRepository;
use crate::error::AppError;
use crate::models::{ResolveState, SchemaChange, SchemaChangeCategory, SchemaChangeRecord};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ChangeLedger {
    repo: Arc<dyn SchemaChangeRepository>,
}

impl ChangeLedger {
    pub fn new(repo: Arc<dyn SchemaChangeRepository>) -> Self {
        Self { repo }
    }

    pub async fn last(&self, project_id: i32) -> Result<Option<SchemaChangeRecord>, AppError> {
        self.repo.find_last(project_id).await
    }

    /// Store `change` unless it equals the current record's change.
    ///
    /// Returns the new record, or `None` when nothing was written.
    pub async fn record(
        &self,
        project_id: i32,
        change: &SchemaChange,
    ) -> Result<Option<SchemaChangeRecord>, AppError> {
        if let Some(last) = self.repo.find_last(project_id).await? {
            if &last.change == change {
                debug!(
                    "Project {} drift unchanged since record {}",
                    project_id, last.id
                );
                return Ok(None);
            }
        }

        let record = self
            .repo
            .create(project_id, change, ResolveState::pending_for(change))
            .await?;

        info!(
            "Recorded schema change {} for project {} (categories: [{}], checksum {})",
            record.id,
            project_id,
            change
                .categories()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            &record.checksum[..12.min(record.checksum.len())]
        );
        Ok(Some(record))
    }

    /// Flip every pending category of the current record to resolved.
    ///
    /// Called when a detection cycle finds no drift. Returns the updated
    /// record, or `None` when nothing was pending.
    pub async fn auto_resolve_if_stale(
        &self,
        project_id: i32,
    ) -> Result<Option<SchemaChangeRecord>, AppError> {
        let Some(last) = self.repo.find_last(project_id).await? else {
            return Ok(None);
        };

        let pending = last.resolve.pending();
        if pending.is_empty() {
            return Ok(None);
        }

        let mut resolve = last.resolve;
        for category in &pending {
            resolve.set(*category, true);
        }

        let updated = self.repo.update_resolve(last.id, resolve).await?;
        info!(
            "Drift of project {} healed upstream, auto-resolved {} categories on record {}",
            project_id,
            pending.len(),
            last.id
        );
        Ok(Some(updated))
    }

    /// Mark the named categories of the current record resolved
    pub async fn resolve(
        &self,
        project_id: i32,
        categories: &[SchemaChangeCategory],
    ) -> Result<SchemaChangeRecord, AppError> {
        let last = self.repo.find_last(project_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("No schema change recorded for project {}", project_id))
        })?;

        let mut resolve = last.resolve;
        for category in categories {
            resolve.set(*category, true);
        }

        self.repo.update_resolve(last.id, resolve).await
    }
}
