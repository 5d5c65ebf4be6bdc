//! Resolution Coordinator
//!
//! Turns a pending drift category into per-model cascade plans and applies
//! them. Each model's cascade is one transaction; cascades run concurrently
//! and their outcomes are aggregated before the category is flipped.

use super::impact::{AffectedResources, ImpactAnalyzer, ImpactContext};
use super::ledger::ChangeLedger;
use crate::db::{CascadePlan, ModelRepository, RelationshipRepository};
use crate::error::{conflict_error, not_found_error, AppError};
use crate::models::{
    Model, ModelColumn, ResolutionStatus, ResolvableCategory, SchemaChange, SchemaChangeRecord,
};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What resolving one category means for one model
#[derive(Debug, Clone)]
pub struct ModelImpact {
    pub model: Model,
    /// Columns going away with the drift (all base columns for a dropped table)
    pub removed_columns: Vec<ModelColumn>,
    /// The model's own calculated fields, only set when the whole model goes
    pub own_calculated_fields: Vec<ModelColumn>,
    pub affected: AffectedResources,
    pub drops_model: bool,
}

impl ModelImpact {
    /// Ordered deletions for this model
    pub fn plan(&self) -> CascadePlan {
        let mut calculated_field_ids = self.affected.calculated_field_ids();
        let mut seen: HashSet<i32> = calculated_field_ids.iter().copied().collect();
        for field in &self.own_calculated_fields {
            if seen.insert(field.id) {
                calculated_field_ids.push(field.id);
            }
        }

        CascadePlan {
            project_id: self.model.project_id,
            model_id: self.model.id,
            model_name: self.model.display_name.clone(),
            calculated_field_ids,
            relationship_ids: self.affected.relationship_ids(),
            column_ids: if self.drops_model {
                Vec::new()
            } else {
                self.removed_columns.iter().map(|c| c.id).collect()
            },
            drop_model: self.drops_model,
        }
    }
}

/// Outcome of a batch of per-model cascades
#[derive(Debug, Default)]
pub struct CascadeReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, AppError)>,
}

impl CascadeReport {
    pub fn push(&mut self, model_name: String, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.succeeded.push(model_name),
            Err(e) => self.failed.push((model_name, e)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Ok` when every cascade applied, a partial cascade error otherwise
    pub fn into_result(self, category: ResolvableCategory) -> Result<Vec<String>, AppError> {
        if self.is_complete() {
            return Ok(self.succeeded);
        }

        Err(AppError::PartialCascade {
            category: category.to_string(),
            succeeded: self.succeeded,
            failed: self
                .failed
                .into_iter()
                .map(|(name, e)| format!("{}: {}", name, e))
                .collect(),
        })
    }
}

pub struct ResolutionCoordinator {
    models: Arc<dyn ModelRepository>,
    relationships: Arc<dyn RelationshipRepository>,
    ledger: Arc<ChangeLedger>,
}

impl ResolutionCoordinator {
    pub fn new(
        models: Arc<dyn ModelRepository>,
        relationships: Arc<dyn RelationshipRepository>,
        ledger: Arc<ChangeLedger>,
    ) -> Self {
        Self {
            models,
            relationships,
            ledger,
        }
    }

    /// Cascade the drift of `category` and mark it resolved.
    ///
    /// The flag stays pending if any model's cascade fails.
    pub async fn resolve(
        &self,
        project_id: i32,
        category: ResolvableCategory,
    ) -> Result<SchemaChangeRecord, AppError> {
        let record = self.ledger.last(project_id).await?.ok_or_else(|| {
            not_found_error(format!("No schema change recorded for project {}", project_id))
        })?;

        match record.resolve.status(category.category()) {
            ResolutionStatus::Pending => {}
            ResolutionStatus::Resolved => {
                return Err(conflict_error(format!(
                    "Schema change {} is already resolved",
                    category
                )))
            }
            ResolutionStatus::Absent => {
                return Err(conflict_error(format!(
                    "Nothing to resolve for schema change {}",
                    category
                )))
            }
        }

        let impacts = self.analyze(project_id, category, &record.change).await?;
        let plans: Vec<CascadePlan> = impacts
            .iter()
            .map(ModelImpact::plan)
            .filter(|plan| !plan.is_empty())
            .collect();

        info!(
            "Resolving {} for project {}: {} model cascade(s)",
            category,
            project_id,
            plans.len()
        );

        let report = self.apply_all(&plans).await;
        if !report.is_complete() {
            warn!(
                "Resolving {} for project {} left {} model(s) unresolved",
                category,
                project_id,
                report.failed.len()
            );
        }
        report.into_result(category)?;

        self.ledger.resolve(project_id, &[category.category()]).await
    }

    /// Per-model impact of resolving `category` against the recorded change.
    ///
    /// Reads the project's models, columns, calculated fields and
    /// relationships once; the result is a consistent view for the call.
    pub async fn analyze(
        &self,
        project_id: i32,
        category: ResolvableCategory,
        change: &SchemaChange,
    ) -> Result<Vec<ModelImpact>, AppError> {
        let tables = change.tables(category.category());
        if tables.is_empty() {
            return Ok(Vec::new());
        }

        let models = self.models.list_models(project_id).await?;
        let model_ids: Vec<i32> = models.iter().map(|m| m.id).collect();
        let columns = self.models.list_columns(&model_ids).await?;
        let calculated_fields = self.models.list_calculated_fields(project_id).await?;
        let column_ids: Vec<i32> = columns.iter().map(|c| c.id).collect();
        let relationships = self.relationships.find_by_column_ids(&column_ids).await?;

        let ctx = ImpactContext {
            models: &models,
            columns: &columns,
            calculated_fields: &calculated_fields,
            relationships: &relationships,
        };

        // Models sharing a source table each snapshot it, so one table can be
        // recorded more than once
        let mut removed: Vec<(&str, Vec<String>)> = Vec::new();
        for table in tables {
            match removed.iter_mut().find(|(name, _)| *name == table.name) {
                Some((_, column_names)) => column_names.extend(table.column_names()),
                None => removed.push((table.name.as_str(), table.column_names())),
            }
        }

        let mut impacts = Vec::new();

        for (table_name, column_names) in &removed {
            for model in models.iter().filter(|m| m.source_table_name == *table_name) {
                let impact = match category {
                    ResolvableCategory::DeletedTables => {
                        let (own_calculated_fields, removed_columns): (Vec<_>, Vec<_>) = columns
                            .iter()
                            .filter(|c| c.model_id == model.id)
                            .cloned()
                            .partition(|c| c.is_calculated);

                        // The model's calculated fields go too, so their
                        // dependents are part of the cascade
                        let mut affected =
                            ImpactAnalyzer::affected_resources(model, &removed_columns, &ctx);
                        affected.merge(ImpactAnalyzer::affected_resources(
                            model,
                            &own_calculated_fields,
                            &ctx,
                        ));

                        ModelImpact {
                            affected,
                            model: model.clone(),
                            removed_columns,
                            own_calculated_fields,
                            drops_model: true,
                        }
                    }
                    ResolvableCategory::DeletedColumns => {
                        let removed_columns: Vec<ModelColumn> = self
                            .models
                            .list_columns_by_names(model.id, column_names)
                            .await?
                            .into_iter()
                            .filter(|c| !c.is_calculated)
                            .collect();

                        ModelImpact {
                            affected: ImpactAnalyzer::affected_resources(
                                model,
                                &removed_columns,
                                &ctx,
                            ),
                            model: model.clone(),
                            removed_columns,
                            own_calculated_fields: Vec::new(),
                            drops_model: false,
                        }
                    }
                };
                impacts.push(impact);
            }
        }

        Ok(impacts)
    }

    /// Apply every plan concurrently and collect the outcomes
    async fn apply_all(&self, plans: &[CascadePlan]) -> CascadeReport {
        let results = join_all(plans.iter().map(|plan| async move {
            let result = self.models.apply_cascade(plan).await;
            if let Err(e) = &result {
                error!("Cascade for model {} failed: {}", plan.model_name, e);
            }
            (plan.model_name.clone(), result)
        }))
        .await;

        let mut report = CascadeReport::default();
        for (model_name, result) in results {
            report.push(model_name, result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_without_failures() {
        let mut report = CascadeReport::default();
        report.push("Orders".to_string(), Ok(()));

        assert!(report.is_complete());
        assert_eq!(
            report.into_result(ResolvableCategory::DeletedTables).unwrap(),
            vec!["Orders".to_string()]
        );
    }

    #[test]
    fn test_report_with_failure_is_partial() {
        let mut report = CascadeReport::default();
        report.push("Orders".to_string(), Ok(()));
        report.push(
            "Customers".to_string(),
            Err(AppError::Internal("lock timeout".to_string())),
        );

        match report.into_result(ResolvableCategory::DeletedColumns) {
            Err(AppError::PartialCascade {
                category,
                succeeded,
                failed,
            }) => {
                assert_eq!(category, "deletedColumns");
                assert_eq!(succeeded, vec!["Orders".to_string()]);
                assert_eq!(failed.len(), 1);
                assert!(failed[0].starts_with("Customers: "));
            }
            other => panic!("expected partial cascade, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_for_dropped_model_dedups_calculated_fields() {
        let model = Model {
            id: 1,
            project_id: 9,
            source_table_name: "orders".to_string(),
            reference_name: "orders".to_string(),
            display_name: "Orders".to_string(),
        };
        let field = |id: i32| ModelColumn {
            id,
            model_id: 1,
            source_column_name: format!("f{}", id),
            reference_name: format!("f{}", id),
            display_name: format!("f{}", id),
            data_type: "float".to_string(),
            is_calculated: true,
            lineage: None,
        };

        let impact = ModelImpact {
            model,
            removed_columns: Vec::new(),
            own_calculated_fields: vec![field(5), field(6)],
            affected: AffectedResources {
                calculated_fields: vec![field(6), field(8)],
                relationships: Vec::new(),
            },
            drops_model: true,
        };

        let plan = impact.plan();
        assert_eq!(plan.calculated_field_ids, vec![6, 8, 5]);
        assert!(plan.column_ids.is_empty());
        assert!(plan.drop_model);
    }
}
