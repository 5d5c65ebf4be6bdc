//! Impact Analyzer
//!
//! "What else goes away if these columns are removed?"
//! Walks the lineage graph downstream of the removed columns and collects every
//! calculated field and relationship that would be left dangling. The walk is
//! transitive: a calculated field built on an affected calculated field (or on
//! an affected relationship) is affected too.

use crate::models::{LineageKind, LineageRef, Model, ModelColumn, Relationship};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Project-wide read set the analysis runs against
#[derive(Debug, Clone, Copy)]
pub struct ImpactContext<'a> {
    pub models: &'a [Model],
    /// Every column of the project's models, base and calculated
    pub columns: &'a [ModelColumn],
    pub calculated_fields: &'a [ModelColumn],
    pub relationships: &'a [Relationship],
}

/// A relationship that loses one of its ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedRelationship {
    #[serde(flatten)]
    pub relationship: Relationship,
    /// Display name of the model on the other side of the join
    pub other_model_display_name: Option<String>,
}

/// Dependents of a set of removed columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedResources {
    pub calculated_fields: Vec<ModelColumn>,
    pub relationships: Vec<AffectedRelationship>,
}

impl AffectedResources {
    pub fn calculated_field_ids(&self) -> Vec<i32> {
        self.calculated_fields.iter().map(|c| c.id).collect()
    }

    pub fn relationship_ids(&self) -> Vec<i32> {
        self.relationships.iter().map(|r| r.relationship.id).collect()
    }

    /// Append the entries of `other` not already present
    pub fn merge(&mut self, other: AffectedResources) {
        let fields: HashSet<i32> = self.calculated_field_ids().into_iter().collect();
        let relationships: HashSet<i32> = self.relationship_ids().into_iter().collect();

        self.calculated_fields
            .extend(other.calculated_fields.into_iter().filter(|c| !fields.contains(&c.id)));
        self.relationships.extend(
            other
                .relationships
                .into_iter()
                .filter(|r| !relationships.contains(&r.relationship.id)),
        );
    }
}

pub struct ImpactAnalyzer;

impl ImpactAnalyzer {
    /// Dependents of `removed_columns` (which belong to `base_model`).
    ///
    /// Results are in discovery order and deduplicated by id. The removed
    /// columns themselves are never reported.
    pub fn affected_resources(
        base_model: &Model,
        removed_columns: &[ModelColumn],
        ctx: &ImpactContext<'_>,
    ) -> AffectedResources {
        let graph = Self::build_dependency_graph(ctx);
        let calculated: HashMap<i32, &ModelColumn> =
            ctx.calculated_fields.iter().map(|c| (c.id, c)).collect();
        let relationships: HashMap<i32, &Relationship> =
            ctx.relationships.iter().map(|r| (r.id, r)).collect();

        let mut visited: HashSet<LineageRef> = HashSet::new();
        let mut queue: VecDeque<LineageRef> = VecDeque::new();
        for column in removed_columns {
            let node = column.lineage_ref();
            if visited.insert(node) {
                queue.push_back(node);
            }
        }

        let mut affected = AffectedResources::default();

        while let Some(node) = queue.pop_front() {
            let Some(dependents) = graph.get(&node) else {
                continue;
            };

            for dependent in dependents {
                if !visited.insert(*dependent) {
                    continue;
                }
                queue.push_back(*dependent);

                match dependent.kind {
                    LineageKind::Column => {
                        if let Some(field) = calculated.get(&dependent.id) {
                            affected.calculated_fields.push((*field).clone());
                        }
                    }
                    LineageKind::Relationship => {
                        if let Some(relationship) = relationships.get(&dependent.id) {
                            affected.relationships.push(AffectedRelationship {
                                relationship: (*relationship).clone(),
                                other_model_display_name: Self::other_model_display_name(
                                    base_model,
                                    relationship,
                                    ctx,
                                ),
                            });
                        }
                    }
                }
            }
        }

        debug!(
            "Removing {} column(s) of model {} affects {} calculated field(s), {} relationship(s)",
            removed_columns.len(),
            base_model.display_name,
            affected.calculated_fields.len(),
            affected.relationships.len()
        );

        affected
    }

    /// Edges from an entity to the entities that depend on it.
    ///
    /// A calculated field depends on its lineage terminus; a relationship
    /// depends on both of its columns.
    fn build_dependency_graph(ctx: &ImpactContext<'_>) -> HashMap<LineageRef, Vec<LineageRef>> {
        let mut graph: HashMap<LineageRef, Vec<LineageRef>> = HashMap::new();

        for field in ctx.calculated_fields {
            if let Some(dependency) = field.dependency() {
                graph.entry(dependency).or_default().push(field.lineage_ref());
            }
        }

        for relationship in ctx.relationships {
            for column_id in [relationship.from_column_id, relationship.to_column_id] {
                graph
                    .entry(LineageRef::column(column_id))
                    .or_default()
                    .push(relationship.lineage_ref());
            }
        }

        graph
    }

    fn other_model_display_name(
        base_model: &Model,
        relationship: &Relationship,
        ctx: &ImpactContext<'_>,
    ) -> Option<String> {
        let model_of = |column_id: i32| {
            ctx.columns
                .iter()
                .find(|c| c.id == column_id)
                .map(|c| c.model_id)
        };

        // Seen from the base model; falls back to the `from` side
        let other = [relationship.from_column_id, relationship.to_column_id]
            .into_iter()
            .find(|id| model_of(*id) == Some(base_model.id))
            .and_then(|id| relationship.other_end(id))
            .unwrap_or(relationship.from_column_id);
        let other = model_of(other)?;

        ctx.models
            .iter()
            .find(|m| m.id == other)
            .map(|m| m.display_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JoinType, Lineage};
    use pretty_assertions::assert_eq;

    fn model(id: i32, display_name: &str) -> Model {
        Model {
            id,
            project_id: 1,
            source_table_name: display_name.to_lowercase(),
            reference_name: display_name.to_string(),
            display_name: display_name.to_string(),
        }
    }

    fn column(id: i32, model_id: i32, name: &str) -> ModelColumn {
        ModelColumn {
            id,
            model_id,
            source_column_name: name.to_string(),
            reference_name: name.to_string(),
            display_name: name.to_string(),
            data_type: "int".to_string(),
            is_calculated: false,
            lineage: None,
        }
    }

    fn calculated(id: i32, model_id: i32, name: &str, lineage: Vec<LineageRef>) -> ModelColumn {
        ModelColumn {
            is_calculated: true,
            lineage: Lineage::new(lineage),
            ..column(id, model_id, name)
        }
    }

    fn relationship(id: i32, from: i32, to: i32) -> Relationship {
        Relationship {
            id,
            project_id: 1,
            name: format!("rel_{}", id),
            from_column_id: from,
            to_column_id: to,
            join_type: JoinType::ManyToOne,
        }
    }

    struct Fixture {
        models: Vec<Model>,
        columns: Vec<ModelColumn>,
        calculated: Vec<ModelColumn>,
        relationships: Vec<Relationship>,
    }

    impl Fixture {
        /// orders(1): id 10, total 11, customer_id 12
        /// customers(2): id 20
        /// F(30) <- total, R(40) orders.customer_id -> customers.id,
        /// G(31) <- R, H(32) <- F, K(33) <- customers.id
        fn new() -> Self {
            let calculated = vec![
                calculated(30, 1, "TotalWithTax", vec![LineageRef::column(11)]),
                calculated(
                    31,
                    1,
                    "CustomerName",
                    vec![LineageRef::column(12), LineageRef::relationship(40)],
                ),
                calculated(32, 1, "TotalRounded", vec![LineageRef::column(30)]),
                calculated(33, 2, "CustomerKey", vec![LineageRef::column(20)]),
            ];
            let mut columns = vec![
                column(10, 1, "id"),
                column(11, 1, "total"),
                column(12, 1, "customer_id"),
                column(20, 2, "id"),
            ];
            columns.extend(calculated.iter().cloned());

            Self {
                models: vec![model(1, "Orders"), model(2, "Customers")],
                columns,
                calculated,
                relationships: vec![relationship(40, 12, 20)],
            }
        }

        fn ctx(&self) -> ImpactContext<'_> {
            ImpactContext {
                models: &self.models,
                columns: &self.columns,
                calculated_fields: &self.calculated,
                relationships: &self.relationships,
            }
        }

        fn column(&self, id: i32) -> ModelColumn {
            self.columns.iter().find(|c| c.id == id).cloned().unwrap()
        }
    }

    #[test]
    fn test_calculated_field_on_removed_column() {
        let f = Fixture::new();
        let affected =
            ImpactAnalyzer::affected_resources(&f.models[0], &[f.column(11)], &f.ctx());

        // F directly, H through F
        assert_eq!(affected.calculated_field_ids(), vec![30, 32]);
        assert!(affected.relationships.is_empty());
    }

    #[test]
    fn test_relationship_and_its_dependents() {
        let f = Fixture::new();
        let affected =
            ImpactAnalyzer::affected_resources(&f.models[0], &[f.column(12)], &f.ctx());

        assert_eq!(affected.relationship_ids(), vec![40]);
        assert_eq!(
            affected.relationships[0].other_model_display_name.as_deref(),
            Some("Customers")
        );
        // G ends in R; K depends on customers.id which is not removed
        assert_eq!(affected.calculated_field_ids(), vec![31]);
    }

    #[test]
    fn test_dedup_across_removed_columns() {
        let f = Fixture::new();
        let affected = ImpactAnalyzer::affected_resources(
            &f.models[0],
            &[f.column(10), f.column(11), f.column(12), f.column(11)],
            &f.ctx(),
        );

        assert_eq!(affected.calculated_field_ids(), vec![30, 32, 31]);
        assert_eq!(affected.relationship_ids(), vec![40]);
    }

    #[test]
    fn test_other_side_seen_from_target_model() {
        let f = Fixture::new();
        let affected =
            ImpactAnalyzer::affected_resources(&f.models[1], &[f.column(20)], &f.ctx());

        assert_eq!(affected.relationship_ids(), vec![40]);
        assert_eq!(
            affected.relationships[0].other_model_display_name.as_deref(),
            Some("Orders")
        );
        assert_eq!(affected.calculated_field_ids(), vec![33, 31]);
    }

    #[test]
    fn test_merge_skips_known_entries() {
        let f = Fixture::new();
        let mut affected =
            ImpactAnalyzer::affected_resources(&f.models[0], &[f.column(11)], &f.ctx());
        let more = ImpactAnalyzer::affected_resources(
            &f.models[0],
            &[f.column(30), f.column(12)],
            &f.ctx(),
        );

        affected.merge(more);

        assert_eq!(affected.calculated_field_ids(), vec![30, 32, 31]);
        assert_eq!(affected.relationship_ids(), vec![40]);
    }

    #[test]
    fn test_untouched_column_has_no_impact() {
        let f = Fixture::new();
        let affected =
            ImpactAnalyzer::affected_resources(&f.models[0], &[f.column(10)], &f.ctx());
        assert_eq!(affected, AffectedResources::default());
    }
}
