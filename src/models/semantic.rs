//! Semantic model entities
//!
//! Models, their columns (base and calculated) and the relationships joining
//! them. These rows are authored by the modeling workflow; the drift engine
//! only reads them and deletes the ones a resolved drift orphans.

use serde::{Deserialize, Serialize};

/// A modeled table backed by one source table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: i32,
    pub project_id: i32,
    pub source_table_name: String,
    pub reference_name: String,
    pub display_name: String,
}

/// Kind of entity a lineage step points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageKind {
    Column,
    Relationship,
}

/// Typed pointer to an upstream entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageRef {
    pub kind: LineageKind,
    pub id: i32,
}

impl LineageRef {
    pub fn column(id: i32) -> Self {
        Self {
            kind: LineageKind::Column,
            id,
        }
    }

    pub fn relationship(id: i32) -> Self {
        Self {
            kind: LineageKind::Relationship,
            id,
        }
    }
}

/// Ordered upstream path of a calculated field.
///
/// Always non-empty; the last step is the entity the field directly depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LineageRef>", into = "Vec<LineageRef>")]
pub struct Lineage {
    steps: Vec<LineageRef>,
}

impl Lineage {
    /// Build a lineage; `None` when no steps are given
    pub fn new(steps: Vec<LineageRef>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self { steps })
        }
    }

    /// The direct dependency of the calculated field
    pub fn terminus(&self) -> LineageRef {
        // Non-empty by construction
        self.steps[self.steps.len() - 1]
    }
}

impl TryFrom<Vec<LineageRef>> for Lineage {
    type Error = String;

    fn try_from(steps: Vec<LineageRef>) -> Result<Self, Self::Error> {
        Lineage::new(steps).ok_or_else(|| "lineage must not be empty".to_string())
    }
}

impl From<Lineage> for Vec<LineageRef> {
    fn from(lineage: Lineage) -> Self {
        lineage.steps
    }
}

/// A column of a model, either mapped to a source column or calculated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelColumn {
    pub id: i32,
    pub model_id: i32,
    pub source_column_name: String,
    pub reference_name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_calculated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
}

impl ModelColumn {
    /// Direct dependency of a calculated field, `None` for base columns
    pub fn dependency(&self) -> Option<LineageRef> {
        if !self.is_calculated {
            return None;
        }
        self.lineage.as_ref().map(Lineage::terminus)
    }

    pub fn lineage_ref(&self) -> LineageRef {
        LineageRef::column(self.id)
    }
}

/// Join cardinality of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl JoinType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ONE_TO_ONE" => Some(JoinType::OneToOne),
            "ONE_TO_MANY" => Some(JoinType::OneToMany),
            "MANY_TO_ONE" => Some(JoinType::ManyToOne),
            "MANY_TO_MANY" => Some(JoinType::ManyToMany),
            _ => None,
        }
    }
}

/// Join between two columns of two distinct models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub from_column_id: i32,
    pub to_column_id: i32,
    pub join_type: JoinType,
}

impl Relationship {
    pub fn touches(&self, column_id: i32) -> bool {
        self.from_column_id == column_id || self.to_column_id == column_id
    }

    /// The column on the other end, if `column_id` is one of the ends
    pub fn other_end(&self, column_id: i32) -> Option<i32> {
        if !self.touches(column_id) {
            return None;
        }
        if self.from_column_id == column_id {
            Some(self.to_column_id)
        } else {
            Some(self.from_column_id)
        }
    }

    pub fn lineage_ref(&self) -> LineageRef {
        LineageRef::relationship(self.id)
    }
}
