//! Schema Drift Module
//!
//! Keeps a project's semantic model in line with its live data source:
//! - Snapshot reading (modeled vs live tables)
//! - Diffing into deleted tables, deleted columns and modified columns
//! - A ledger of schema changes with per-category resolution flags
//! - Impact analysis over calculated-field lineage and relationships
//! - Cascading resolution of deleted tables and columns

pub mod diff;
pub mod impact;
pub mod ledger;
pub mod reader;
pub mod resolution;
pub mod service;

pub use service::{SchemaChangeReport, SchemaChangeService};
