//! Project model
//!
//! A project owns one semantic model and the data source it was built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project represents a semantic model workspace bound to one data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub display_name: String,
    #[serde(skip_serializing)] // Never send credentials to client
    pub connection_string: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
