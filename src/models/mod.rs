//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains the semantic model entities, drift records and the
//! request/response structures used by the API.

pub mod project;
pub mod schema_change;
pub mod semantic;

// Re-export commonly used types
pub use project::*;
pub use schema_change::*;
pub use semantic::*;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Message-only response (no data)
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Result of a detection cycle
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub success: bool,
    pub has_schema_change: bool,
}

/// Request to resolve one drift category
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveSchemaChangeRequest {
    #[validate(length(min = 1, message = "Schema change type is required"))]
    #[serde(rename = "type")]
    pub change_type: String,
}
