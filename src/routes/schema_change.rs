//! Schema change route handlers
//!
//! Detection and resolution of drift between a project's model and its
//! live data source.

use crate::drift::SchemaChangeReport;
use crate::error::{validation_error, ApiResult};
use crate::models::{DetectResponse, MessageResponse, ResolveSchemaChangeRequest, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info};
use validator::Validate;

/// Run a detection cycle for a project
pub async fn detect_schema_change(
    State(state): State<SharedState>,
    Path(project_id): Path<i32>,
) -> ApiResult<Json<DetectResponse>> {
    debug!("Detecting schema change for project {}", project_id);

    let has_schema_change = state.schema_changes.detect_schema_change(project_id).await?;

    Ok(Json(DetectResponse {
        success: true,
        has_schema_change,
    }))
}

/// Resolve one category of the project's current schema change
pub async fn resolve_schema_change(
    State(state): State<SharedState>,
    Path(project_id): Path<i32>,
    Json(payload): Json<ResolveSchemaChangeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let record = state
        .schema_changes
        .resolve_schema_change(project_id, &payload.change_type)
        .await?;

    info!(
        "Schema change {} of project {} resolved ({})",
        record.id, project_id, payload.change_type
    );

    Ok(Json(MessageResponse::new(format!(
        "Schema change '{}' resolved successfully.",
        payload.change_type
    ))))
}

/// Get the project's current schema change and its impact
pub async fn get_schema_change(
    State(state): State<SharedState>,
    Path(project_id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<SchemaChangeReport>>> {
    let report = state.schema_changes.get_last_schema_change(project_id).await?;

    let message = if report.is_some() {
        "Schema change retrieved successfully."
    } else {
        "No schema change recorded."
    };

    Ok(Json(SuccessResponse::new(message, report)))
}
