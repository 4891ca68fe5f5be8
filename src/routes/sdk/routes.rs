use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::{validate_context, EvaluateRequest, EvaluateResponse, FlagEvaluationResponse};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Evaluate every flag visible to a project (its own plus tenant-level flags)
pub async fn evaluate(
    State(state): State<AppState>,
    Path((tenant_id, project_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<EvaluateRequest>,
) -> AppResult<Json<EvaluateResponse>> {
    let context = request.context;
    validate_context(&context).map_err(AppError::BadRequest)?;

    let flags = state.store.project_flags(tenant_id, project_id).await?;
    let results = state.evaluator.evaluate_all(&flags, &context);

    tracing::debug!(
        %tenant_id,
        %project_id,
        user_id = %context.user_id,
        flags = results.len(),
        enabled = results.values().filter(|enabled| **enabled).count(),
        "Evaluated project flags"
    );

    Ok(Json(EvaluateResponse {
        flags: results,
        evaluated_at: Utc::now(),
    }))
}

/// Evaluate a single flag, 404 if it is not visible to the project
pub async fn evaluate_one(
    State(state): State<AppState>,
    Path((tenant_id, project_id, flag_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<EvaluateRequest>,
) -> AppResult<Json<FlagEvaluationResponse>> {
    let context = request.context;
    validate_context(&context).map_err(AppError::BadRequest)?;

    let flag = state
        .store
        .project_flag(tenant_id, project_id, flag_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Flag '{}' not found", flag_id)))?;

    let outcome = state.evaluator.explain(&flag, &context);

    tracing::debug!(
        %flag_id,
        user_id = %context.user_id,
        ?outcome,
        "Evaluated flag"
    );

    Ok(Json(FlagEvaluationResponse {
        flag_id: flag.id,
        enabled: outcome.is_enabled(),
        reason: outcome.reason(),
        evaluated_at: Utc::now(),
    }))
}
