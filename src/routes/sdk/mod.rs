pub mod routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub use crate::evaluation::EvaluationContext;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub context: EvaluationContext,
}

// Bulk result, keyed by flag id
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub flags: HashMap<Uuid, bool>,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FlagEvaluationResponse {
    pub flag_id: Uuid,
    pub enabled: bool,
    pub reason: String,
    pub evaluated_at: DateTime<Utc>,
}

/// The hash key must be present for rollout to stay deterministic per user.
pub fn validate_context(context: &EvaluationContext) -> Result<(), String> {
    if context.user_id.trim().is_empty() {
        return Err("context.user_id cannot be empty".to_string());
    }

    Ok(())
}
