use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::Subscription;
use crate::error::{AppError, AppResult};
use crate::services::access::AccessService;
use crate::routes::json::ApiJson;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate_access", post(generate_access))
        .route("/regenerate_access", post(regenerate_access))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateAccessRequest {
    pub email: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateAccessRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub access_code: String,
    /// ISO-8601 timestamp, or `"Never"` for lifetime plans.
    pub expires_at: String,
}

pub fn format_expiry(expires_at: Option<NaiveDateTime>) -> String {
    match expires_at {
        Some(at) => at.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        None => "Never".to_string(),
    }
}

impl From<Subscription> for AccessResponse {
    fn from(subscription: Subscription) -> Self {
        Self {
            access_code: subscription.access_code,
            expires_at: format_expiry(subscription.expires_at),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn generate_access(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GenerateAccessRequest>,
) -> AppResult<Json<AccessResponse>> {
    let invalid = || AppError::Validation("Invalid request".to_string());
    let email = body.email.ok_or_else(invalid)?;
    let plan = body.plan.ok_or_else(invalid)?;

    let subscription = AccessService::issue(&state.db, &email, &plan).await?;
    Ok(Json(subscription.into()))
}

async fn regenerate_access(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegenerateAccessRequest>,
) -> AppResult<Json<AccessResponse>> {
    let email = body
        .email
        .ok_or_else(|| AppError::Validation("Invalid request".to_string()))?;

    let subscription = AccessService::regenerate(&state.db, &email).await?;
    Ok(Json(subscription.into()))
}
