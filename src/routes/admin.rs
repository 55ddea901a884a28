use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::{Prediction, PredictionRepository, Subscription, SubscriptionRepository};
use crate::error::{AppError, AppResult};
use crate::routes::json::ApiJson;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/delete_prediction", post(delete_prediction))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub subscribers: Vec<SubscriberResponse>,
    pub predictions: Vec<PredictionResponse>,
}

#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    pub email: String,
    pub plan: String,
    pub access_code: String,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<Subscription> for SubscriberResponse {
    fn from(s: Subscription) -> Self {
        Self {
            email: s.email,
            plan: s.plan,
            access_code: s.access_code,
            expires_at: s.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub id: String,
    pub user_email: String,
    pub home_team: String,
    pub away_team: String,
    /// Outcome label, e.g. "Arsenal Wins" or "Draw".
    pub predicted_score: String,
    pub actual_result: Option<String>,
    pub match_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl From<Prediction> for PredictionResponse {
    fn from(p: Prediction) -> Self {
        Self {
            id: p.id,
            user_email: p.user_email,
            home_team: p.home_team,
            away_team: p.away_team,
            predicted_score: p.predicted_result,
            actual_result: p.actual_result,
            match_date: p.match_date,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeletePredictionRequest {
    pub prediction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn prediction_not_found() -> AppError {
    AppError::NotFound("Prediction not found".to_string())
}

// ============================================================================
// Handlers
// ============================================================================

async fn dashboard(State(state): State<Arc<AppState>>) -> AppResult<Json<DashboardResponse>> {
    let subscribers = SubscriptionRepository::list_all(&state.db).await?;
    let predictions = PredictionRepository::list_all(&state.db).await?;

    Ok(Json(DashboardResponse {
        subscribers: subscribers.into_iter().map(Into::into).collect(),
        predictions: predictions.into_iter().map(Into::into).collect(),
    }))
}

async fn delete_prediction(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<DeletePredictionRequest>,
) -> AppResult<Json<MessageResponse>> {
    let id = body.prediction_id.ok_or_else(prediction_not_found)?;
    let prediction = PredictionRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(prediction_not_found)?;

    if !PredictionRepository::delete(&state.db, &prediction.id).await? {
        return Err(prediction_not_found());
    }

    tracing::info!(
        "Deleted prediction {} ({} vs {})",
        prediction.id,
        prediction.home_team,
        prediction.away_team
    );
    Ok(Json(MessageResponse {
        message: "Prediction deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::db::{CreatePrediction, PredictionRepository};
    use crate::routes::test_support::{app, send, state};
    use crate::services::access::AccessService;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn seed(state: &std::sync::Arc<crate::AppState>) -> String {
        AccessService::issue(&state.db, "fan@example.com", "lifetime")
            .await
            .unwrap();
        PredictionRepository::create(
            &state.db,
            CreatePrediction {
                user_email: "fan@example.com".to_string(),
                home_team: "Arsenal".to_string(),
                away_team: "Chelsea".to_string(),
                predicted_result: "Arsenal Wins".to_string(),
                match_date: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn dashboard_lists_everything() {
        let state = state(None).await;
        let id = seed(&state).await;
        let app = app(state);

        let (status, body) = send(&app, "GET", "/admin", None).await;
        assert_eq!(status, StatusCode::OK);

        let subscribers = body["subscribers"].as_array().unwrap();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0]["plan"], "lifetime");
        assert!(subscribers[0]["expires_at"].is_null());

        let predictions = body["predictions"].as_array().unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0]["id"], id.as_str());
        assert_eq!(predictions[0]["predicted_score"], "Arsenal Wins");
        assert!(predictions[0]["actual_result"].is_null());
    }

    #[tokio::test]
    async fn deletes_predictions_once() {
        let state = state(None).await;
        let id = seed(&state).await;
        let app = app(state);

        let (status, body) = send(
            &app,
            "POST",
            "/admin/delete_prediction",
            Some(json!({"prediction_id": id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Prediction deleted successfully");

        let (status, body) = send(
            &app,
            "POST",
            "/admin/delete_prediction",
            Some(json!({"prediction_id": id})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Prediction not found");
    }
}
