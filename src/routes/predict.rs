use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::prediction::{PredictionOutcome, PredictionRequest, PredictionService};
use crate::routes::json::ApiJson;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/predict", post(predict))
}

/// Fields are optional so that an absent key reports the same 400 as a blank one.
#[derive(Debug, Deserialize)]
pub struct PredictBody {
    pub email: Option<String>,
    pub access_code: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
}

impl From<PredictBody> for PredictionRequest {
    fn from(body: PredictBody) -> Self {
        Self {
            email: body.email,
            access_code: body.access_code,
            home_team: body.home_team,
            away_team: body.away_team,
        }
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<PredictBody>,
) -> AppResult<Json<PredictionOutcome>> {
    let (outcome, _stored) = PredictionService::predict(&state, body.into()).await?;
    Ok(Json(outcome))
}
