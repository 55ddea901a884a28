use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub user_email: String,
    pub home_team: String,
    pub away_team: String,
    /// Human readable outcome, e.g. "Arsenal Wins" or "Draw".
    pub predicted_result: String,
    pub actual_result: Option<String>,
    pub match_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrediction {
    pub user_email: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_result: String,
    /// Kickoff of the fixture; defaults to the creation time when unknown.
    pub match_date: Option<NaiveDateTime>,
}
