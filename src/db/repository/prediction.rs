use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreatePrediction, Prediction};
use crate::error::{AppError, AppResult};

// ============================================================================
// Prediction Repository
// ============================================================================

pub struct PredictionRepository;

impl PredictionRepository {
    pub async fn create(pool: &SqlitePool, prediction: CreatePrediction) -> AppResult<Prediction> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let match_date = prediction.match_date.unwrap_or(now);

        sqlx::query_as::<_, Prediction>(
            r#"
            INSERT INTO predictions (
                id,
                user_email,
                home_team,
                away_team,
                predicted_result,
                actual_result,
                match_date,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
            RETURNING
                id, user_email, home_team, away_team,
                predicted_result, actual_result, match_date, created_at
            "#,
        )
        .bind(&id)
        .bind(&prediction.user_email)
        .bind(&prediction.home_team)
        .bind(&prediction.away_team)
        .bind(&prediction.predicted_result)
        .bind(match_date)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Prediction>> {
        sqlx::query_as::<_, Prediction>(
            r#"
            SELECT
                id, user_email, home_team, away_team,
                predicted_result, actual_result, match_date, created_at
            FROM predictions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// All predictions, newest first
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Prediction>> {
        sqlx::query_as::<_, Prediction>(
            r#"
            SELECT
                id, user_email, home_team, away_team,
                predicted_result, actual_result, match_date, created_at
            FROM predictions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Delete a prediction. Returns `false` when nothing matched `id`.
    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
