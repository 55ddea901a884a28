use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::error::{AppError, AppResult};
use crate::services::football_data::LiveMatch;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/live_matches", get(live_matches))
}

/// Current live snapshot from the football data provider.
async fn live_matches(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<LiveMatch>>> {
    let matches = state
        .match_feed
        .live_matches()
        .await
        .ok_or(AppError::LiveDataUnavailable)?;

    Ok(Json(matches))
}
