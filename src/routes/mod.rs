use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub mod access;
pub mod admin;
pub mod frontend;
pub mod health;
pub mod json;
pub mod matches;
pub mod payment;
pub mod predict;

/// JSON API routes. Rate limiting, CORS and the static frontend are layered on in `main`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(access::router())
        .merge(matches::router())
        .merge(predict::router())
        .merge(payment::router())
        .nest("/admin", admin::router())
}
