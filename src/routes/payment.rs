use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::routes::json::ApiJson;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/payment", post(initiate_payment))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub email: Option<String>,
    pub plan_type: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub message: String,
    pub payment_link: String,
    pub access_code: Option<String>,
}

async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<PaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    let plan_type = body
        .plan_type
        .ok_or_else(|| AppError::Validation("Invalid plan type".to_string()))?;
    let email = body
        .email
        .ok_or_else(|| AppError::Validation("Invalid request".to_string()))?;

    let checkout = state
        .payment
        .initiate(&email, &plan_type, body.name.as_deref())
        .await?;

    Ok(Json(PaymentResponse {
        message: "Payment initiated!".to_string(),
        payment_link: checkout.payment_link,
        access_code: checkout.access_code,
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send, state};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn invalid_plan_is_400() {
        let app = app(state(None).await);
        let (status, body) = send(
            &app,
            "POST",
            "/payment",
            Some(json!({"email": "fan@example.com", "plan_type": "weekly"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid plan type");
    }

    #[tokio::test]
    async fn unconfigured_provider_is_400() {
        let app = app(state(None).await);
        let (status, body) = send(
            &app,
            "POST",
            "/payment",
            Some(json!({"email": "fan@example.com", "plan_type": "monthly"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "PAYMENT_FAILED");
    }
}
