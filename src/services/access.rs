use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;

use crate::db::repository::subscription::is_code_collision;
use crate::db::{Plan, Subscription, SubscriptionRepository};
use crate::error::{AppError, AppResult};

/// Fresh codes drawn per request before giving up on collisions.
const MAX_CODE_ATTEMPTS: usize = 5;

pub struct AccessService;

impl AccessService {
    /// Random 4-digit access code.
    pub fn generate_code() -> String {
        rand::thread_rng().gen_range(1000..=9999).to_string()
    }

    pub fn validate_email(email: &str) -> AppResult<&str> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("Invalid request".to_string()));
        }
        Ok(email)
    }

    /// Issue (or re-issue) an access code for `email` on `plan`.
    ///
    /// An existing lifetime subscription is returned as-is; any other existing
    /// subscription has its plan, code and expiration overwritten.
    pub async fn issue(pool: &SqlitePool, email: &str, plan: &str) -> AppResult<Subscription> {
        let email = Self::validate_email(email)?;
        let plan = Plan::from_str(plan)
            .ok_or_else(|| AppError::Validation("Invalid request".to_string()))?;

        let expires_at = plan.expires_at(Utc::now().naive_utc());

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = Self::generate_code();
            match SubscriptionRepository::upsert_unless_lifetime(pool, email, plan, &code, expires_at)
                .await
            {
                Ok(subscription) => {
                    if subscription.access_code != code && subscription.is_lifetime() {
                        tracing::info!("Returning existing lifetime access code for {}", email);
                    } else {
                        tracing::info!("Issued {} access code for {}", plan.as_str(), email);
                    }
                    return Ok(subscription);
                }
                Err(e) if is_code_collision(&e) => {
                    tracing::debug!("Access code collision on attempt {}; drawing again", attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "could not allocate a unique access code"
        )))
    }

    /// Replace the access code for `email`, keeping its expiration.
    pub async fn regenerate(pool: &SqlitePool, email: &str) -> AppResult<Subscription> {
        let email = Self::validate_email(email)?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = Self::generate_code();
            match SubscriptionRepository::replace_code(pool, email, &code).await {
                Ok(Some(subscription)) => {
                    tracing::info!("Regenerated access code for {}", email);
                    return Ok(subscription);
                }
                // Either no subscription, or the draw equals the current code.
                Ok(None) => {
                    if SubscriptionRepository::find_by_email(pool, email).await?.is_none() {
                        return Err(AppError::NotFound("No active subscription found".to_string()));
                    }
                    tracing::debug!("Drew the current access code on attempt {}; drawing again", attempt);
                }
                Err(e) if is_code_collision(&e) => {
                    tracing::debug!("Access code collision on attempt {}; drawing again", attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "could not allocate a unique access code"
        )))
    }
}
