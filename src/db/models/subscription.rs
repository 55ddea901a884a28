use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Plan;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub email: String,
    pub plan: String,
    pub access_code: String,
    /// `None` only for lifetime subscriptions.
    pub expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Subscription {
    pub fn plan(&self) -> Option<Plan> {
        Plan::from_str(&self.plan)
    }

    pub fn is_lifetime(&self) -> bool {
        self.plan() == Some(Plan::Lifetime)
    }

    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at < now)
    }
}
