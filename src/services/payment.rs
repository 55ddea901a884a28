use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};
use crate::services::access::AccessService;

/// Plans that can be bought. `Instant` is a single prediction without a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPlan {
    Instant,
    Monthly,
    Yearly,
    Lifetime,
}

impl PaymentPlan {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "instant" => Some(PaymentPlan::Instant),
            "monthly" => Some(PaymentPlan::Monthly),
            "yearly" => Some(PaymentPlan::Yearly),
            "lifetime" => Some(PaymentPlan::Lifetime),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentPlan::Instant => "instant",
            PaymentPlan::Monthly => "monthly",
            PaymentPlan::Yearly => "yearly",
            PaymentPlan::Lifetime => "lifetime",
        }
    }

    /// Price in whole currency units.
    pub fn price(self) -> u32 {
        match self {
            PaymentPlan::Instant => 4,
            PaymentPlan::Monthly => 17,
            PaymentPlan::Yearly => 204,
            PaymentPlan::Lifetime => 5000,
        }
    }
}

// ============================================================================
// Provider payload types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PaymentPayload {
    pub tx_ref: String,
    pub amount: u32,
    pub currency: String,
    pub redirect_url: String,
    pub payment_options: String,
    pub customer: Customer,
    pub customizations: Customizations,
}

#[derive(Debug, Serialize)]
pub struct Customer {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Customizations {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ProviderResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub data: Option<ProviderData>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderData {
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub payment_link: String,
    /// Provisional code handed out with the checkout; `None` for instant purchases.
    pub access_code: Option<String>,
}

/// Random transaction reference: `trx_` followed by 10 hex characters.
pub fn generate_tx_ref() -> String {
    let bytes: [u8; 5] = rand::random();
    format!("trx_{}", hex::encode(bytes))
}

#[derive(Debug, Clone)]
pub struct PaymentClient {
    client: Client,
    base_url: String,
    secret_key: Option<String>,
    redirect_url: String,
    currency: String,
}

impl PaymentClient {
    pub fn new(config: &PaymentConfig, timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            redirect_url: config.redirect_url.clone(),
            currency: config.currency.clone(),
        })
    }

    pub fn build_payload(&self, email: &str, plan: PaymentPlan, name: Option<&str>) -> PaymentPayload {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Football Fan");

        PaymentPayload {
            tx_ref: generate_tx_ref(),
            amount: plan.price(),
            currency: self.currency.clone(),
            redirect_url: self.redirect_url.clone(),
            payment_options: "card".to_string(),
            customer: Customer {
                email: email.to_string(),
                name: name.to_string(),
            },
            customizations: Customizations {
                title: "Football Prediction Payment".to_string(),
                description: format!("AI football prediction - {} plan.", plan.as_str()),
            },
        }
    }

    /// Create a hosted checkout for `plan_type`. Single attempt, no retries.
    pub async fn initiate(
        &self,
        email: &str,
        plan_type: &str,
        name: Option<&str>,
    ) -> AppResult<Checkout> {
        let plan = PaymentPlan::from_str(plan_type)
            .ok_or_else(|| AppError::Validation("Invalid plan type".to_string()))?;
        let email = AccessService::validate_email(email)?;

        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or_else(|| AppError::Payment("Payment provider is not configured".to_string()))?;

        let payload = self.build_payload(email, plan, name);
        tracing::info!(
            "Initiating {} payment {} for {}",
            plan.as_str(),
            payload.tx_ref,
            email
        );

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .bearer_auth(secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        let link = match (body.status.as_deref(), body.data.and_then(|d| d.link)) {
            (Some("success"), Some(link)) => link,
            _ => {
                tracing::warn!(
                    "Payment provider rejected {}: {}",
                    payload.tx_ref,
                    body.message.unwrap_or_default()
                );
                return Err(AppError::Payment("Payment failed. Try again.".to_string()));
            }
        };

        let access_code = match plan {
            PaymentPlan::Instant => None,
            _ => Some(AccessService::generate_code()),
        };

        Ok(Checkout {
            payment_link: link,
            access_code,
        })
    }
}
