use std::env;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub football_api: FootballApiConfig,
    pub payment: PaymentConfig,
    pub model: ModelConfig,
    pub access: AccessConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS (the deployed frontend).
    pub frontend_url: String,
    /// Directory holding the prebuilt frontend (`index.html` + assets).
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootballApiConfig {
    pub base_url: String,
    /// Sent as `X-Auth-Token`. Requests still go out without it; the API
    /// answers with an error status which the fetcher treats as "no data".
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub base_url: String,
    pub secret_key: Option<String>,
    /// Where the provider sends the customer after checkout.
    pub redirect_url: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path of the serialized forest artifact.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Administrative override accepted by `/predict` in place of a subscription code.
    pub admin_access_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Replenish interval: one request per `per_second` seconds (per IP)
    pub per_second: u32,
    /// Burst size per IP
    pub burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed_var("PORT", 10000)?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "build".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/predictor.db".to_string()),
                max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            football_api: FootballApiConfig {
                base_url: env::var("FOOTBALL_API_URL")
                    .unwrap_or_else(|_| "https://api.football-data.org/v4".to_string()),
                api_key: non_empty_var("FOOTBALL_API_KEY"),
                timeout_seconds: parsed_var("HTTP_TIMEOUT_SECONDS", 30)?,
            },
            payment: PaymentConfig {
                base_url: env::var("PAYMENT_API_URL")
                    .unwrap_or_else(|_| "https://api.flutterwave.com/v3".to_string()),
                secret_key: non_empty_var("FLW_SECRET_KEY"),
                redirect_url: env::var("PAYMENT_REDIRECT_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/payment-success".to_string()),
                currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
            },
            model: ModelConfig {
                path: env::var("MODEL_PATH")
                    .unwrap_or_else(|_| "football_model.json".to_string()),
            },
            access: AccessConfig {
                admin_access_code: non_empty_var("ADMIN_ACCESS_CODE"),
            },
            rate_limit: RateLimitConfig {
                per_second: parsed_var("RATE_LIMIT_PER_SECOND", 2)?,
                burst: parsed_var("RATE_LIMIT_BURST", 20)?,
            },
        })
    }
}

/// Read an optional variable, treating an empty or whitespace-only value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a numeric variable, falling back to `default` only when it is unset.
fn parsed_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    parse_or(name, env::var(name).ok(), default)
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 10000,
                frontend_url: "http://localhost:3000".to_string(),
                static_dir: "build".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/predictor.db".to_string(),
                max_connections: 5,
            },
            football_api: FootballApiConfig {
                base_url: "https://api.football-data.org/v4".to_string(),
                api_key: None,
                timeout_seconds: 30,
            },
            payment: PaymentConfig {
                base_url: "https://api.flutterwave.com/v3".to_string(),
                secret_key: None,
                redirect_url: "http://localhost:3000/payment-success".to_string(),
                currency: "USD".to_string(),
            },
            model: ModelConfig {
                path: "football_model.json".to_string(),
            },
            access: AccessConfig {
                admin_access_code: None,
            },
            rate_limit: RateLimitConfig {
                per_second: 2,
                burst: 20,
            },
        }
    }
}
