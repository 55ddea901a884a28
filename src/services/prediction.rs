//! Prediction pipeline: validate -> authorize -> fetch stats -> infer -> persist.
//!
//! Every stage reports through [`PredictError`], which maps onto the HTTP
//! contract (400 / 403 / 500) in one place.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::db::{CreatePrediction, Prediction, PredictionRepository, Subscription, SubscriptionRepository};
use crate::error::AppError;
use crate::services::classifier::{ModelError, Outcome};
use crate::services::football_data::{find_fixture, LiveMatch};
use crate::AppState;

/// Access code for one-off unpaid predictions; skips subscription lookup.
pub const INSTANT_ACCESS_CODE: &str = "instant";

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid or expired access code")]
    Unauthorized,

    #[error("No live data found for this match")]
    NoMatchData,

    #[error("AI model not available. Please train it first!")]
    ModelUnavailable,

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("model produced unknown class {0}")]
    UnknownClass(u8),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::MissingFields => AppError::Validation(err.to_string()),
            PredictError::Unauthorized => AppError::Forbidden(err.to_string()),
            PredictError::NoMatchData => AppError::NoMatchData(err.to_string()),
            PredictError::ModelUnavailable => AppError::ModelUnavailable,
            PredictError::Model(e) => AppError::Internal(e.into()),
            PredictError::UnknownClass(_) => AppError::Internal(anyhow::anyhow!(err.to_string())),
            PredictError::Storage(e) => e,
        }
    }
}

/// Raw request fields; any of them may be absent or blank.
#[derive(Debug, Default, Clone)]
pub struct PredictionRequest {
    pub email: Option<String>,
    pub access_code: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub email: String,
    pub access_code: String,
    pub home_team: String,
    pub away_team: String,
}

/// How a request got past the access check.
#[derive(Debug, Clone)]
pub enum Authorization {
    Instant,
    Admin,
    Subscriber(Subscription),
}

impl Authorization {
    /// Short label for logs; never includes the code itself.
    pub fn kind(&self) -> &str {
        match self {
            Authorization::Instant => "instant",
            Authorization::Admin => "admin",
            Authorization::Subscriber(subscription) => &subscription.plan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    pub home_team: String,
    pub away_team: String,
    pub predicted_winner: String,
}

/// Goal counts the classifier consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchStats {
    pub home_goals: i64,
    pub away_goals: i64,
}

impl MatchStats {
    pub fn features(&self) -> [f64; 2] {
        [self.home_goals as f64, self.away_goals as f64]
    }
}

impl From<&LiveMatch> for MatchStats {
    fn from(m: &LiveMatch) -> Self {
        Self {
            home_goals: m.home_team_score,
            away_goals: m.away_team_score,
        }
    }
}

fn required(value: Option<String>) -> Result<String, PredictError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(PredictError::MissingFields)
}

pub struct PredictionService;

impl PredictionService {
    pub fn validate(request: PredictionRequest) -> Result<ValidatedRequest, PredictError> {
        Ok(ValidatedRequest {
            email: required(request.email)?,
            access_code: required(request.access_code)?,
            home_team: required(request.home_team)?,
            away_team: required(request.away_team)?,
        })
    }

    pub async fn authorize(
        state: &Arc<AppState>,
        email: &str,
        access_code: &str,
    ) -> Result<Authorization, PredictError> {
        if access_code == INSTANT_ACCESS_CODE {
            return Ok(Authorization::Instant);
        }

        if state.config.access.admin_access_code.as_deref() == Some(access_code) {
            return Ok(Authorization::Admin);
        }

        let subscription =
            SubscriptionRepository::find_by_email_and_code(&state.db, email, access_code)
                .await?
                .ok_or(PredictError::Unauthorized)?;

        if subscription.is_expired_at(Utc::now().naive_utc()) {
            tracing::info!("Rejected expired access code for {}", email);
            return Err(PredictError::Unauthorized);
        }

        Ok(Authorization::Subscriber(subscription))
    }

    /// Look the fixture up in the current live snapshot.
    pub async fn fetch_stats(
        state: &Arc<AppState>,
        home_team: &str,
        away_team: &str,
    ) -> Result<LiveMatch, PredictError> {
        let matches = state
            .match_feed
            .live_matches()
            .await
            .ok_or(PredictError::NoMatchData)?;

        find_fixture(&matches, home_team, away_team)
            .cloned()
            .ok_or(PredictError::NoMatchData)
    }

    pub fn infer(state: &Arc<AppState>, stats: MatchStats) -> Result<Outcome, PredictError> {
        let classifier = state
            .classifier
            .as_ref()
            .ok_or(PredictError::ModelUnavailable)?;

        let class = classifier.predict(&stats.features())?;
        Outcome::from_class(class).ok_or(PredictError::UnknownClass(class))
    }

    /// Run the full pipeline and persist the result.
    pub async fn predict(
        state: &Arc<AppState>,
        request: PredictionRequest,
    ) -> Result<(PredictionOutcome, Prediction), PredictError> {
        let request = Self::validate(request)?;

        if state.classifier.is_none() {
            return Err(PredictError::ModelUnavailable);
        }

        let authorization = Self::authorize(state, &request.email, &request.access_code).await?;
        tracing::debug!(
            "Prediction authorized for {} via {}",
            request.email,
            authorization.kind()
        );

        let fixture = Self::fetch_stats(state, &request.home_team, &request.away_team).await?;
        let outcome = Self::infer(state, MatchStats::from(&fixture))?;
        let predicted_winner = outcome.label(&request.home_team, &request.away_team);

        let stored = PredictionRepository::create(
            &state.db,
            CreatePrediction {
                user_email: request.email,
                home_team: request.home_team.clone(),
                away_team: request.away_team.clone(),
                predicted_result: predicted_winner.clone(),
                match_date: fixture.utc_date.map(|d| d.naive_utc()),
            },
        )
        .await?;

        tracing::info!(
            "Predicted {} vs {}: {}",
            request.home_team,
            request.away_team,
            predicted_winner
        );

        Ok((
            PredictionOutcome {
                home_team: request.home_team,
                away_team: request.away_team,
                predicted_winner,
            },
            stored,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{test_pool, Plan};
    use crate::services::classifier::Classifier;
    use crate::services::football_data::MatchFeed;
    use crate::services::payment::PaymentClient;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFeed {
        matches: Option<Vec<LiveMatch>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MatchFeed for StubFeed {
        async fn live_matches(&self) -> Option<Vec<LiveMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.matches.clone()
        }
    }

    /// Home win when the home side leads, away win when trailing, else draw.
    struct LeaderClassifier;

    impl Classifier for LeaderClassifier {
        fn predict(&self, features: &[f64]) -> Result<u8, ModelError> {
            Ok(if features[0] > features[1] {
                1
            } else if features[0] < features[1] {
                0
            } else {
                2
            })
        }
    }

    fn arsenal_chelsea(home: i64, away: i64) -> LiveMatch {
        LiveMatch {
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_team_score: home,
            away_team_score: away,
            winner: Outcome::Draw,
            utc_date: None,
        }
    }

    async fn state_with(
        matches: Option<Vec<LiveMatch>>,
        with_model: bool,
    ) -> (Arc<AppState>, Arc<StubFeed>) {
        let mut config = Config::default();
        config.access.admin_access_code = Some("0000".to_string());

        let feed = Arc::new(StubFeed {
            matches,
            calls: AtomicUsize::new(0),
        });
        let classifier: Option<Arc<dyn Classifier>> = if with_model {
            Some(Arc::new(LeaderClassifier))
        } else {
            None
        };

        let state = Arc::new(AppState {
            db: test_pool().await,
            payment: PaymentClient::new(&config.payment, config.football_api.timeout_seconds)
                .unwrap(),
            config,
            match_feed: feed.clone(),
            classifier,
        });
        (state, feed)
    }

    fn request(code: &str, home: &str, away: &str) -> PredictionRequest {
        PredictionRequest {
            email: Some("fan@example.com".to_string()),
            access_code: Some(code.to_string()),
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
        }
    }

    #[tokio::test]
    async fn instant_code_skips_authorization() {
        let (state, feed) = state_with(Some(vec![arsenal_chelsea(2, 0)]), true).await;

        let (outcome, stored) = PredictionService::predict(&state, request("instant", "Arsenal", "Chelsea"))
            .await
            .unwrap();

        assert_eq!(outcome.predicted_winner, "Arsenal Wins");
        assert_eq!(stored.predicted_result, "Arsenal Wins");
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let (state, feed) = state_with(Some(vec![arsenal_chelsea(2, 0)]), true).await;

        let mut req = request("instant", "Arsenal", "Chelsea");
        req.away_team = None;
        let err = PredictionService::predict(&state, req).await.unwrap_err();
        assert!(matches!(err, PredictError::MissingFields));

        let mut req = request("instant", "Arsenal", "Chelsea");
        req.email = Some("   ".to_string());
        assert!(matches!(
            PredictionService::predict(&state, req).await,
            Err(PredictError::MissingFields)
        ));

        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            AppError::from(PredictError::MissingFields),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn expired_subscription_is_rejected() {
        let (state, feed) = state_with(Some(vec![arsenal_chelsea(1, 1)]), true).await;
        let past = Utc::now().naive_utc() - Duration::days(1);
        SubscriptionRepository::upsert_unless_lifetime(
            &state.db,
            "fan@example.com",
            Plan::Monthly,
            "4321",
            Some(past),
        )
        .await
        .unwrap();

        let err = PredictionService::predict(&state, request("4321", "Arsenal", "Chelsea"))
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Unauthorized));
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let (state, _) = state_with(Some(vec![arsenal_chelsea(1, 1)]), true).await;

        assert!(matches!(
            PredictionService::predict(&state, request("9999", "Arsenal", "Chelsea")).await,
            Err(PredictError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn active_subscription_and_admin_code_are_accepted() {
        let (state, _) = state_with(Some(vec![arsenal_chelsea(0, 3)]), true).await;
        let future = Utc::now().naive_utc() + Duration::days(10);
        SubscriptionRepository::upsert_unless_lifetime(
            &state.db,
            "fan@example.com",
            Plan::Monthly,
            "4321",
            Some(future),
        )
        .await
        .unwrap();

        let (outcome, _) = PredictionService::predict(&state, request("4321", "arsenal", "chelsea"))
            .await
            .unwrap();
        assert_eq!(outcome.predicted_winner, "chelsea Wins");

        let (outcome, _) = PredictionService::predict(&state, request("0000", "Arsenal", "Chelsea"))
            .await
            .unwrap();
        assert_eq!(outcome.predicted_winner, "Chelsea Wins");

        assert_eq!(
            PredictionRepository::list_all(&state.db).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn unknown_fixture_or_empty_feed_is_no_match_data() {
        let (state, _) = state_with(Some(vec![arsenal_chelsea(1, 0)]), true).await;
        let err = PredictionService::predict(&state, request("instant", "Everton", "Chelsea"))
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::NoMatchData));
        assert_eq!(AppError::from(err).status(), axum::http::StatusCode::BAD_REQUEST);

        let (state, _) = state_with(None, true).await;
        assert!(matches!(
            PredictionService::predict(&state, request("instant", "Arsenal", "Chelsea")).await,
            Err(PredictError::NoMatchData)
        ));
    }

    #[tokio::test]
    async fn level_scores_predict_a_draw() {
        let (state, _) = state_with(Some(vec![arsenal_chelsea(1, 1)]), true).await;

        let (outcome, _) = PredictionService::predict(&state, request("instant", "Arsenal", "Chelsea"))
            .await
            .unwrap();
        assert_eq!(outcome.predicted_winner, "Draw");
    }

    #[tokio::test]
    async fn missing_model_is_reported() {
        let (state, _) = state_with(Some(vec![arsenal_chelsea(1, 1)]), false).await;

        assert!(matches!(
            PredictionService::predict(&state, request("instant", "Arsenal", "Chelsea")).await,
            Err(PredictError::ModelUnavailable)
        ));
    }
}
