use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::FootballApiConfig;
use crate::services::classifier::Outcome;

// ============================================================================
// football-data.org response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MatchesResponse {
    #[serde(default)]
    pub matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMatch {
    pub home_team: ApiTeam,
    pub away_team: ApiTeam,
    pub score: Option<ApiScore>,
    pub utc_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeam {
    /// Null for fixtures whose participants are not decided yet.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScore {
    pub winner: Option<String>,
    pub full_time: Option<ApiScoreLine>,
}

#[derive(Debug, Deserialize)]
pub struct ApiScoreLine {
    pub home: Option<i64>,
    pub away: Option<i64>,
}

// ============================================================================
// Normalized snapshot
// ============================================================================

/// One row of the live snapshot, flattened from the provider's nested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveMatch {
    pub home_team: String,
    pub away_team: String,
    pub home_team_score: i64,
    pub away_team_score: i64,
    pub winner: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_date: Option<DateTime<Utc>>,
}

impl LiveMatch {
    /// Case-insensitive fixture match on both team names.
    pub fn is_fixture(&self, home_team: &str, away_team: &str) -> bool {
        self.home_team.trim().to_lowercase() == home_team.trim().to_lowercase()
            && self.away_team.trim().to_lowercase() == away_team.trim().to_lowercase()
    }
}

fn winner_outcome(winner: Option<&str>) -> Outcome {
    match winner {
        Some("HOME_TEAM") => Outcome::HomeWin,
        Some("AWAY_TEAM") => Outcome::AwayWin,
        // Draws and undecided fixtures share a class.
        _ => Outcome::Draw,
    }
}

/// Flatten the provider response. Matches without a `score` object or without
/// both team names are dropped; missing full-time goals count as zero.
pub fn normalize(response: MatchesResponse) -> Vec<LiveMatch> {
    response
        .matches
        .into_iter()
        .filter_map(|m| {
            let score = m.score?;
            let (home_team, away_team) = match (m.home_team.name, m.away_team.name) {
                (Some(home), Some(away)) => (home, away),
                _ => {
                    tracing::debug!("Skipping fixture without both team names");
                    return None;
                }
            };
            let (home_score, away_score) = score
                .full_time
                .map(|ft| (ft.home.unwrap_or(0), ft.away.unwrap_or(0)))
                .unwrap_or((0, 0));

            Some(LiveMatch {
                home_team,
                away_team,
                home_team_score: home_score,
                away_team_score: away_score,
                winner: winner_outcome(score.winner.as_deref()),
                utc_date: m
                    .utc_date
                    .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
                    .map(|d| d.with_timezone(&Utc)),
            })
        })
        .collect()
}

/// Find the named fixture in a snapshot.
pub fn find_fixture<'a>(
    matches: &'a [LiveMatch],
    home_team: &str,
    away_team: &str,
) -> Option<&'a LiveMatch> {
    matches.iter().find(|m| m.is_fixture(home_team, away_team))
}

// ============================================================================
// Fetcher
// ============================================================================

/// Source of the current live-match snapshot.
///
/// `None` means "no data" (request failed or nothing is on); callers decide
/// how to surface that.
#[async_trait]
pub trait MatchFeed: Send + Sync {
    async fn live_matches(&self) -> Option<Vec<LiveMatch>>;
}

#[derive(Debug, Clone)]
pub struct FootballDataClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FootballDataClient {
    pub fn new(config: &FootballApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("FOOTBALL_API_KEY is not set; live match requests will be unauthenticated");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MatchFeed for FootballDataClient {
    async fn live_matches(&self) -> Option<Vec<LiveMatch>> {
        let mut request = self.client.get(format!("{}/matches", self.base_url));
        if let Some(ref key) = self.api_key {
            request = request.header("X-Auth-Token", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch live matches: {}", e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Failed to fetch live matches: {} - {}", status, body);
            return None;
        }

        let body: MatchesResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to parse live matches response: {}", e);
                return None;
            }
        };

        let matches = normalize(body);
        tracing::debug!("Fetched {} live match(es)", matches.len());

        if matches.is_empty() {
            None
        } else {
            Some(matches)
        }
    }
}
