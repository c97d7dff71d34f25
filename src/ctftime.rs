use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::rank::{LeaderboardEntry, Rank};
use crate::watcher::RankSource;

/// Client for the public CTFtime REST API.
/// Docs: <https://ctftime.org/api/>
#[derive(Clone)]
pub struct CtftimeClient {
    http: Client,
    /// Base URL, overridable in tests.
    base_url: String,
}

/// Team profile from `/teams/{id}/`. Only the fields we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamInfo {
    pub id: u64,
    pub name: String,
    pub country: Option<String>,
}

/// One row of the `/top-by-country/{country}/` leaderboard.
#[derive(Debug, Clone, Deserialize)]
struct CountryRow {
    team_id: u64,
    team_name: String,
    country_place: u32,
    #[serde(default)]
    points: Option<f64>,
}

impl From<CountryRow> for LeaderboardEntry {
    fn from(row: CountryRow) -> Self {
        LeaderboardEntry {
            team_id: row.team_id,
            team_name: row.team_name,
            rank: Rank::Ranked(row.country_place),
            points: row.points,
        }
    }
}

impl CtftimeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(CtftimeClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the team profile, used to resolve the team's country and
    /// display name. 404 means the tracked team ID itself is wrong.
    pub async fn fetch_team_info(&self, team_id: u64) -> Result<TeamInfo, FetchError> {
        let url = format!("{}/teams/{}/", self.base_url, team_id);
        debug!("Fetching team info from {}", url);

        let resp = self.http.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::TeamNotFound(team_id));
        }
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status(),
                url,
            });
        }
        Ok(resp.json().await?)
    }

    /// Fetch the national leaderboard for a country code (e.g. "no").
    pub async fn fetch_leaderboard(
        &self,
        country: &str,
    ) -> Result<Vec<LeaderboardEntry>, FetchError> {
        let url = format!(
            "{}/top-by-country/{}/",
            self.base_url,
            country.to_lowercase()
        );
        debug!("Fetching leaderboard from {}", url);

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status(),
                url,
            });
        }
        let rows: Vec<CountryRow> = resp.json().await?;
        Ok(rows.into_iter().map(LeaderboardEntry::from).collect())
    }
}

/// Find the tracked team on the board; absence is the `Unranked`
/// sentinel, not an error.
pub fn lookup_team(
    team_id: u64,
    display_name: &str,
    entries: &[LeaderboardEntry],
) -> LeaderboardEntry {
    entries
        .iter()
        .find(|e| e.team_id == team_id)
        .cloned()
        .unwrap_or_else(|| LeaderboardEntry {
            team_id,
            team_name: display_name.to_string(),
            rank: Rank::Unranked,
            points: None,
        })
}

/// Rank source backed by the live CTFtime API: resolves the team's
/// country from its profile unless one was configured explicitly.
pub struct CtftimeRankSource {
    client: CtftimeClient,
    team_id: u64,
    country: Option<String>,
}

impl CtftimeRankSource {
    pub fn new(client: CtftimeClient, team_id: u64, country: Option<String>) -> Self {
        CtftimeRankSource {
            client,
            team_id,
            country,
        }
    }
}

#[async_trait]
impl RankSource for CtftimeRankSource {
    async fn current_entry(&self) -> Result<LeaderboardEntry, FetchError> {
        let info = self.client.fetch_team_info(self.team_id).await?;
        let country = match &self.country {
            Some(c) => c.clone(),
            None => info
                .country
                .clone()
                .filter(|c| !c.is_empty())
                .ok_or(FetchError::MissingCountry(self.team_id))?,
        };
        let board = self.client.fetch_leaderboard(&country).await?;
        Ok(lookup_team(info.id, &info.name, &board))
    }
}
