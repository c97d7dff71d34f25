use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::error::NotifyError;
use crate::rank::{LeaderboardEntry, Rank, RankChange};

const WEBHOOK_USERNAME: &str = "CTFtime Watch";
const WEBHOOK_AVATAR: &str = "https://ctftime.org/static/images/ctftime-logo-avatar.png";

/// Delivery seam for notifications, so the run pipeline can be
/// exercised without a live webhook.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Posts notifications to a configured webhook endpoint.
pub struct WebhookNotifier {
    http: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(WebhookNotifier {
            http,
            webhook_url: webhook_url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "content": message,
            "masquerade": {
                "name": WEBHOOK_USERNAME,
                "avatar": WEBHOOK_AVATAR,
            },
        });

        debug!("Posting notification to webhook");
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NotifyError::Status(resp.status()));
        }
        info!("Webhook notification delivered");
        Ok(())
    }
}

/// Escape Markdown control characters in a team name.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '.' | '!'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Markdown-linked team name pointing at the team's CTFtime page,
/// optionally suffixed with its season points.
fn format_team_name(entry: &LeaderboardEntry, include_points: bool) -> String {
    let mut name = escape_markdown(&entry.team_name);
    if include_points {
        if let Some(points) = entry.points {
            name.push_str(&format!(" ({:.2} p)", points));
        }
    }
    format!("[{}](<https://ctftime.org/team/{}>)", name, entry.team_id)
}

/// Human-readable notification body for a rank change.
pub fn format_message(
    entry: &LeaderboardEntry,
    change: RankChange,
    include_points: bool,
) -> String {
    let team = format_team_name(entry, include_points);
    match change {
        RankChange::FirstObservation { new: Rank::Ranked(n) } => {
            format!("**{} is currently ranked #{} nationally.**", team, n)
        }
        RankChange::FirstObservation { new: Rank::Unranked } => {
            format!("**{} is not on the national leaderboard yet.**", team)
        }
        RankChange::Unchanged { rank } => {
            format!("**{} is still {} nationally.**", team, rank)
        }
        RankChange::Improved { new: 1, .. } => format!("**{} is back on top!**", team),
        RankChange::Improved { old, new } => {
            format!("**{} climbed from #{} to #{}!**", team, old, new)
        }
        RankChange::Worsened { old, new } => {
            format!("**{} dropped from #{} to #{}.**", team, old, new)
        }
        RankChange::BecameRanked { new: 1 } => format!("**{} is back on top!**", team),
        RankChange::BecameRanked { new } => {
            format!("**{} entered the national leaderboard at #{}!**", team, new)
        }
        RankChange::BecameUnranked { old } => format!(
            "**{} fell off the national leaderboard! They were last ranked #{}.**",
            team, old
        ),
    }
}
