use std::path::PathBuf;

use clap::Parser;

/// CTFtime national-leaderboard watcher
#[derive(Parser, Debug, Clone)]
#[command(name = "ctftime-rank-bot", version, about)]
pub struct Config {
    /// CTFtime team ID to track
    #[arg(long, env = "CTFTIME_TEAM_ID")]
    pub team: u64,

    /// Two-letter country code; resolved from the team profile when omitted
    #[arg(long, env = "CTFTIME_COUNTRY")]
    pub country: Option<String>,

    /// Webhook URL that receives rank-change notifications
    #[arg(long, env = "WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// CTFtime API base URL
    #[arg(long, env = "CTFTIME_API_URL", default_value = "https://ctftime.org/api/v1")]
    pub api_url: String,

    /// Path of the persisted snapshot file
    #[arg(long, env = "STATE_PATH", default_value = "rank_snapshots.json")]
    pub state_path: PathBuf,

    /// Also notify on the very first observation of the team
    #[arg(long, env = "NOTIFY_FIRST_OBSERVATION", default_value = "false")]
    pub notify_first_observation: bool,

    /// Append the team's season points to notification messages
    #[arg(long, env = "INCLUDE_POINTS", default_value = "false")]
    pub include_points: bool,

    /// HTTP timeout in seconds for CTFtime and webhook requests
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    pub http_timeout_secs: u64,
}

impl Config {
    /// Fail fast on configuration problems, before any network I/O.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validated_webhook_url().map(|_| ())
    }

    pub fn validated_webhook_url(&self) -> anyhow::Result<&str> {
        let Some(url) = self.webhook_url.as_deref() else {
            anyhow::bail!("WEBHOOK_URL environment variable not set");
        };
        if !url.starts_with("https://") {
            anyhow::bail!(
                "WEBHOOK_URL does not look like an https webhook URL. Found: {}",
                url
            );
        }
        Ok(url)
    }
}
