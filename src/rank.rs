use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team's position on the national leaderboard. Lower is better.
/// A team absent from the board is `Unranked`, which may mean "not yet
/// scored this season" rather than "ranked last".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Ranked(u32),
    Unranked,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Ranked(n) => write!(f, "#{}", n),
            Rank::Unranked => write!(f, "unranked"),
        }
    }
}

/// Last persisted rank observation for a team. One per team survives
/// across runs; overwritten at the end of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub team_id: u64,
    pub rank: Rank,
    /// CTFtime season points at observation time, when the team was ranked.
    pub points: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl RankSnapshot {
    /// Snapshot of a freshly observed leaderboard entry.
    pub fn observed(team_id: u64, entry: &LeaderboardEntry) -> Self {
        RankSnapshot {
            team_id,
            rank: entry.rank,
            points: entry.points,
            captured_at: Utc::now(),
        }
    }
}

/// The tracked team's row on the current leaderboard, as fetched this run.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub team_id: u64,
    pub team_name: String,
    pub rank: Rank,
    pub points: Option<f64>,
}

/// Outcome of comparing the current leaderboard entry against the
/// persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankChange {
    /// No snapshot existed for this team before this run.
    FirstObservation { new: Rank },
    Unchanged { rank: Rank },
    Improved { old: u32, new: u32 },
    Worsened { old: u32, new: u32 },
    BecameUnranked { old: u32 },
    BecameRanked { new: u32 },
}

impl RankChange {
    /// Whether this change should produce a webhook notification.
    /// First observations are silent unless explicitly enabled, so a
    /// fresh deployment does not announce a "change" that never happened.
    pub fn is_notify_worthy(&self, notify_first_observation: bool) -> bool {
        match self {
            RankChange::Unchanged { .. } => false,
            RankChange::FirstObservation { .. } => notify_first_observation,
            _ => true,
        }
    }
}

/// Compare the persisted snapshot against the freshly fetched entry.
///
/// Pure and deterministic. Unranked is treated as its own state rather
/// than folded into improved/worsened; tied numeric ranks are unchanged.
pub fn classify(previous: Option<&RankSnapshot>, current: &LeaderboardEntry) -> RankChange {
    let Some(prev) = previous else {
        return RankChange::FirstObservation { new: current.rank };
    };
    match (prev.rank, current.rank) {
        (Rank::Ranked(old), Rank::Ranked(new)) => {
            if new == old {
                RankChange::Unchanged { rank: current.rank }
            } else if new < old {
                RankChange::Improved { old, new }
            } else {
                RankChange::Worsened { old, new }
            }
        }
        (Rank::Ranked(old), Rank::Unranked) => RankChange::BecameUnranked { old },
        (Rank::Unranked, Rank::Ranked(new)) => RankChange::BecameRanked { new },
        (Rank::Unranked, Rank::Unranked) => RankChange::Unchanged {
            rank: Rank::Unranked,
        },
    }
}
