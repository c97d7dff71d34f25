use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::notify::{format_message, Notifier};
use crate::rank::{classify, LeaderboardEntry, RankChange, RankSnapshot};
use crate::store::SnapshotStore;

/// Source of the tracked team's current leaderboard entry.
#[async_trait]
pub trait RankSource: Send + Sync {
    async fn current_entry(&self) -> Result<LeaderboardEntry, FetchError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub notify_first_observation: bool,
    pub include_points: bool,
}

/// One full check: load snapshot, fetch the current entry, classify,
/// notify when the change warrants it, then persist.
///
/// The snapshot is persisted even when notification delivery fails, so
/// the next run does not re-announce an already observed change.
/// Fetch and persistence failures abort the run.
pub async fn run_once(
    team_id: u64,
    source: &dyn RankSource,
    store: &SnapshotStore,
    notifier: &dyn Notifier,
    options: RunOptions,
) -> anyhow::Result<RankChange> {
    let previous = store.load_snapshot(team_id)?;
    let current = source.current_entry().await?;

    let change = classify(previous.as_ref(), &current);
    info!(
        "Team {} ({}): {:?}",
        team_id, current.team_name, change
    );

    if change.is_notify_worthy(options.notify_first_observation) {
        let message = format_message(&current, change, options.include_points);
        match notifier.notify(&message).await {
            Ok(()) => info!("Notified: {}", message),
            Err(e) => warn!("Failed to deliver notification: {}", e),
        }
    } else {
        info!("No notify-worthy change, skipping webhook");
    }

    store.save_snapshot(&RankSnapshot::observed(team_id, &current))?;
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::rank::Rank;
    use chrono::Utc;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FixedSource(LeaderboardEntry);

    #[async_trait]
    impl RankSource for FixedSource {
        async fn current_entry(&self) -> Result<LeaderboardEntry, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new(fail: bool) -> Self {
            RecordingNotifier {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(message.to_string());
            if self.fail {
                Err(NotifyError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ))
            } else {
                Ok(())
            }
        }
    }

    fn entry(rank: Rank) -> LeaderboardEntry {
        LeaderboardEntry {
            team_id: 1,
            team_name: "T1".into(),
            rank,
            points: Some(100.0),
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            notify_first_observation: false,
            include_points: false,
        }
    }

    fn seed(store: &SnapshotStore, rank: Rank) {
        store
            .save_snapshot(&RankSnapshot {
                team_id: 1,
                rank,
                points: None,
                captured_at: Utc::now(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_observation_is_silent_and_persisted() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.json"));
        let source = FixedSource(entry(Rank::Ranked(42)));
        let notifier = RecordingNotifier::new(false);

        let change = run_once(1, &source, &store, &notifier, options())
            .await
            .unwrap();

        assert_eq!(
            change,
            RankChange::FirstObservation {
                new: Rank::Ranked(42)
            }
        );
        assert!(notifier.sent().is_empty());
        assert_eq!(
            store.load_snapshot(1).unwrap().unwrap().rank,
            Rank::Ranked(42)
        );
    }

    #[tokio::test]
    async fn test_first_observation_notifies_when_enabled() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.json"));
        let source = FixedSource(entry(Rank::Ranked(42)));
        let notifier = RecordingNotifier::new(false);
        let opts = RunOptions {
            notify_first_observation: true,
            ..options()
        };

        run_once(1, &source, &store, &notifier, opts).await.unwrap();
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_rank_is_silent() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.json"));
        seed(&store, Rank::Ranked(42));
        let source = FixedSource(entry(Rank::Ranked(42)));
        let notifier = RecordingNotifier::new(false);

        let change = run_once(1, &source, &store, &notifier, options())
            .await
            .unwrap();

        assert_eq!(
            change,
            RankChange::Unchanged {
                rank: Rank::Ranked(42)
            }
        );
        assert!(notifier.sent().is_empty());
        assert_eq!(
            store.load_snapshot(1).unwrap().unwrap().rank,
            Rank::Ranked(42)
        );
    }

    #[tokio::test]
    async fn test_improvement_notifies_with_old_and_new_rank() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.json"));
        seed(&store, Rank::Ranked(42));
        let source = FixedSource(entry(Rank::Ranked(37)));
        let notifier = RecordingNotifier::new(false);

        let change = run_once(1, &source, &store, &notifier, options())
            .await
            .unwrap();

        assert_eq!(change, RankChange::Improved { old: 42, new: 37 });
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("#42") && sent[0].contains("#37"), "got: {}", sent[0]);
        assert_eq!(
            store.load_snapshot(1).unwrap().unwrap().rank,
            Rank::Ranked(37)
        );
    }

    #[tokio::test]
    async fn test_notify_failure_still_persists() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.json"));
        seed(&store, Rank::Ranked(42));
        let source = FixedSource(entry(Rank::Unranked));
        let notifier = RecordingNotifier::new(true);

        let change = run_once(1, &source, &store, &notifier, options())
            .await
            .unwrap();

        assert_eq!(change, RankChange::BecameUnranked { old: 42 });
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(store.load_snapshot(1).unwrap().unwrap().rank, Rank::Unranked);
    }

    #[tokio::test]
    async fn test_corrupt_store_aborts_before_notify() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshots.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = SnapshotStore::new(&path);
        let source = FixedSource(entry(Rank::Ranked(1)));
        let notifier = RecordingNotifier::new(false);

        let result = run_once(1, &source, &store, &notifier, options()).await;
        assert!(result.is_err());
        assert!(notifier.sent().is_empty());
    }
}
