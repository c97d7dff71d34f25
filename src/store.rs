use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::rank::RankSnapshot;

type SnapshotMap = BTreeMap<u64, RankSnapshot>;

/// Flat-file store holding the last observed rank per team, keyed by
/// team ID. The whole map is rewritten on every save so a single file
/// can track multiple teams.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotStore { path: path.into() }
    }

    /// Last persisted snapshot for a team. A missing or empty file is
    /// the first-run case and yields `None`; a malformed file is an
    /// error, never treated as empty.
    pub fn load_snapshot(&self, team_id: u64) -> Result<Option<RankSnapshot>, StoreError> {
        Ok(self.read_map()?.remove(&team_id))
    }

    /// Upsert one team's snapshot, preserving entries for other teams.
    /// Writes to a sibling temp file and renames over the target, so a
    /// crash mid-write never truncates a previously valid store.
    pub fn save_snapshot(&self, snapshot: &RankSnapshot) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(snapshot.team_id, snapshot.clone());
        self.write_map(&map)
    }

    fn read_map(&self) -> Result<SnapshotMap, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SnapshotMap::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(SnapshotMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write_map(&self, map: &SnapshotMap) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(map)?;
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, body).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io {
                path: self.path.clone(),
                source: e,
            });
        }
        debug!(
            "Persisted {} snapshot(s) to {}",
            map.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshots".into());
    name.push(".tmp");
    path.with_file_name(name)
}
