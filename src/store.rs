//! Durable storage for the last overview, used as the baseline for "new since last check".

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::overview::Overview;

/// Bumped whenever the stored layout of `Overview` changes.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create snapshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("In-memory snapshot lock was poisoned")]
    Poisoned,
}

/// Load/save of the latest overview.
pub trait SnapshotStore {
    /// Previous overview, or an empty one if nothing usable is stored.
    fn load(&self) -> Overview;

    /// Replace the stored overview with `overview`.
    fn save(&self, overview: &Overview) -> Result<(), StoreError>;
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    overview: &'a Overview,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    overview: Overview,
}

/// JSON file holding `{ "version": N, "overview": ... }`.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the OS cache directory, e.g. ~/.cache/review-radar/snapshot.json.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::cache_dir().ok_or(StoreError::NoCacheDir)?;
        Ok(Self::new(dir.join("review-radar").join("snapshot.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Overview, String> {
        let contents = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;

        let header: VersionHeader = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
        match header.version {
            Some(SNAPSHOT_VERSION) => {}
            other => {
                return Err(format!(
                    "snapshot version {:?} does not match expected {}",
                    other, SNAPSHOT_VERSION
                ))
            }
        }

        let snapshot: SnapshotOwned = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
        Ok(snapshot.overview)
    }
}

impl SnapshotStore for FileSnapshotStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Overview {
        if !self.path.exists() {
            debug!("no previous snapshot, starting cold");
            return Overview::default();
        }

        match self.read() {
            Ok(overview) => {
                debug!(to_review = overview.to_review.len(), "loaded previous snapshot");
                overview
            }
            Err(reason) => {
                warn!(%reason, "ignoring unusable snapshot, starting cold");
                Overview::default()
            }
        }
    }

    #[instrument(skip(self, overview), fields(path = %self.path.display()))]
    fn save(&self, overview: &Overview) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let body = serde_json::to_string_pretty(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            overview,
        })?;

        // Write then rename so a crash never leaves a half-written snapshot.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!("saved snapshot");
        Ok(())
    }
}

/// Process-local store for runs that should not touch the disk.
#[derive(Default)]
pub struct MemorySnapshotStore {
    overview: Mutex<Option<Overview>>,
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Overview {
        self.overview
            .lock()
            .map(|guard| guard.clone().unwrap_or_default())
            .unwrap_or_default()
    }

    fn save(&self, overview: &Overview) -> Result<(), StoreError> {
        let mut guard = self.overview.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(overview.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overview::{FailureKind, OverviewFailure};
    use crate::pr::{PullRequestRecord, PullRequestStatus};
    use chrono::DateTime;

    fn sample_overview() -> Overview {
        let record = PullRequestRecord {
            id: "101".to_string(),
            title: "Add exponential backoff".to_string(),
            source_branch: "feature/upload-backoff".to_string(),
            target_branch: "master".to_string(),
            repository_slug: "core".to_string(),
            overall_status: PullRequestStatus::Unapproved,
            last_activity: DateTime::from_timestamp_millis(1_699_990_000_000).unwrap(),
            last_activity_label: "2 hours ago".to_string(),
            repository_link: "https://bb.example.com/projects/PLAT/repos/core/browse".to_string(),
            self_link: "https://bb.example.com/projects/PLAT/repos/core/pull-requests/101"
                .to_string(),
        };
        Overview {
            to_review: vec![record.clone()],
            authored_needing_attention: vec![PullRequestRecord {
                overall_status: PullRequestStatus::NeedsWork,
                ..record
            }],
            failure: None,
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshot.json"));
        assert_eq!(store.load(), Overview::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested").join("snapshot.json"));
        let overview = sample_overview();

        store.save(&overview).unwrap();
        assert_eq!(store.load(), overview);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshot.json"));

        store.save(&sample_overview()).unwrap();
        store.save(&Overview::default()).unwrap();
        assert!(store.load().to_review.is_empty());
    }

    #[test]
    fn test_failure_survives_storage() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshot.json"));
        let overview = Overview::failed(OverviewFailure {
            kind: FailureKind::ConnectionFailure,
            message: FailureKind::ConnectionFailure.message().to_string(),
            cause: "connection refused".to_string(),
            context: "while fetching REVIEWER pull requests".to_string(),
        });
        store.save(&overview).unwrap();
        assert_eq!(store.load(), overview);
    }

    #[test]
    fn test_version_mismatch_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let store = FileSnapshotStore::new(&path);
        store.save(&sample_overview()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let bumped = contents.replacen("\"version\": 1", "\"version\": 99", 1);
        std::fs::write(&path, bumped).unwrap();

        assert_eq!(store.load(), Overview::default());
    }

    #[test]
    fn test_unversioned_or_garbage_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let store = FileSnapshotStore::new(&path);

        let unversioned =
            r#"{"overview": {"to_review": [], "authored_needing_attention": [], "failure": null}}"#;
        std::fs::write(&path, unversioned).unwrap();
        assert_eq!(store.load(), Overview::default());

        std::fs::write(&path, "\u{80}not json").unwrap();
        assert_eq!(store.load(), Overview::default());
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        // Parent "directory" is a regular file.
        let store = FileSnapshotStore::new(blocker.join("snapshot.json"));
        assert!(matches!(
            store.save(&sample_overview()),
            Err(StoreError::CreateDir { .. })
        ));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySnapshotStore::default();
        assert_eq!(store.load(), Overview::default());
        store.save(&sample_overview()).unwrap();
        assert_eq!(store.load(), sample_overview());
    }

    #[test]
    fn test_memory_store_save_after_panic_fails() {
        let store = MemorySnapshotStore::default();
        std::thread::scope(|scope| {
            let holder = scope.spawn(|| {
                let _guard = store.overview.lock().unwrap();
                panic!("writer died while holding the snapshot");
            });
            assert!(holder.join().is_err());
        });

        assert!(matches!(store.save(&sample_overview()), Err(StoreError::Poisoned)));
    }
}
