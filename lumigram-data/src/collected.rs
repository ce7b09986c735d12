//! Durable [`CollectedStore`] backed by a JSON file.
//!
//! The file holds `{"version": 1, "ids": [...], "updatedAt": "<RFC 3339>"}`.
//! Absent, unreadable or malformed content loads as an empty set. A missing
//! or unparsable `updatedAt` only drops the timestamp.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use lumigram_core::{CollectedSet, CollectedStore, PersistenceError, StableId};
use serde::Serialize;
use serde_json::Value;

/// Schema version written to, and required from, the collected-set file.
/// Files without a `version` field predate it and read as version 1.
pub const SCHEMA_VERSION: u64 = 1;

/// Default location of the collected-set file, relative to the data
/// directory.
pub const DEFAULT_FILE: &str = "lumigram/stamps.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredStamps {
    version: u64,
    ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq, Eq)]
enum DecodeError {
    Malformed,
    UnsupportedVersion(Option<u64>),
}

fn decode(raw: &str) -> Result<CollectedSet, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| DecodeError::Malformed)?;
    match value.get("version") {
        None => {}
        Some(version) if version.as_u64() == Some(SCHEMA_VERSION) => {}
        Some(version) => return Err(DecodeError::UnsupportedVersion(version.as_u64())),
    }
    let ids = value
        .get("ids")
        .and_then(Value::as_array)
        .ok_or(DecodeError::Malformed)?;
    let updated_at = value
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|raw_ts| DateTime::parse_from_rfc3339(raw_ts).ok())
        .map(|ts| ts.with_timezone(&Utc));
    Ok(CollectedSet::from_parts(
        ids.iter().filter_map(Value::as_str).map(StableId::new),
        updated_at,
    ))
}

/// Stores the collected set as JSON at a fixed path.
///
/// Writes are atomic: the file is replaced by a synced sibling, so a crash
/// leaves either the old or the new set.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use lumigram_core::{CollectedStore, StableId};
/// use lumigram_data::collected::JsonFileCollectedStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let path = Utf8PathBuf::from_path_buf(dir.path().join("stamps.json"))
///     .map_err(|_| "non UTF-8 temp dir")?;
/// let store = JsonFileCollectedStore::new(path);
///
/// let mut set = store.load();
/// set.insert(StableId::new("way/42"));
/// store.save(&set)?;
/// assert!(store.load().contains(&StableId::new("way/42")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileCollectedStore {
    path: Utf8PathBuf,
}

impl JsonFileCollectedStore {
    /// Store reading and writing `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`DEFAULT_FILE`] under `data_dir`.
    #[must_use]
    pub fn in_data_dir(data_dir: &Utf8Path) -> Self {
        Self::new(data_dir.join(DEFAULT_FILE))
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl CollectedStore for JsonFileCollectedStore {
    fn load(&self) -> CollectedSet {
        match lumigram_fs::read_to_string_if_exists(&self.path) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(set) => set,
                Err(DecodeError::Malformed) => {
                    warn!("ignoring malformed collected set in {}", self.path);
                    CollectedSet::default()
                }
                Err(DecodeError::UnsupportedVersion(version)) => {
                    warn!(
                        "ignoring collected set in {} with schema version {version:?}, expected {SCHEMA_VERSION}",
                        self.path
                    );
                    CollectedSet::default()
                }
            },
            Ok(None) => {
                debug!("no collected set at {}", self.path);
                CollectedSet::default()
            }
            Err(err) => {
                warn!("cannot read collected set at {}: {err}", self.path);
                CollectedSet::default()
            }
        }
    }

    fn save(&self, set: &CollectedSet) -> Result<(), PersistenceError> {
        let stored = StoredStamps {
            version: SCHEMA_VERSION,
            ids: set
                .sorted_ids()
                .into_iter()
                .map(|id| id.as_str().to_owned())
                .collect(),
            updated_at: set.updated_at(),
        };
        let encoded = serde_json::to_vec_pretty(&stored).map_err(|err| PersistenceError::Encode {
            message: err.to_string(),
        })?;
        lumigram_fs::write_atomic(&self.path, &encoded)?;
        debug!("saved {} collected ids to {}", set.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        store: JsonFileCollectedStore,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        Workspace {
            store: JsonFileCollectedStore::in_data_dir(&root),
            _dir: dir,
        }
    }

    #[rstest]
    fn missing_file_loads_empty(workspace: Workspace) {
        assert!(workspace.store.load().is_empty());
    }

    #[rstest]
    fn saved_set_survives_reload(workspace: Workspace) {
        let mut set = CollectedSet::default();
        set.insert(StableId::new("node/2"));
        set.insert(StableId::new("way/1"));
        workspace.store.save(&set).expect("save succeeds");

        let loaded = workspace.store.load();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains(&StableId::new("way/1")));
        assert_eq!(loaded.updated_at(), set.updated_at());

        let raw = fs::read_to_string(workspace.store.path()).expect("file written");
        let json: Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(json["version"], serde_json::json!(SCHEMA_VERSION));
        assert_eq!(json["ids"], serde_json::json!(["node/2", "way/1"]));
        assert!(json["updatedAt"].is_string());
    }

    #[rstest]
    #[case("not json at all")]
    #[case(r#"{"ids": "way/1"}"#)]
    #[case(r#"{"updatedAt": "2024-05-01T10:00:00Z"}"#)]
    #[case("null")]
    #[case(r#"{"version": 2, "ids": ["way/1"]}"#)]
    #[case(r#"{"version": "1", "ids": ["way/1"]}"#)]
    fn corrupt_content_loads_empty(workspace: Workspace, #[case] content: &str) {
        lumigram_fs::write_atomic(workspace.store.path(), content.as_bytes()).expect("seed file");
        assert!(workspace.store.load().is_empty());
    }

    #[rstest]
    fn accepts_content_without_timestamp(workspace: Workspace) {
        lumigram_fs::write_atomic(workspace.store.path(), br#"{"ids": ["relation/3"]}"#)
            .expect("seed file");
        let loaded = workspace.store.load();
        assert!(loaded.contains(&StableId::new("relation/3")));
        assert!(loaded.updated_at().is_none());
    }

    #[rstest]
    #[case(r#"{"ids": ["way/1", "node/2"], "updatedAt": "not-a-date"}"#)]
    #[case(r#"{"version": 1, "ids": ["way/1", "node/2"], "updatedAt": 17}"#)]
    #[case(r#"{"version": 1, "ids": ["way/1", 5, "node/2"]}"#)]
    fn readable_ids_survive_a_bad_timestamp(workspace: Workspace, #[case] content: &str) {
        lumigram_fs::write_atomic(workspace.store.path(), content.as_bytes()).expect("seed file");
        let loaded = workspace.store.load();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains(&StableId::new("way/1")));
        assert!(loaded.contains(&StableId::new("node/2")));
        assert!(loaded.updated_at().is_none());
    }

    #[rstest]
    fn timestamp_with_offset_normalises_to_utc(workspace: Workspace) {
        lumigram_fs::write_atomic(
            workspace.store.path(),
            br#"{"version": 1, "ids": ["way/1"], "updatedAt": "2024-05-01T12:00:00+02:00"}"#,
        )
        .expect("seed file");
        let expected = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        assert_eq!(workspace.store.load().updated_at(), Some(expected));
    }

    #[rstest]
    fn cleared_set_persists_empty(workspace: Workspace) {
        let mut set = CollectedSet::from_parts([StableId::new("way/9")], None);
        workspace.store.save(&set).expect("first save");
        set.clear();
        workspace.store.save(&set).expect("second save");
        assert!(workspace.store.load().is_empty());
    }
}
