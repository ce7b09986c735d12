//! Test helpers for CLI workspaces, track files and stub data sources.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use lumigram_core::{CollectedSet, CollectedStore, Coordinate, StableId};
use lumigram_data::test_support::StubExecutor;
use lumigram_data::{JsonFileCollectedStore, QueryExecutor};
use tempfile::TempDir;

use crate::CliError;
use crate::source::{PlaceSourceBuilder, SourceConfig};

/// Temporary data directory removed on drop.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn store(&self) -> JsonFileCollectedStore {
        JsonFileCollectedStore::in_data_dir(&self.root)
    }

    pub(super) fn collect(&self, ids: &[&str]) {
        let set = CollectedSet::from_parts(ids.iter().map(|id| StableId::new(*id)), None);
        self.store().save(&set).expect("save collected set");
    }

    pub(super) fn write_track(&self, positions: &[Coordinate]) -> Utf8PathBuf {
        let path = self.root.join("track.csv");
        let mut contents = String::from("# lat,lon\n");
        for position in positions {
            contents.push_str(&format!(
                "{},{}\n",
                position.latitude(),
                position.longitude()
            ));
        }
        write_utf8(&path, contents.as_bytes());
        path
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture file");
}

pub(super) fn ljubljana() -> Coordinate {
    Coordinate::new(46.05, 14.5).expect("valid coordinate")
}

/// Builder handing out one shared [`StubExecutor`].
#[derive(Debug, Clone)]
pub(super) struct StubPlaceSourceBuilder {
    pub(super) executor: StubExecutor,
}

impl PlaceSourceBuilder for StubPlaceSourceBuilder {
    fn build(&self, _config: &SourceConfig) -> Result<Arc<dyn QueryExecutor>, CliError> {
        Ok(Arc::new(self.executor.clone()))
    }
}

pub(super) fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
}
