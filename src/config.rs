use std::path::PathBuf;

use crate::analyzer::snapshot::SnapshotResolver;

pub const DEFAULT_SNAPSHOT_DIR: &str = ".strata";
pub const SNAPSHOT_DIR_ENV: &str = "STRATA_SNAPSHOT_DIR";

/// Image used by `strata check` when none is given.
pub const DEFAULT_CHECK_IMAGE: &str = "node:alpine";

#[derive(Debug, Clone)]
pub struct Config {
    pub snapshot_dir: PathBuf,
}

impl Config {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
        }
    }

    pub fn resolver(&self) -> SnapshotResolver {
        SnapshotResolver::new(&self.snapshot_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_DIR)
    }
}
