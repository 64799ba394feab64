use std::path::PathBuf;

use thiserror::Error;

mod snapshots;

pub use snapshots::{
    read_snapshot, snapshot_path, stage_snapshot, temp_path, write_snapshot, StagedSnapshot,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refusing to write an empty snapshot for {source_name}")]
    EmptySnapshot { source_name: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{path} is not a valid snapshot: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
