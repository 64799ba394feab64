//! Snapshot files: `<dir>/<slug>.json`, replaced atomically.
//!
//! A snapshot is serialized in full, written to `<slug>.json.tmp` beside
//! the final path, synced, and renamed over the final path. Readers see
//! either the previous snapshot or the new one, never a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use catsnap_core::Snapshot;

use crate::StoreError;

#[must_use]
pub fn snapshot_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{slug}.json"))
}

#[must_use]
pub fn temp_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{slug}.json.tmp"))
}

/// A fully written and synced temporary file awaiting [`StagedSnapshot::commit`].
///
/// Dropping it without committing removes the temporary file and leaves the
/// final path untouched.
#[derive(Debug)]
pub struct StagedSnapshot {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedSnapshot {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Renames the temporary file onto the final path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the rename fails; the temporary file is
    /// removed and the previous snapshot stays in place.
    pub fn commit(mut self) -> Result<PathBuf, StoreError> {
        fs::rename(&self.temp, &self.target).map_err(|e| StoreError::io(&self.target, e))?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagedSnapshot {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.temp) {
                tracing::debug!(path = %self.temp.display(), error = %e, "could not remove temp snapshot");
            }
        }
    }
}

/// Serializes `snapshot` into `<dir>/<slug>.json.tmp`, creating `dir` if needed.
///
/// # Errors
///
/// - [`StoreError::EmptySnapshot`] if `snapshot` has no products; nothing is written.
/// - [`StoreError::Serialize`] if serialization fails; nothing is written.
/// - [`StoreError::Io`] if the directory or temporary file cannot be written;
///   the temporary file is removed.
pub fn stage_snapshot(
    dir: &Path,
    slug: &str,
    snapshot: &Snapshot,
) -> Result<StagedSnapshot, StoreError> {
    if snapshot.is_empty() {
        return Err(StoreError::EmptySnapshot {
            source_name: snapshot.source.clone(),
        });
    }

    let encoded = serde_json::to_vec_pretty(snapshot)?;
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let staged = StagedSnapshot {
        temp: temp_path(dir, slug),
        target: snapshot_path(dir, slug),
        committed: false,
    };

    // On error `staged` drops here and removes the partial temp file.
    write_synced(&staged.temp, &encoded).map_err(|e| StoreError::io(&staged.temp, e))?;
    Ok(staged)
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()
}

/// Stages and commits `snapshot`, returning the final path.
///
/// # Errors
///
/// See [`stage_snapshot`] and [`StagedSnapshot::commit`].
pub fn write_snapshot(dir: &Path, slug: &str, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
    let path = stage_snapshot(dir, slug, snapshot)?.commit()?;
    tracing::info!(
        path = %path.display(),
        count = snapshot.count,
        "snapshot written"
    );
    Ok(path)
}

/// Loads a snapshot file.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read, or
/// [`StoreError::Parse`] if it is not a snapshot.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_owned(),
        source,
    })
}
