//! JSON snapshot persistence.
//!
//! The whole [`HomeSnapshot`] is written on every save. Writes go to a
//! temporary file in the target directory which is then renamed over the
//! target, so readers never see a partially written document.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tempfile::NamedTempFile;

use super::state::HomeSnapshot;
use super::state::MAX_TEMP_SETTING;
use super::state::MIN_TEMP_SETTING;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Destination for full snapshots after each mutation.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &HomeSnapshot) -> Result<(), StoreError>;
}

/// Read a seed or data document.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<HomeSnapshot, StoreError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let snapshot: HomeSnapshot =
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let temp = snapshot.thermostat.temp_setting;
    if !(MIN_TEMP_SETTING..=MAX_TEMP_SETTING).contains(&temp) {
        return Err(StoreError::Invalid {
            path: path.to_path_buf(),
            message: format!(
                "thermostat temp_setting {} outside {}..={}",
                temp, MIN_TEMP_SETTING, MAX_TEMP_SETTING
            ),
        });
    }

    tracing::debug!(
        "Loaded {} fixture(s) from {}",
        snapshot.fixtures.len(),
        path.display()
    );
    Ok(snapshot)
}

/// Stores snapshots as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &HomeSnapshot) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        snapshot
            .serialize(&mut serializer)
            .map_err(StoreError::Serialize)?;

        let mut file = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        file.write_all(&buf).map_err(|e| self.io_error(e))?;
        file.as_file().sync_all().map_err(|e| self.io_error(e))?;
        file.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::trace!("Saved snapshot to {}", self.path.display());
        Ok(())
    }
}
