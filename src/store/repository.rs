//! Counter Store Repository
//!
//! Whole-snapshot persistence of the aggregate state as a JSON document.

use async_trait::async_trait;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::AggregateState;

use super::StoreError;

/// File name of the snapshot inside the data directory
pub const DATA_FILE_NAME: &str = "user_data.json";

/// Storage contract for the counter snapshot.
///
/// Implementations do not guard against concurrent writers; callers
/// serialize every load/mutate/save cycle.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Load the current snapshot.
    ///
    /// A missing or malformed snapshot yields an empty state and leaves the
    /// backing location ready for a subsequent `save`. Any other read failure
    /// is returned so the caller never overwrites data it could not see.
    async fn load(&self) -> Result<AggregateState, StoreError>;

    /// Replace the stored snapshot with `state`
    async fn save(&self, state: &AggregateState) -> Result<(), StoreError>;
}

/// Snapshot store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store keeping `user_data.json` inside `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(DATA_FILE_NAME);
        Self { dir, path }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn recover(&self) -> AggregateState {
        if let Err(e) = self.ensure_dir().await {
            tracing::error!(
                error = %e,
                dir = %self.dir.display(),
                "Failed to prepare data directory"
            );
        }
        AggregateState::new()
    }
}

#[async_trait]
impl CounterStore for JsonFileStore {
    async fn load(&self) -> Result<AggregateState, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No snapshot found, starting empty");
                return Ok(self.recover().await);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to read snapshot"
                );
                return Err(e.into());
            }
        };

        match serde_json::from_slice::<AggregateState>(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Snapshot is malformed, starting empty"
                );
                Ok(self.recover().await)
            }
        }
    }

    async fn save(&self, state: &AggregateState) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        let bytes = to_pretty_json(state)?;

        // Write then rename so a crash never leaves a half-written snapshot
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }
}

/// Serialize with four-space indentation, non-ASCII kept as-is
fn to_pretty_json(state: &AggregateState) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    state.serialize(&mut serializer)?;
    Ok(buf)
}
