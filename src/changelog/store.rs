//! Checkpoint persistence
//!
//! Keeps the last seen `updated_at` per resource in a JSON file so a
//! restarted poller resumes where it stopped. Writes are atomic.

use super::types::Checkpoints;
use crate::error::{Result, ResultExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// File-backed checkpoint store, shareable between pollers
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    /// Path to the checkpoint file (empty in memory)
    path: PathBuf,
    checkpoints: Arc<RwLock<Checkpoints>>,
}

impl CheckpointStore {
    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            checkpoints: Arc::new(RwLock::new(Checkpoints::new())),
        }
    }

    /// Open a store, loading existing checkpoints if the file exists
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let checkpoints = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read checkpoint file {}", path.display()))?;
            serde_json::from_str::<Checkpoints>(&contents)
                .with_context(|| format!("Failed to parse checkpoint file {}", path.display()))?
        } else {
            Checkpoints::new()
        };

        Ok(Self {
            path,
            checkpoints: Arc::new(RwLock::new(checkpoints)),
        })
    }

    /// Checkpoint for a resource
    pub async fn get(&self, resource: &str) -> Option<String> {
        let checkpoints = self.checkpoints.read().await;
        checkpoints.get(resource).map(ToString::to_string)
    }

    /// Record a checkpoint and persist it
    pub async fn set(&self, resource: &str, since: String) -> Result<()> {
        {
            let mut checkpoints = self.checkpoints.write().await;
            checkpoints.set(resource, since);
        }
        self.save().await
    }

    /// Write the checkpoints to disk
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = {
            let checkpoints = self.checkpoints.read().await;
            serde_json::to_string_pretty(&*checkpoints)?
        };

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .with_context(|| format!("Failed to write checkpoint file {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to rename checkpoint file {}", self.path.display()))?;

        Ok(())
    }

    /// Snapshot of all checkpoints
    pub async fn snapshot(&self) -> Checkpoints {
        self.checkpoints.read().await.clone()
    }

    /// Get the checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}
