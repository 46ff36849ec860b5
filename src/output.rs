//! Staging of normalized datasets as CSV files ahead of upload.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::normalize::TabularDataset;

/// A staged CSV file owned by exactly one synchronization attempt.
#[derive(Debug)]
pub struct StagingArtifact {
    path: PathBuf,
}

impl StagingArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "feed.csv".to_string())
    }

    /// Removes the file. Failure is logged, not returned: the sync outcome
    /// is already decided by then.
    pub async fn remove(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to remove staging artifact");
        }
    }
}

/// Writes `dataset` to a fresh `feed-<mode>-<uuid>.csv` under `staging_dir`.
///
/// Each call gets its own file, so concurrent cycles for the same mode never
/// share a path.
#[tracing::instrument(skip(dataset), fields(mode = %dataset.mode, rows = dataset.len()))]
pub async fn stage_dataset(
    dataset: &TabularDataset,
    staging_dir: &Path,
) -> Result<StagingArtifact, SyncError> {
    let path = staging_dir.join(format!("feed-{}-{}.csv", dataset.mode, Uuid::new_v4()));
    let write_error = |message: String| SyncError::StagingWrite {
        path: path.clone(),
        message,
    };

    let body = dataset.to_csv().map_err(|e| write_error(e.to_string()))?;

    tokio::fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| write_error(e.to_string()))?;
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| write_error(e.to_string()))?;

    debug!(path = %path.display(), bytes = body.len(), "Staged dataset");
    Ok(StagingArtifact { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::TransitMode;
    use crate::normalize::{HEADER, normalize, tests::entity};

    #[tokio::test]
    async fn test_stage_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = normalize(&[entity("v1", "t1"), entity("v2", "t2")], TransitMode::Buses);

        let artifact = stage_dataset(&dataset, dir.path()).await.unwrap();
        let content = tokio::fs::read_to_string(artifact.path()).await.unwrap();
        let lines: Vec<_> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(artifact.file_name().starts_with("feed-buses-"));
        assert!(artifact.file_name().ends_with(".csv"));
    }

    #[tokio::test]
    async fn test_same_mode_gets_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = normalize(&[entity("v1", "t1")], TransitMode::SydneyTrains);

        let a = stage_dataset(&dataset, dir.path()).await.unwrap();
        let b = stage_dataset(&dataset, dir.path()).await.unwrap();

        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = normalize(&[], TransitMode::Ferries);

        let artifact = stage_dataset(&dataset, dir.path()).await.unwrap();
        let path = artifact.path().to_path_buf();
        artifact.remove().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let dataset = normalize(&[], TransitMode::Ferries);

        let result = stage_dataset(&dataset, &blocker).await;

        assert!(matches!(result, Err(SyncError::StagingWrite { .. })));
    }
}
