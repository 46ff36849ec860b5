//! Failure taxonomy for one synchronization or purge invocation.

use std::path::PathBuf;

/// Every step of the pipeline surfaces exactly one of these. None of them are
/// retried; the orchestrator aborts the invocation on the first one it sees.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch feed from '{url}': {message}")]
    Fetch { url: String, message: String },
    #[error("Failed to decode GTFS-RT payload: {source}")]
    Decode { source: prost::DecodeError },
    #[error("Failed to write staging artifact '{path}': {message}")]
    StagingWrite { path: PathBuf, message: String },
    #[error("Failed to acquire access token: {0}")]
    Auth(String),
    #[error("Failed to upload staged dataset: {0}")]
    Upload(String),
    #[error("Failed to upsert uploaded dataset: {0}")]
    Upsert(String),
    #[error("Failed to delete stale features: {0}")]
    Delete(String),
}

impl SyncError {
    /// Stable label for logs and exit status reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Fetch { .. } => "fetch_error",
            SyncError::Decode { .. } => "decode_error",
            SyncError::StagingWrite { .. } => "staging_write_error",
            SyncError::Auth(_) => "auth_error",
            SyncError::Upload(_) => "upload_error",
            SyncError::Upsert(_) => "upsert_error",
            SyncError::Delete(_) => "delete_error",
        }
    }

    /// Process exit code, distinct per error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Fetch { .. } => 10,
            SyncError::Decode { .. } => 11,
            SyncError::StagingWrite { .. } => 12,
            SyncError::Auth(_) => 13,
            SyncError::Upload(_) => 14,
            SyncError::Upsert(_) => 15,
            SyncError::Delete(_) => 16,
        }
    }
}

impl From<prost::DecodeError> for SyncError {
    fn from(source: prost::DecodeError) -> Self {
        SyncError::Decode { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_exit_codes_are_distinct() {
        let errors = [
            SyncError::Fetch {
                url: "u".into(),
                message: "m".into(),
            },
            SyncError::StagingWrite {
                path: PathBuf::from("/tmp/x.csv"),
                message: "m".into(),
            },
            SyncError::Auth("m".into()),
            SyncError::Upload("m".into()),
            SyncError::Upsert("m".into()),
            SyncError::Delete("m".into()),
        ];

        let mut kinds: Vec<_> = errors.iter().map(SyncError::kind).collect();
        let mut codes: Vec<_> = errors.iter().map(SyncError::exit_code).collect();
        kinds.sort();
        kinds.dedup();
        codes.sort();
        codes.dedup();

        assert_eq!(kinds.len(), errors.len());
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_includes_context() {
        let err = SyncError::Fetch {
            url: "https://example.test/buses".into(),
            message: "status 503".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch feed from 'https://example.test/buses': status 503"
        );
    }
}
