//! Traits and handle types for talking to a hosted feature layer.

use std::fmt;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::output::StagingArtifact;

/// Short-lived bearer credential. Scoped to one invocation and never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Item id of an uploaded CSV, consumed by exactly one upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle(pub String);

/// URL of the asynchronous append job. Not polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHandle(pub String);

/// Exchanges long-lived client credentials for an [`AccessToken`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn request_token(&self) -> Result<AccessToken, SyncError>;
}

/// Write operations against one feature layer.
#[async_trait]
pub trait FeatureLayer: Send + Sync {
    /// Uploads the staged CSV as a new item.
    async fn upload(
        &self,
        artifact: &StagingArtifact,
        token: &AccessToken,
    ) -> Result<UploadHandle, SyncError>;

    /// Appends the uploaded item, upserting on `vehicle_id`.
    async fn upsert(
        &self,
        upload: UploadHandle,
        token: &AccessToken,
    ) -> Result<StatusHandle, SyncError>;

    /// Deletes every feature matching `where_clause` and returns the raw response.
    async fn delete_where(
        &self,
        where_clause: &str,
        token: &AccessToken,
    ) -> Result<serde_json::Value, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("very-secret");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
        assert_eq!(token.as_str(), "very-secret");
    }
}
