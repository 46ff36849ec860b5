//! End-to-end synchronization of one mode's feed into the feature layer, and
//! age-based purging of rows the feed no longer refreshes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::feed::fetch_vehicle_positions;
use crate::fetch::HttpClient;
use crate::mode::TransitMode;
use crate::normalize::normalize;
use crate::output::{StagingArtifact, stage_dataset};
use crate::services::feature_layer::{
    AccessToken, FeatureLayer, StatusHandle, TokenProvider, UploadHandle,
};

/// Source of "now" for the purge cutoff.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Epoch seconds at or before which a row counts as stale.
///
/// Saturates instead of wrapping, so an oversized window never yields a
/// cutoff later than `now`.
pub fn stale_cutoff(now: DateTime<Utc>, window: Duration) -> i64 {
    let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
    now.timestamp().saturating_sub(window)
}

/// `where` clause selecting every row observed at or before `cutoff`.
pub fn stale_where_clause(cutoff: i64) -> String {
    format!("APIdate <= {cutoff}")
}

/// Outcome of one successful [`SyncOrchestrator::synchronize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub mode: TransitMode,
    pub rows: usize,
    pub upload: UploadHandle,
    pub status: StatusHandle,
}

/// Outcome of one successful [`SyncOrchestrator::purge_stale`].
#[derive(Debug, Clone, PartialEq)]
pub struct PurgeReport {
    pub cutoff: i64,
    pub response: serde_json::Value,
}

/// Owns the collaborators for feed-to-layer synchronization.
///
/// Holds no per-invocation state, so one instance can serve concurrent calls.
pub struct SyncOrchestrator {
    feed_client: Arc<dyn HttpClient>,
    tokens: Arc<dyn TokenProvider>,
    layer: Arc<dyn FeatureLayer>,
    clock: Arc<dyn Clock>,
    feed_base_url: String,
    staging_dir: PathBuf,
    purge_window: Duration,
}

impl SyncOrchestrator {
    pub fn new(
        config: &SyncConfig,
        feed_client: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenProvider>,
        layer: Arc<dyn FeatureLayer>,
    ) -> Self {
        Self {
            feed_client,
            tokens,
            layer,
            clock: Arc::new(SystemClock),
            feed_base_url: config.feed_base_url.clone(),
            staging_dir: config.staging_dir.clone(),
            purge_window: config.purge_window,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch, decode, normalize and stage one mode's feed.
    async fn stage(&self, mode: TransitMode) -> Result<(StagingArtifact, usize), SyncError> {
        let entities =
            fetch_vehicle_positions(&*self.feed_client, &self.feed_base_url, mode).await?;
        let dataset = normalize(&entities, mode);
        let artifact = stage_dataset(&dataset, &self.staging_dir).await?;
        Ok((artifact, dataset.len()))
    }

    async fn publish(
        &self,
        artifact: &StagingArtifact,
        token: &AccessToken,
    ) -> Result<(UploadHandle, StatusHandle), SyncError> {
        let upload = self.layer.upload(artifact, token).await?;
        let status = self.layer.upsert(upload.clone(), token).await?;
        Ok((upload, status))
    }

    /// Runs feed → table → upload → upsert once for `mode`.
    ///
    /// Token acquisition runs concurrently with fetching and staging. The
    /// first failing step aborts the rest; nothing is retried or rolled back.
    /// The staging file is removed whatever the outcome.
    #[tracing::instrument(skip(self), fields(mode = %mode))]
    pub async fn synchronize(&self, mode: TransitMode) -> Result<SyncReport, SyncError> {
        let (staged, token) = tokio::join!(self.stage(mode), self.tokens.request_token());

        let (artifact, rows) = staged?;
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                artifact.remove().await;
                return Err(e);
            }
        };
        debug!(rows, "Dataset staged, publishing");

        let published = self.publish(&artifact, &token).await;
        artifact.remove().await;
        let (upload, status) = published?;

        info!(rows, item_id = %upload.0, status_url = %status.0, "Synchronization complete");
        Ok(SyncReport {
            mode,
            rows,
            upload,
            status,
        })
    }

    /// Deletes every row whose `APIdate` is older than the purge window.
    #[tracing::instrument(skip(self))]
    pub async fn purge_stale(&self) -> Result<PurgeReport, SyncError> {
        let token = self.tokens.request_token().await?;

        let cutoff = stale_cutoff(self.clock.now(), self.purge_window);
        let response = self
            .layer
            .delete_where(&stale_where_clause(cutoff), &token)
            .await?;

        info!(cutoff, "Stale features purged");
        Ok(PurgeReport { cutoff, response })
    }
}
