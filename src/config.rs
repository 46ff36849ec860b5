//! Process-wide settings, built once at startup and handed to each component.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FEED_BASE_URL: &str = "https://api.transport.nsw.gov.au/v1/gtfs/vehiclepos";
pub const DEFAULT_OAUTH_URL: &str = "https://www.arcgis.com/sharing/rest/oauth2/token/";
/// Token lifetime requested from the OAuth endpoint, in minutes.
pub const DEFAULT_TOKEN_EXPIRATION_MINUTES: u32 = 1440;
/// Rows whose `APIdate` is at least this old are purged.
pub const DEFAULT_PURGE_WINDOW: Duration = Duration::from_secs(60);

/// Credentials and endpoints of the hosted feature layer.
#[derive(Clone)]
pub struct FeatureLayerConfig {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_url: String,
    /// Feature service root, e.g. `https://services.arcgis.com/<org>/arcgis/rest/services/<name>/FeatureServer`.
    pub feature_server_url: String,
    pub layer_id: u32,
    pub token_expiration_minutes: u32,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl FeatureLayerConfig {
    pub fn upload_url(&self) -> String {
        format!("{}/uploads/upload", self.server_root())
    }

    pub fn append_url(&self) -> String {
        format!("{}/{}/append", self.server_root(), self.layer_id)
    }

    pub fn delete_url(&self) -> String {
        format!("{}/{}/deleteFeatures", self.server_root(), self.layer_id)
    }

    fn server_root(&self) -> &str {
        self.feature_server_url.trim_end_matches('/')
    }
}

impl fmt::Debug for FeatureLayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureLayerConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("oauth_url", &self.oauth_url)
            .field("feature_server_url", &self.feature_server_url)
            .field("layer_id", &self.layer_id)
            .field("token_expiration_minutes", &self.token_expiration_minutes)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Everything one orchestrator needs for its lifetime.
#[derive(Clone)]
pub struct SyncConfig {
    pub feed_base_url: String,
    pub feed_api_key: String,
    pub feature_layer: FeatureLayerConfig,
    pub staging_dir: PathBuf,
    pub purge_window: Duration,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("feed_base_url", &self.feed_base_url)
            .field("feed_api_key", &"<redacted>")
            .field("feature_layer", &self.feature_layer)
            .field("staging_dir", &self.staging_dir)
            .field("purge_window", &self.purge_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(url: &str) -> FeatureLayerConfig {
        FeatureLayerConfig {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
            oauth_url: DEFAULT_OAUTH_URL.into(),
            feature_server_url: url.into(),
            layer_id: 0,
            token_expiration_minutes: DEFAULT_TOKEN_EXPIRATION_MINUTES,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let cfg = layer("https://example.test/FeatureServer/");
        assert_eq!(cfg.upload_url(), "https://example.test/FeatureServer/uploads/upload");
        assert_eq!(cfg.append_url(), "https://example.test/FeatureServer/0/append");
        assert_eq!(cfg.delete_url(), "https://example.test/FeatureServer/0/deleteFeatures");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cfg = SyncConfig {
            feed_base_url: DEFAULT_FEED_BASE_URL.into(),
            feed_api_key: "tfnsw-key".into(),
            feature_layer: layer("https://example.test/FeatureServer"),
            staging_dir: std::env::temp_dir(),
            purge_window: DEFAULT_PURGE_WINDOW,
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tfnsw-key"));
    }
}
