use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::types::{
    AppendResponse, AppendSourceInfo, TokenResponse, UploadResponse, field_mappings,
};
use crate::config::FeatureLayerConfig;
use crate::error::SyncError;
use crate::output::StagingArtifact;
use crate::services::feature_layer::{
    AccessToken, FeatureLayer, StatusHandle, TokenProvider, UploadHandle,
};

/// REST client for an ArcGIS Online hosted feature layer and its OAuth2 endpoint.
pub struct ArcGisClient {
    http: reqwest::Client,
    config: FeatureLayerConfig,
}

impl ArcGisClient {
    pub fn new(config: FeatureLayerConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { http, config })
    }

    /// Sends `request` and parses the JSON body, rejecting non-2xx statuses.
    async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, String> {
        let response = request
            .send()
            .await
            .map_err(|e| format!("Failed to send request: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned status {status}: {body}"));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {e}"))
    }
}

#[async_trait]
impl TokenProvider for ArcGisClient {
    #[tracing::instrument(skip(self))]
    async fn request_token(&self) -> Result<AccessToken, SyncError> {
        let expiration = self.config.token_expiration_minutes.to_string();
        let form = [
            ("f", "json"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("expiration", expiration.as_str()),
        ];

        let response: TokenResponse =
            Self::send_json(self.http.post(&self.config.oauth_url).form(&form))
                .await
                .map_err(SyncError::Auth)?;

        if let Some(error) = response.error {
            return Err(SyncError::Auth(error.to_string()));
        }

        match response.access_token {
            Some(token) if !token.is_empty() => {
                debug!(expires_in = response.expires_in, "Access token acquired");
                Ok(AccessToken::new(token))
            }
            _ => Err(SyncError::Auth("response has no access_token".to_string())),
        }
    }
}

#[async_trait]
impl FeatureLayer for ArcGisClient {
    #[tracing::instrument(skip(self, artifact, token), fields(file = %artifact.path().display()))]
    async fn upload(
        &self,
        artifact: &StagingArtifact,
        token: &AccessToken,
    ) -> Result<UploadHandle, SyncError> {
        let body = tokio::fs::read(artifact.path())
            .await
            .map_err(|e| SyncError::Upload(format!("Failed to read staged file: {e}")))?;

        let part = Part::bytes(body)
            .file_name(artifact.file_name())
            .mime_str("text/csv")
            .map_err(|e| SyncError::Upload(e.to_string()))?;
        let form = Form::new()
            .part("csv_file", part)
            .text("f", "json")
            .text("token", token.as_str().to_string());

        let response: UploadResponse =
            Self::send_json(self.http.post(self.config.upload_url()).multipart(form))
                .await
                .map_err(SyncError::Upload)?;

        if let Some(error) = response.error {
            return Err(SyncError::Upload(error.to_string()));
        }

        match response.item.and_then(|item| item.item_id) {
            Some(item_id) if response.success => {
                debug!(item_id = %item_id, "Dataset uploaded");
                Ok(UploadHandle(item_id))
            }
            _ => Err(SyncError::Upload(
                "Error in getting upload ID: response not successful".to_string(),
            )),
        }
    }

    #[tracing::instrument(skip(self, token), fields(item_id = %upload.0))]
    async fn upsert(
        &self,
        upload: UploadHandle,
        token: &AccessToken,
    ) -> Result<StatusHandle, SyncError> {
        let field_mappings = serde_json::to_string(&field_mappings())
            .map_err(|e| SyncError::Upsert(e.to_string()))?;
        let append_source_info = serde_json::to_string(&AppendSourceInfo::csv_wgs84())
            .map_err(|e| SyncError::Upsert(e.to_string()))?;

        let form = [
            ("f", "json"),
            ("fieldMappings", field_mappings.as_str()),
            ("appendSourceInfo", append_source_info.as_str()),
            ("upsert", "true"),
            ("skipInserts", "false"),
            ("skipUpdates", "false"),
            ("useGlobalIds", "false"),
            ("updateGeometry", "true"),
            ("upsertMatchingField", "vehicle_id"),
            ("appendUploadId", upload.0.as_str()),
            ("appendUploadFormat", "csv"),
            ("rollbackOnFailure", "false"),
            ("token", token.as_str()),
        ];

        let response: AppendResponse =
            Self::send_json(self.http.post(self.config.append_url()).form(&form))
                .await
                .map_err(SyncError::Upsert)?;

        if let Some(error) = response.error {
            return Err(SyncError::Upsert(error.to_string()));
        }

        let status_url = response
            .status_url
            .ok_or_else(|| SyncError::Upsert("response has no statusUrl".to_string()))?;
        info!(status_url = %status_url, "Append job accepted");
        Ok(StatusHandle(status_url))
    }

    #[tracing::instrument(skip(self, token))]
    async fn delete_where(
        &self,
        where_clause: &str,
        token: &AccessToken,
    ) -> Result<serde_json::Value, SyncError> {
        let form = [("f", "json"), ("where", where_clause), ("token", token.as_str())];

        let response = self
            .http
            .post(self.config.delete_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| SyncError::Delete(format!("Failed to send request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Delete(format!("Failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(SyncError::Delete(format!("API returned status {status}: {body}")));
        }
        if body.trim().is_empty() {
            return Err(SyncError::Delete("empty response body".to_string()));
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| SyncError::Delete(format!("Failed to parse response: {e}")))?;
        if value.is_null() {
            return Err(SyncError::Delete("null response body".to_string()));
        }
        if let Some(error) = value.get("error") {
            return Err(SyncError::Delete(error.to_string()));
        }

        Ok(value)
    }
}
