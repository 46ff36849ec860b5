mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;

use crate::error::SyncError;

/// GETs `url` through `client` and returns the raw body.
///
/// A transport failure or any non-2xx status is a [`SyncError::Fetch`].
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes, SyncError> {
    let fetch_error = |message: String| SyncError::Fetch {
        url: url.to_string(),
        message,
    };

    let parsed =
        reqwest::Url::parse(url).map_err(|e| fetch_error(format!("invalid url: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(fetch_error(format!("status {status}")));
    }

    resp.bytes().await.map_err(|e| fetch_error(e.to_string()))
}

