use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a fixed credential as an HTTP header.
///
/// The TfNSW open data API expects `Authorization: apikey <key>` on every feed
/// request; [`ApiKey::tfnsw`] builds exactly that.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Validates the header name and value up front so `execute` cannot fail on them.
    pub fn new(inner: C, header_name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(value).context("invalid header value")?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// `Authorization: apikey <key>`.
    pub fn tfnsw(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, "Authorization", &format!("apikey {key}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_invalid_header_name() {
        assert!(ApiKey::new(BasicClient::new(), "bad header", "x").is_err());
    }

    #[test]
    fn test_rejects_control_characters_in_value() {
        assert!(ApiKey::tfnsw(BasicClient::new(), "abc\ndef").is_err());
    }
}
