//! Vehicle-position feed retrieval for one transit mode.

use tracing::debug;

use crate::error::SyncError;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedEntity;
use crate::mode::TransitMode;
use crate::parser::parse_feed;

/// Fetches the feed for `mode` under `base_url` and decodes its entities.
#[tracing::instrument(skip(client), fields(mode = %mode))]
pub async fn fetch_vehicle_positions<C: HttpClient + ?Sized>(
    client: &C,
    base_url: &str,
    mode: TransitMode,
) -> Result<Vec<FeedEntity>, SyncError> {
    let url = mode.feed_url(base_url);
    let bytes = fetch_bytes(client, &url).await?;
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");

    let feed = parse_feed(&bytes)?;
    debug!(entity_count = feed.entity.len(), "Feed parsed successfully");

    Ok(feed.entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use crate::fetch::auth::ApiKey;
    use crate::gtfs_rt::{FeedHeader, FeedMessage};
    use prost::Message;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn encoded_feed(ids: &[&str]) -> Vec<u8> {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                ..Default::default()
            },
            entity: ids
                .iter()
                .map(|id| FeedEntity {
                    id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
        .encode_to_vec()
    }

    #[tokio::test]
    async fn test_fetches_mode_endpoint_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehiclepos/ferries"))
            .and(header("authorization", "apikey secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(encoded_feed(&["a", "b"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiKey::tfnsw(BasicClient::new(), "secret").unwrap();
        let base = format!("{}/vehiclepos", server.uri());
        let entities = fetch_vehicle_positions(&client, &base, TransitMode::Ferries)
            .await
            .unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, "a");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result =
            fetch_vehicle_positions(&BasicClient::new(), &server.uri(), TransitMode::Buses).await;

        assert!(matches!(result, Err(SyncError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFE, 0x00, 0x01]))
            .mount(&server)
            .await;

        let result =
            fetch_vehicle_positions(&BasicClient::new(), &server.uri(), TransitMode::Buses).await;

        assert!(matches!(result, Err(SyncError::Decode { .. })));
    }
}
