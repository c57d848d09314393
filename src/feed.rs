//! Quake list feed client.
//!
//! Provides async HTTP access to the provider's JSON quake list.
//! Uses reqwest with rustls for TLS. No retries happen here; the scheduler
//! decides when to try again.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::FeedSettings;
use crate::errors::QuakeError;
use crate::models::RawRecord;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
pub const USER_AGENT: &str = concat!("quaketrack/", env!("CARGO_PKG_VERSION"));

/// Client for the quake list feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    url: String,
}

impl FeedClient {
    /// Create a new feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(settings: &FeedSettings) -> Result<Self, QuakeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: settings.url.clone(),
        })
    }

    /// Fetch one snapshot of the feed.
    ///
    /// # Errors
    ///
    /// Returns [`QuakeError::FeedUnavailable`] on transport failure or a
    /// non-2xx status, and [`QuakeError::FeedMalformed`] if the body is not a
    /// JSON array.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<Vec<RawRecord>, QuakeError> {
        debug!("fetching feed");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| QuakeError::FeedUnavailable(e.to_string()))?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            return Err(QuakeError::FeedUnavailable(format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| QuakeError::FeedUnavailable(e.to_string()))?;

        let records = parse_feed(&body)?;
        debug!("fetched {} records", records.len());
        Ok(records)
    }
}

/// Parse a feed body into raw records.
///
/// # Errors
///
/// Returns [`QuakeError::FeedMalformed`] unless the body is a JSON array.
pub fn parse_feed(body: &[u8]) -> Result<Vec<RawRecord>, QuakeError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items.into_iter().map(RawRecord::from_value).collect()),
        Ok(other) => Err(QuakeError::FeedMalformed(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(QuakeError::FeedMalformed(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> FeedClient {
        FeedClient::new(&FeedSettings {
            url: format!("{}/bosai/quake/data/list.json", server.uri()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bosai/quake/data/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"eid": "E1", "mag": "6.1"},
                {"eid": "E2", "mag": 3.0},
                17
            ])))
            .mount(&server)
            .await;

        let records = client_for(&server).await.fetch().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].eid.as_deref(), Some("E1"));
        assert_eq!(records[1].mag.as_deref(), Some("3.0"));
        assert!(records[2].eid.is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(err, QuakeError::FeedUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_object_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "busy"})))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(err, QuakeError::FeedMalformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let client = FeedClient::new(&FeedSettings {
            url: "http://127.0.0.1:9/list.json".to_string(),
        })
        .unwrap();

        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, QuakeError::FeedUnavailable(_)), "{err:?}");
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed(b"<html>maintenance</html>"),
            Err(QuakeError::FeedMalformed(_))
        ));
        assert!(parse_feed(b"[]").unwrap().is_empty());
    }
}
