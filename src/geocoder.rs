//! Reverse geocoding of epicenters.
//!
//! Calls a Nominatim-compatible `/reverse` endpoint and extracts English city
//! and region (prefecture) names. Every failure is absorbed into
//! [`Place::unknown`]; geocoding never aborts ingestion or alerting.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::GeocoderSettings;
use crate::errors::QuakeError;
use crate::models::{Place, UNKNOWN_PLACE};
use crate::pacing::Pacer;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// The usage policy requires an identifying user agent.
const USER_AGENT: &str = concat!(
    "quaketrack/",
    env!("CARGO_PKG_VERSION"),
    " (earthquake ingestion and alerting)"
);

#[derive(Error, Debug)]
enum GeocodeFailure {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid response body: {0}")]
    Body(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    province: Option<String>,
}

impl Address {
    fn into_place(self) -> Place {
        let city = self.city.or(self.town).or(self.village);
        let region = self.state.or(self.province);
        Place {
            city: city.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
            region: region.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
        }
    }
}

/// Paced reverse geocoder shared by ingestion and alerting.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
    pacer: Pacer,
}

impl Geocoder {
    /// Create a geocoder with the given pacer.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(settings: &GeocoderSettings, pacer: Pacer) -> Result<Self, QuakeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            pacer,
        })
    }

    /// Resolve coordinates to a place, or `N/A` for both names on failure.
    #[instrument(skip(self))]
    pub async fn resolve(&self, lat: f64, lon: f64) -> Place {
        self.pacer.ready().await;

        match self.lookup(lat, lon).await {
            Ok(place) => {
                debug!(city = %place.city, region = %place.region, "resolved");
                place
            }
            Err(e) => {
                warn!("geocoding failed: {e}");
                Place::unknown()
            }
        }
    }

    async fn lookup(&self, lat: f64, lon: f64) -> Result<Place, GeocodeFailure> {
        let url = format!("{}/reverse", self.base_url);
        let lat = lat.to_string();
        let lon = lon.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("accept-language", "en"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeFailure::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: ReverseResponse = serde_json::from_slice(&body)?;
        Ok(parsed.address.into_place())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn geocoder(base_url: &str) -> Geocoder {
        let settings = GeocoderSettings {
            base_url: base_url.to_string(),
            cooldown: Duration::ZERO,
        };
        Geocoder::new(&settings, Pacer::unthrottled()).unwrap()
    }

    async fn serve(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_resolves_city_and_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "json"))
            .and(query_param("lat", "35.5"))
            .and(query_param("lon", "139.7"))
            .and(query_param("accept-language", "en"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": {"city": "Kisarazu", "state": "Chiba", "country": "Japan"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let place = geocoder(&server.uri()).resolve(35.5, 139.7).await;
        assert_eq!(place.city, "Kisarazu");
        assert_eq!(place.region, "Chiba");
    }

    #[tokio::test]
    async fn test_fallback_chains() {
        let server = serve(json!({"address": {"village": "Oshima", "province": "Tokyo"}})).await;
        let place = geocoder(&server.uri()).resolve(34.7, 139.4).await;
        assert_eq!(place.city, "Oshima");
        assert_eq!(place.region, "Tokyo");

        let server = serve(json!({"address": {"town": "Suzu", "village": "ignored"}})).await;
        let place = geocoder(&server.uri()).resolve(37.4, 137.2).await;
        assert_eq!(place.city, "Suzu");
        assert_eq!(place.region, "N/A");
    }

    #[tokio::test]
    async fn test_no_address_is_unknown() {
        // Offshore points come back without an address.
        let server = serve(json!({"error": "Unable to geocode"})).await;
        let place = geocoder(&server.uri()).resolve(30.0, 145.0).await;
        assert_eq!(place, Place::unknown());
    }

    #[tokio::test]
    async fn test_server_error_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let place = geocoder(&server.uri()).resolve(35.5, 139.7).await;
        assert_eq!(place, Place::unknown());
    }

    #[tokio::test]
    async fn test_malformed_json_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let place = geocoder(&server.uri()).resolve(35.5, 139.7).await;
        assert_eq!(place, Place::unknown());
    }

    #[tokio::test]
    async fn test_resolve_waits_for_pacer() {
        let server = serve(json!({"address": {"city": "Kobe", "state": "Hyogo"}})).await;
        let settings = GeocoderSettings {
            base_url: server.uri(),
            cooldown: Duration::from_millis(100),
        };
        let paced = Geocoder::new(&settings, Pacer::every(settings.cooldown)).unwrap();

        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(paced.resolve(34.7, 135.2).await.region, "Hyogo");
        }
        assert!(start.elapsed() >= Duration::from_millis(180), "{:?}", start.elapsed());
    }

    #[tokio::test]
    async fn test_clones_share_pacing() {
        let server = serve(json!({"address": {"city": "Kobe", "state": "Hyogo"}})).await;
        let settings = GeocoderSettings {
            base_url: server.uri(),
            cooldown: Duration::from_millis(100),
        };
        let paced = Geocoder::new(&settings, Pacer::every(settings.cooldown)).unwrap();
        let other = paced.clone();

        let start = Instant::now();
        paced.resolve(34.7, 135.2).await;
        other.resolve(34.7, 135.2).await;
        paced.resolve(34.7, 135.2).await;
        assert!(start.elapsed() >= Duration::from_millis(180), "{:?}", start.elapsed());
    }

    #[tokio::test]
    async fn test_network_error_is_unknown() {
        let place = geocoder("http://127.0.0.1:9").resolve(35.5, 139.7).await;
        assert_eq!((place.city.as_str(), place.region.as_str()), ("N/A", "N/A"));
    }
}
