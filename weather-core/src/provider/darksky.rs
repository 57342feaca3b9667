use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{Kelvin, WeatherError};

use super::{WeatherProvider, fetch_json, http_client};

const NAME: &str = "darksky";
const DEFAULT_FORECAST_URL: &str = "https://api.darksky.net";
const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com";

/// Dark Sky weather by coordinates. The city is first resolved through the
/// Google geocoding API; if that fails the forecast call is never made.
#[derive(Debug, Clone)]
pub struct DarkSkyProvider {
    api_key: String,
    geocode_key: String,
    forecast_url: String,
    geocode_url: String,
    http: Client,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl DarkSkyProvider {
    pub fn new(api_key: String, geocode_key: String) -> Self {
        Self::with_base_urls(api_key, geocode_key, DEFAULT_FORECAST_URL, DEFAULT_GEOCODE_URL)
    }

    pub fn with_base_urls(
        api_key: String,
        geocode_key: String,
        forecast_url: impl Into<String>,
        geocode_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            geocode_key,
            forecast_url: forecast_url.into().trim_end_matches('/').to_string(),
            geocode_url: geocode_url.into().trim_end_matches('/').to_string(),
            http: http_client(),
        }
    }

    pub async fn coordinates(&self, city: &str) -> Result<Coordinates, WeatherError> {
        let url = format!("{}/maps/api/geocode/json", self.geocode_url);
        let request = self
            .http
            .get(url)
            .query(&[("address", city), ("key", self.geocode_key.as_str())]);

        let parsed: GeocodeResponse = fetch_json(NAME, "geocode", request).await?;

        let location = parsed
            .results
            .first()
            .map(|r| r.geometry.location)
            .ok_or_else(|| {
                WeatherError::decode(NAME, format!("geocode returned no results for '{city}'"))
            })?;

        Ok(Coordinates {
            lat: location.lat,
            lng: location.lng,
        })
    }

    /// `{base}/forecast/{key}/{lat},{lng}`, each segment percent-encoded.
    fn forecast_request_url(&self, coords: Coordinates) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&self.forecast_url).map_err(|e| {
            WeatherError::Configuration(format!(
                "invalid {NAME} forecast URL '{}': {e}",
                self.forecast_url
            ))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                WeatherError::Configuration(format!("{NAME} forecast URL cannot carry a path"))
            })?
            .pop_if_empty()
            .extend([
                "forecast",
                self.api_key.as_str(),
                &format!("{},{}", coords.lat, coords.lng),
            ]);

        Ok(url)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct DsCurrently {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct DsForecast {
    currently: DsCurrently,
}

#[async_trait]
impl WeatherProvider for DarkSkyProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn temperature(&self, city: &str) -> Result<Kelvin, WeatherError> {
        let coords = self.coordinates(city).await?;

        let url = self.forecast_request_url(coords)?;
        let request = self
            .http
            .get(url)
            .query(&[("exclude", "minutely,hourly,daily,alerts,flags"), ("units", "si")]);

        let parsed: DsForecast = fetch_json(NAME, "forecast", request).await?;

        // units=si reports Celsius
        let kelvin = Kelvin::from_celsius(parsed.currently.temperature);
        tracing::info!(provider = NAME, city, kelvin = kelvin.0, "temperature fetched");
        Ok(kelvin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_geocode(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("address", "Paris"))
            .and(query_param("key", "GKEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn paris_geocode() -> serde_json::Value {
        serde_json::json!({
            "results": [
                { "geometry": { "location": { "lat": 48.85, "lng": 2.35 } } }
            ],
            "status": "OK"
        })
    }

    #[tokio::test]
    async fn geocodes_then_fetches_forecast() {
        let geocode = MockServer::start().await;
        let forecast = MockServer::start().await;

        mount_geocode(&geocode, paris_geocode()).await;

        Mock::given(method("GET"))
            .and(path("/forecast/DKEY/48.85,2.35"))
            .and(query_param("units", "si"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "currently": { "temperature": 10.0 }
            })))
            .expect(1)
            .mount(&forecast)
            .await;

        let provider = DarkSkyProvider::with_base_urls(
            "DKEY".into(),
            "GKEY".into(),
            forecast.uri(),
            geocode.uri(),
        );

        let k = provider.temperature("Paris").await.expect("temperature");
        assert!((k.0 - 283.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_geocode_result_skips_forecast() {
        let geocode = MockServer::start().await;
        let forecast = MockServer::start().await;

        let no_results = serde_json::json!({ "results": [], "status": "ZERO_RESULTS" });
        mount_geocode(&geocode, no_results).await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&forecast)
            .await;

        let provider = DarkSkyProvider::with_base_urls(
            "DKEY".into(),
            "GKEY".into(),
            forecast.uri(),
            geocode.uri(),
        );

        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("no results"));
    }

    #[tokio::test]
    async fn geocode_failure_is_upstream_error() {
        let geocode = MockServer::start().await;
        let forecast = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&geocode)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&forecast)
            .await;

        let provider = DarkSkyProvider::with_base_urls(
            "DKEY".into(),
            "GKEY".into(),
            forecast.uri(),
            geocode.uri(),
        );

        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("geocode"));
    }

    #[tokio::test]
    async fn forecast_failure_is_upstream_error() {
        let geocode = MockServer::start().await;
        let forecast = MockServer::start().await;

        mount_geocode(&geocode, paris_geocode()).await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("daily usage limit exceeded"))
            .mount(&forecast)
            .await;

        let provider = DarkSkyProvider::with_base_urls(
            "DKEY".into(),
            "GKEY".into(),
            forecast.uri(),
            geocode.uri(),
        );

        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("forecast request failed with status 403"));
    }

    #[test]
    fn forecast_url_encodes_api_key() {
        let provider = DarkSkyProvider::with_base_urls(
            "a/b c".into(),
            "GKEY".into(),
            "http://example.test/",
            "http://example.test",
        );

        let url = provider
            .forecast_request_url(Coordinates {
                lat: 48.85,
                lng: 2.35,
            })
            .unwrap();
        assert_eq!(url.path(), "/forecast/a%2Fb%20c/48.85,2.35");
    }

    #[tokio::test]
    async fn invalid_forecast_url_is_configuration_error() {
        let geocode = MockServer::start().await;
        mount_geocode(&geocode, paris_geocode()).await;

        let provider = DarkSkyProvider::with_base_urls(
            "DKEY".into(),
            "GKEY".into(),
            "not a url",
            geocode.uri(),
        );

        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_configuration());
    }
}
