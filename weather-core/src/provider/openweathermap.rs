use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{Kelvin, WeatherError};

use super::{WeatherProvider, fetch_json, http_client};

const NAME: &str = "openweathermap";
const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";

/// OpenWeatherMap current weather. Without a `units` parameter the API
/// already answers in Kelvin, so values pass through unchanged.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherMapProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: http_client(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn temperature(&self, city: &str) -> Result<Kelvin, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let request = self
            .http
            .get(url)
            .query(&[("APPID", self.api_key.as_str()), ("q", city)]);

        let parsed: OwmResponse = fetch_json(NAME, "current weather", request).await?;

        let kelvin = Kelvin(parsed.main.temp);
        tracing::info!(provider = NAME, city, kelvin = kelvin.0, "temperature fetched");
        Ok(kelvin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn passes_kelvin_through() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("APPID", "KEY"))
            .and(query_param("q", "New York"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "New York",
                "main": { "temp": 288.4, "humidity": 60 }
            })))
            .mount(&server)
            .await;

        let provider = OpenWeatherMapProvider::with_base_url("KEY".into(), server.uri());
        let k = provider.temperature("New York").await.expect("temperature");
        assert_eq!(k, Kelvin(288.4));
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"cod":401,"message":"Invalid API key"}"#),
            )
            .mount(&server)
            .await;

        let provider = OpenWeatherMapProvider::with_base_url("BAD".into(), server.uri());
        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_upstream());
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid API key"));
    }

    #[tokio::test]
    async fn unexpected_shape_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "weather": [] })),
            )
            .mount(&server)
            .await;

        let provider = OpenWeatherMapProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_upstream_error() {
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let provider = OpenWeatherMapProvider::with_base_url("KEY".into(), uri);
        let err = provider.temperature("Paris").await.unwrap_err();
        assert!(err.is_upstream());
    }
}
