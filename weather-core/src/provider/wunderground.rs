use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{Kelvin, WeatherError};

use super::{WeatherProvider, fetch_json, http_client};

const NAME: &str = "wunderground";
const DEFAULT_BASE_URL: &str = "http://api.wunderground.com";

/// Weather Underground current conditions, reported in Celsius.
#[derive(Debug, Clone)]
pub struct WeatherUndergroundProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherUndergroundProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            http: http_client(),
        }
    }

    /// `{base}/api/{key}/conditions/q/{city}.json`, with the city percent-encoded.
    fn conditions_url(&self, city: &str) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            WeatherError::Configuration(format!("invalid {NAME} base URL '{}': {e}", self.base_url))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                WeatherError::Configuration(format!("{NAME} base URL cannot carry a path"))
            })?
            .pop_if_empty()
            .extend(["api", self.api_key.as_str(), "conditions", "q", &format!("{city}.json")]);

        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct WuObservation {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WuResponse {
    current_observation: WuObservation,
}

#[async_trait]
impl WeatherProvider for WeatherUndergroundProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn temperature(&self, city: &str) -> Result<Kelvin, WeatherError> {
        let url = self.conditions_url(city)?;
        let parsed: WuResponse = fetch_json(NAME, "conditions", self.http.get(url)).await?;

        let kelvin = Kelvin::from_celsius(parsed.current_observation.temp_c);
        tracing::info!(provider = NAME, city, kelvin = kelvin.0, "temperature fetched");
        Ok(kelvin)
    }
}
