use crate::{
    Config, Kelvin, WeatherError,
    provider::{
        darksky::DarkSkyProvider, openweathermap::OpenWeatherMapProvider,
        wunderground::WeatherUndergroundProvider,
    },
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod darksky;
pub mod openweathermap;
pub mod wunderground;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeatherMap,
    WeatherUnderground,
    DarkSky,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::WeatherUnderground => "wunderground",
            ProviderId::DarkSky => "darksky",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeatherMap, ProviderId::WeatherUnderground, ProviderId::DarkSky]
    }

    /// Whether the provider needs a second (geocoding) credential.
    pub fn needs_geocode_key(&self) -> bool {
        matches!(self, ProviderId::DarkSky)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweathermap" | "openweather" => Ok(ProviderId::OpenWeatherMap),
            "wunderground" | "weatherunderground" => Ok(ProviderId::WeatherUnderground),
            "darksky" => Ok(ProviderId::DarkSky),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. \
                 Supported providers: openweathermap, wunderground, darksky."
            )),
        }
    }
}

/// One upstream integration: city name in, canonical temperature out.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    async fn temperature(&self, city: &str) -> Result<Kelvin, WeatherError>;
}

/// Send a prepared request and decode a JSON body of type `T`.
///
/// Transport failures and non-success statuses become `Upstream`,
/// an unreadable or mismatched body becomes `Decode`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: &str,
    what: &str,
    request: RequestBuilder,
) -> Result<T, WeatherError> {
    let res = request.send().await.map_err(|e| {
        WeatherError::upstream(provider, format!("failed to send {what} request: {e}"))
    })?;

    let status = res.status();
    let body = res.text().await.map_err(|e| {
        WeatherError::upstream(provider, format!("failed to read {what} response body: {e}"))
    })?;

    if !status.is_success() {
        return Err(WeatherError::upstream(
            provider,
            format!("{what} request failed with status {status}: {}", truncate_body(&body)),
        ));
    }

    serde_json::from_str(&body)
        .map_err(|e| WeatherError::decode(provider, format!("failed to parse {what} JSON: {e}")))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

pub(crate) fn http_client() -> Client {
    Client::new()
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider_cfg = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather configure {id}` or set {} in the environment.",
            crate::config::env_key_for(id)
        )
    })?;

    let api_key = provider_cfg.api_key.clone();

    let provider: Arc<dyn WeatherProvider> = match id {
        ProviderId::OpenWeatherMap => Arc::new(OpenWeatherMapProvider::new(api_key)),
        ProviderId::WeatherUnderground => Arc::new(WeatherUndergroundProvider::new(api_key)),
        ProviderId::DarkSky => {
            let geocode_key = provider_cfg.geocode_key.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "Provider '{id}' needs a geocoding key.\n\
                         Hint: run `weather configure {id}` or set {} in the environment.",
                    crate::config::GEOCODE_KEY_ENV
                )
            })?;
            Arc::new(DarkSkyProvider::new(api_key, geocode_key))
        }
    };

    Ok(provider)
}

/// Construct every configured provider, in `ProviderId::all()` order.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Vec<Arc<dyn WeatherProvider>>> {
    config
        .configured_providers()
        .into_iter()
        .map(|id| provider_from_config(id, config))
        .collect()
}
