//! Concurrent fan-out/fan-in over a fixed set of providers.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::instrument;

use crate::{Fahrenheit, Kelvin, WeatherError, WeatherProvider};

/// An immutable, ordered set of providers queried together.
///
/// Every call to [`MultiWeatherProvider::temperature`] spawns its own tasks
/// and channels; nothing is shared between concurrent queries.
#[derive(Debug, Clone)]
pub struct MultiWeatherProvider {
    providers: Arc<[Arc<dyn WeatherProvider>]>,
    provider_timeout: Option<Duration>,
}

impl MultiWeatherProvider {
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Result<Self, WeatherError> {
        if providers.is_empty() {
            return Err(no_providers());
        }

        Ok(Self {
            providers: providers.into(),
            provider_timeout: None,
        })
    }

    /// Bound each provider call. Expiry is reported as an upstream error
    /// from that provider.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Query every provider concurrently and return the mean in Fahrenheit.
    ///
    /// Returns the first error to arrive without waiting for the remaining
    /// providers. Those keep running in the background; their outcomes are
    /// dropped.
    #[instrument(skip(self), fields(providers = self.providers.len()))]
    pub async fn temperature(&self, city: &str) -> Result<Fahrenheit, WeatherError> {
        let n = self.providers.len();
        if n == 0 {
            return Err(no_providers());
        }

        // Capacity n: a straggler can always deposit its outcome, even after
        // we have stopped reading.
        let (temps_tx, mut temps_rx) = mpsc::channel::<Kelvin>(n);
        let (errs_tx, mut errs_rx) = mpsc::channel::<WeatherError>(n);

        let city: Arc<str> = Arc::from(city);
        for provider in self.providers.iter() {
            let provider = Arc::clone(provider);
            let city = Arc::clone(&city);
            let temps_tx = temps_tx.clone();
            let errs_tx = errs_tx.clone();
            let timeout = self.provider_timeout;

            tokio::spawn(async move {
                // A send only fails once the receiver is gone, i.e. the
                // aggregation already returned. Late outcomes are discarded.
                match query(provider.as_ref(), &city, timeout).await {
                    Ok(k) => {
                        let _ = temps_tx.send(k).await;
                    }
                    Err(e) => {
                        let _ = errs_tx.send(e).await;
                    }
                }
            });
        }

        // Only the spawned tasks hold senders now, so both channels close
        // once every task has finished.
        drop(temps_tx);
        drop(errs_tx);

        let mut temps = Vec::with_capacity(n);
        while temps.len() < n {
            tokio::select! {
                Some(k) = temps_rx.recv() => temps.push(k),
                Some(err) = errs_rx.recv() => {
                    tracing::warn!(error = %err, "provider failed, abandoning aggregation");
                    return Err(err);
                }
                else => return Err(WeatherError::Interrupted),
            }
        }

        let mean = Kelvin::mean(&temps).ok_or_else(no_providers)?;
        tracing::debug!(mean_kelvin = mean.0, "aggregated temperature");

        Ok(mean.to_fahrenheit())
    }

    /// Query providers one after another, stopping at the first error, and
    /// return the mean in Kelvin. No concurrency and no unit conversion.
    pub async fn sequential_mean(&self, city: &str) -> Result<Kelvin, WeatherError> {
        let mut temps = Vec::with_capacity(self.providers.len());

        for provider in self.providers.iter() {
            temps.push(query(provider.as_ref(), city, self.provider_timeout).await?);
        }

        Kelvin::mean(&temps).ok_or_else(no_providers)
    }
}

async fn query(
    provider: &dyn WeatherProvider,
    city: &str,
    timeout: Option<Duration>,
) -> Result<Kelvin, WeatherError> {
    match timeout {
        None => provider.temperature(city).await,
        Some(limit) => tokio::time::timeout(limit, provider.temperature(city))
            .await
            .unwrap_or_else(|_| {
                Err(WeatherError::upstream(provider.name(), format!("timed out after {limit:?}")))
            }),
    }
}

fn no_providers() -> WeatherError {
    WeatherError::Configuration("at least one weather provider must be configured".to_string())
}
