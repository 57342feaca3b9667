//! Core library for the `weather` service.
//!
//! This crate defines:
//! - Canonical temperature types and the unit conversions between them
//! - Abstraction over weather providers, with one implementation per upstream
//! - The concurrent aggregator that fans a query out to every provider
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use aggregator::MultiWeatherProvider;
pub use config::{Config, ProviderConfig, ServerConfig};
pub use error::WeatherError;
pub use model::{Fahrenheit, Kelvin, WeatherReport};
pub use provider::{ProviderId, WeatherProvider, provider_from_config, providers_from_config};
