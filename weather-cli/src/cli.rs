use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_core::{
    Config, MultiWeatherProvider, ProviderConfig, ProviderId, providers_from_config,
};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Multi-provider weather aggregator")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweathermap", "wunderground" or "darksky".
        provider: String,
    },

    /// Show the aggregated temperature for a city.
    Show {
        /// City name.
        city: String,
    },

    /// Serve aggregated temperatures over HTTP.
    Serve {
        /// Address to listen on; overrides `server.listen_addr`.
        #[arg(long)]
        listen: Option<String>,
    },

    /// List supported providers and whether they are configured.
    Providers,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure { provider } => configure(&config_path, &provider),
            Command::Show { city } => {
                let weather = aggregator(&load_with_env(&config_path)?)?;

                let begin = Instant::now();
                let temp = weather.temperature(&city).await?;
                println!("{city}: {temp} (took {:?})", begin.elapsed());
                Ok(())
            }
            Command::Serve { listen } => {
                let config = load_with_env(&config_path)?;
                let weather = aggregator(&config)?;
                let addr = listen.unwrap_or_else(|| config.server.listen_addr.clone());
                server::serve(&addr, weather).await
            }
            Command::Providers => {
                let config = load_with_env(&config_path)?;
                for id in ProviderId::all() {
                    let status = if config.is_provider_configured(*id) {
                        "configured"
                    } else {
                        "not configured"
                    };
                    println!("{:<15} {status}", id.as_str());
                }
                Ok(())
            }
        }
    }
}

fn load_with_env(path: &std::path::Path) -> anyhow::Result<Config> {
    let mut config = Config::load_from(path)?;
    config.apply_env();
    Ok(config)
}

/// Build the provider set once; it stays fixed for the life of the process.
fn aggregator(config: &Config) -> anyhow::Result<MultiWeatherProvider> {
    let providers = providers_from_config(config)?;
    let weather = MultiWeatherProvider::new(providers).context(
        "No weather providers configured.\n\
         Hint: run `weather configure <provider>` or set provider keys in the environment.",
    )?;

    Ok(match config.provider_timeout() {
        Some(timeout) => weather.with_provider_timeout(timeout),
        None => weather,
    })
}

fn configure(config_path: &std::path::Path, provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load_from(config_path)?;

    let api_key = prompt_secret(&format!("API key for {id}:"))?;
    let geocode_key = if id.needs_geocode_key() {
        Some(prompt_secret("Google geocoding API key:")?)
    } else {
        None
    };

    config.upsert_provider(
        id,
        ProviderConfig {
            api_key,
            geocode_key,
        },
    );
    config.save_to(config_path)?;

    println!("Saved credentials for {id} to {}", config_path.display());
    Ok(())
}

fn prompt_secret(message: &str) -> anyhow::Result<String> {
    let value = Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read input")?;

    let value = value.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("Value must not be empty");
    }
    Ok(value)
}
