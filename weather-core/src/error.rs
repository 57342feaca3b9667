use thiserror::Error;

/// Failures surfaced by providers and by the aggregator.
///
/// The aggregator hands back the first provider error it observes unchanged,
/// so the variant and message a caller sees are the ones the provider produced.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Transport failure, timeout or non-success status from an upstream.
    #[error("{provider}: {message}")]
    Upstream { provider: String, message: String },

    /// The upstream answered, but not with the shape we expected.
    #[error("{provider}: {message}")]
    Decode { provider: String, message: String },

    /// The aggregator or a provider was set up in a way that cannot work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A provider task stopped without reporting (panicked or was aborted).
    #[error("a provider task ended without reporting a result")]
    Interrupted,
}

impl WeatherError {
    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn decode(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_names_provider() {
        let err = WeatherError::upstream("openweathermap", "status 503 Service Unavailable: down");
        assert!(err.is_upstream());
        assert_eq!(err.to_string(), "openweathermap: status 503 Service Unavailable: down");
    }

    #[test]
    fn configuration_message() {
        let err = WeatherError::Configuration("no providers configured".into());
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no providers configured"));
    }
}
