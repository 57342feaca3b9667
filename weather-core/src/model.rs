use serde::{Deserialize, Serialize};

/// Offset between the Celsius and Kelvin scales.
pub const ZERO_CELSIUS_IN_KELVIN: f64 = 273.15;

/// Canonical temperature. Every provider normalizes into this before
/// handing a value to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Kelvin(pub f64);

/// Temperature in the unit reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fahrenheit(pub f64);

impl Kelvin {
    pub fn from_celsius(celsius: f64) -> Self {
        Self(celsius + ZERO_CELSIUS_IN_KELVIN)
    }

    pub fn to_fahrenheit(self) -> Fahrenheit {
        let celsius = self.0 - ZERO_CELSIUS_IN_KELVIN;
        Fahrenheit(celsius * 1.8 + 32.0)
    }

    /// Arithmetic mean; `None` for an empty slice.
    pub fn mean(temps: &[Kelvin]) -> Option<Kelvin> {
        if temps.is_empty() {
            return None;
        }

        let sum: f64 = temps.iter().map(|k| k.0).sum();
        Some(Kelvin(sum / temps.len() as f64))
    }
}

impl std::fmt::Display for Kelvin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}K", self.0)
    }
}

impl std::fmt::Display for Fahrenheit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}°F", self.0)
    }
}

/// Success body returned by the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    /// Reported temperature, truncated toward zero.
    pub temp: i64,
    /// Wall-clock time the aggregation took, e.g. `"152.3ms"`.
    pub took: String,
}

impl WeatherReport {
    pub fn new(city: impl Into<String>, temp: Fahrenheit, took: std::time::Duration) -> Self {
        Self {
            city: city.into(),
            temp: temp.0.trunc() as i64,
            took: format!("{took:?}"),
        }
    }
}
