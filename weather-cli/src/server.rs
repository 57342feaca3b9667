//! HTTP boundary: routes requests to the aggregator and renders the result.

use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use weather_core::{MultiWeatherProvider, WeatherReport};

#[derive(Clone)]
pub struct AppState {
    weather: Arc<MultiWeatherProvider>,
}

pub fn router(weather: MultiWeatherProvider) -> Router {
    let state = AppState {
        weather: Arc::new(weather),
    };

    Router::new()
        .route("/hello", get(hello))
        .route("/weather/", get(temperature_for_empty_city))
        .route("/weather/*city", get(temperature))
        .with_state(state)
}

pub async fn serve(listen_addr: &str, weather: MultiWeatherProvider) -> anyhow::Result<()> {
    let providers = weather.provider_names();
    let listener = TcpListener::bind(listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {listen_addr}: {e}"))?;

    tracing::info!(addr = %listener.local_addr()?, ?providers, "weather service listening");

    axum::serve(listener, router(weather))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn hello() -> &'static str {
    "hello!"
}

async fn temperature(State(state): State<AppState>, Path(city): Path<String>) -> Response {
    report(&state, city).await
}

/// `/weather/` with nothing after it still queries the providers, with an
/// empty city name.
async fn temperature_for_empty_city(State(state): State<AppState>) -> Response {
    report(&state, String::new()).await
}

async fn report(state: &AppState, city: String) -> Response {
    let begin = Instant::now();

    match state.weather.temperature(&city).await {
        Ok(temp) => Json(WeatherReport::new(city, temp, begin.elapsed())).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
