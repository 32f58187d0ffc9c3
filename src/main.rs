//! Snowline — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snowline::api::{create_router, AppState};
use snowline::config::AppConfig;
use snowline::metrics::Metrics;
use snowline::weather::HttpBandScoreProvider;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - SNOWLINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("SNOWLINE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snowline=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = AppConfig::load_default().expect("Failed to load snowline config");

    let metrics = Metrics::init(config.cache.quality.ttl_secs);

    let provider = Arc::new(
        HttpBandScoreProvider::new(config.weather.base_url.clone(), config.weather_timeout())
            .expect("Failed to build conditions client"),
    );

    let state = AppState::new(&config, provider);
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
