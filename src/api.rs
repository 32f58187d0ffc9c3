//! HTTP surface: quality lookups, nearby-resort search, admin cache reset.
//!
//! Response caching contract: successful quality payloads are public and
//! cacheable for the quality TTL (`Cache-Control: public, max-age=...`);
//! not-available payloads and admin responses are `no-store`. Every quality
//! response carries an `X-Snow-Cache: HIT|MISS` diagnostics header.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::cache::TtlCache;
use crate::config::{AppConfig, Resort, RESORTS_REGION};
use crate::elevation::ElevationWeights;
use crate::geo::{self, Coord};
use crate::quality::{QualityOutcome, QualityService};
use crate::weather::{BandScoreProvider, HttpBandScoreProvider};

/// Diagnostics header reporting cache behavior (`HIT` / `MISS`).
const CACHE_HEADER: &str = "x-snow-cache";

#[derive(Clone)]
pub struct AppState {
    service: Arc<QualityService>,
    cache: Arc<TtlCache>,
    resorts: Arc<Vec<Resort>>,
    quality_ttl_secs: u64,
}

impl AppState {
    pub fn new(config: &AppConfig, provider: Arc<dyn BandScoreProvider>) -> Self {
        let cache = Arc::new(TtlCache::with_regions(config.cache_regions()));
        let service = Arc::new(QualityService::new(
            Arc::clone(&cache),
            provider,
            ElevationWeights::shared().clone(),
        ));
        Self {
            service,
            cache,
            resorts: Arc::new(config.resorts.clone()),
            quality_ttl_secs: config.cache.quality.ttl_secs,
        }
    }

    pub fn service(&self) -> &Arc<QualityService> {
        &self.service
    }
}

/// Build the full application router from loaded config.
pub async fn app() -> anyhow::Result<Router> {
    let config = AppConfig::load_default()?;
    let provider = Arc::new(HttpBandScoreProvider::new(
        config.weather.base_url.clone(),
        config.weather_timeout(),
    )?);
    Ok(create_router(AppState::new(&config, provider)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/quality/{resort_id}", get(quality_one))
        .route("/quality", get(quality_bulk))
        .route("/resorts/near", get(resorts_near))
        .route("/admin/clear-cache", post(admin_clear_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct QualityParams {
    /// Optional explicit as-of bucket for pinning a time window.
    #[serde(default)]
    as_of_bucket: Option<u64>,
}

async fn quality_one(
    State(state): State<AppState>,
    Path(resort_id): Path<String>,
    Query(params): Query<QualityParams>,
) -> Response {
    if !state.resorts.iter().any(|r| r.id == resort_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown resort '{resort_id}'") })),
        )
            .into_response();
    }

    let (outcome, status) = state
        .service
        .quality_for(&resort_id, params.as_of_bucket)
        .await;

    let cache_control = match &outcome {
        QualityOutcome::Ready(_) => format!("public, max-age={}", state.quality_ttl_secs),
        QualityOutcome::InsufficientData { .. } => "no-store".to_string(),
    };

    (
        [
            ("cache-control", cache_control),
            (CACHE_HEADER, status.as_str().to_string()),
        ],
        Json(outcome),
    )
        .into_response()
}

#[derive(Deserialize)]
struct BulkParams {
    /// Comma-separated resort ids; defaults to the whole catalog.
    #[serde(default)]
    ids: Option<String>,
}

async fn quality_bulk(State(state): State<AppState>, Query(params): Query<BulkParams>) -> Response {
    let ids: Vec<String> = match params.ids {
        Some(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => state.resorts.iter().map(|r| r.id.clone()).collect(),
    };

    let results = state.service.quality_for_all(&ids).await;

    // A batch that carries any degraded entry must not be cached by
    // intermediaries, or recovery would be delayed past the TTL.
    let all_ready = results
        .values()
        .all(|o| matches!(o, QualityOutcome::Ready(_)));
    let cache_control = if all_ready {
        format!("public, max-age={}", state.quality_ttl_secs)
    } else {
        "no-store".to_string()
    };

    ([("cache-control", cache_control)], Json(results)).into_response()
}

#[derive(Serialize, Deserialize)]
struct NearParams {
    lat: f64,
    lon: f64,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
}

fn default_radius_km() -> f64 {
    50.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NearbyResort {
    id: String,
    name: String,
    distance_km: f64,
}

async fn resorts_near(State(state): State<AppState>, Query(params): Query<NearParams>) -> Response {
    let center = Coord {
        lat: params.lat,
        lon: params.lon,
    };
    let resorts = Arc::clone(&state.resorts);
    let radius = params.radius_km;

    let found = state
        .cache
        .get_or_compute_traced(RESORTS_REGION, &params, || async move {
            let hits = geo::within_radius(&resorts, center, radius, Resort::coord);
            Ok(hits
                .into_iter()
                .map(|(r, d)| NearbyResort {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    distance_km: (d * 10.0).round() / 10.0,
                })
                .collect::<Vec<_>>())
        })
        .await;

    match found {
        Ok((nearby, status)) => (
            [(CACHE_HEADER, status.as_str().to_string())],
            Json(nearby),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn admin_clear_cache(State(state): State<AppState>) -> Response {
    state.cache.clear_all();
    (
        [("cache-control", "no-store".to_string())],
        Json(serde_json::json!({ "cleared": true })),
    )
        .into_response()
}
