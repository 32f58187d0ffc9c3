//! Batch snapshot job: aggregate every catalog resort and write static JSON
//! files (one per resort plus an index) for edge caching.
//!
//! Output directory: $SNOWLINE_SNAPSHOT_DIR, default `snapshots/`.

use std::path::PathBuf;
use std::sync::Arc;

use snowline::config::AppConfig;
use snowline::elevation::ElevationWeights;
use snowline::quality::QualityService;
use snowline::snapshot;
use snowline::weather::HttpBandScoreProvider;
use snowline::TtlCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default()?;
    let out_dir = std::env::var("SNOWLINE_SNAPSHOT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("snapshots"));

    let cache = Arc::new(TtlCache::with_regions(config.cache_regions()));
    let provider = Arc::new(HttpBandScoreProvider::new(
        config.weather.base_url.clone(),
        config.weather_timeout(),
    )?);
    let service = QualityService::new(cache, provider, ElevationWeights::shared().clone());

    let ids: Vec<String> = config.resorts.iter().map(|r| r.id.clone()).collect();
    let (results, index) = snapshot::build_snapshot(&service, &ids).await;
    snapshot::write_snapshot(&out_dir, &results, &index).await?;

    println!(
        "snapshot done: {}/{} resorts ready",
        index.resorts_ready, index.resorts_total
    );
    Ok(())
}
