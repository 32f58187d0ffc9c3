//! Prometheus wiring. The recorder is installed once at startup; the
//! counters themselves are emitted at the call sites in the cache and
//! aggregator, so this module only owns registration and exposition.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder, register descriptions for every
    /// metric this crate emits, and publish the quality-region TTL as a
    /// static gauge.
    pub fn init(quality_ttl_secs: u64) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!(
            "snow_cache_hits_total",
            "Cache lookups served from a live entry, labeled by region."
        );
        describe_counter!(
            "snow_cache_misses_total",
            "Cache lookups that ran the compute path, labeled by region."
        );
        describe_counter!(
            "snow_bands_dropped_total",
            "Band scores excluded from aggregation as out of range or non-finite."
        );
        describe_gauge!(
            "snow_quality_cache_ttl_seconds",
            "Configured TTL of the quality cache region (absolute, no sliding refresh)."
        );
        gauge!("snow_quality_cache_ttl_seconds").set(quality_ttl_secs as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
