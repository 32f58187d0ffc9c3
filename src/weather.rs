//! Weather/storage collaborator boundary: per-band score retrieval.
//!
//! The service only ever asks for "the current band scores for resort X" as
//! a single bounded call. Retry policy lives with the collaborator; a failed
//! fetch is recovered by the caller as insufficient data for that resort.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::aggregate::ElevationScore;
use crate::elevation::ElevationBand;

/// Supplies current per-elevation-band scores for a resort.
#[async_trait]
pub trait BandScoreProvider: Send + Sync {
    async fn fetch_band_scores(&self, resort_id: &str) -> Result<BTreeMap<String, ElevationScore>>;
}

/// Response shape of the upstream conditions endpoint.
#[derive(Debug, Deserialize)]
struct ConditionsResponse {
    #[serde(default)]
    bands: BTreeMap<String, BandReading>,
}

#[derive(Debug, Deserialize)]
struct BandReading {
    score: f64,
    #[serde(default)]
    sample_count: Option<u32>,
}

/// HTTP adapter for the upstream conditions API.
///
/// One attempt per call, bounded by the configured timeout. No retries.
#[derive(Debug, Clone)]
pub struct HttpBandScoreProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBandScoreProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building conditions HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl BandScoreProvider for HttpBandScoreProvider {
    async fn fetch_band_scores(&self, resort_id: &str) -> Result<BTreeMap<String, ElevationScore>> {
        let url = format!(
            "{}/resorts/{}/conditions",
            self.base_url.trim_end_matches('/'),
            resort_id
        );
        debug!(resort_id, %url, "fetching band scores");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting conditions for '{resort_id}'"))?
            .error_for_status()
            .with_context(|| format!("conditions endpoint rejected '{resort_id}'"))?;

        let body: ConditionsResponse = resp
            .json()
            .await
            .with_context(|| format!("decoding conditions for '{resort_id}'"))?;

        Ok(body
            .bands
            .into_iter()
            .map(|(band, r)| {
                // Canonicalize known labels ("Top" → "top"); other labels
                // pass through and resolve via weight aliases or default.
                let band = ElevationBand::parse(&band)
                    .map(|b| b.label().to_string())
                    .unwrap_or(band);
                (
                    band,
                    ElevationScore {
                        score: r.score,
                        sample_count: r.sample_count,
                    },
                )
            })
            .collect())
    }
}

/// Fixed in-memory provider for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBandScoreProvider {
    readings: HashMap<String, BTreeMap<String, ElevationScore>>,
}

impl StaticBandScoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resort(
        mut self,
        resort_id: impl Into<String>,
        bands: BTreeMap<String, ElevationScore>,
    ) -> Self {
        self.readings.insert(resort_id.into(), bands);
        self
    }
}

#[async_trait]
impl BandScoreProvider for StaticBandScoreProvider {
    async fn fetch_band_scores(&self, resort_id: &str) -> Result<BTreeMap<String, ElevationScore>> {
        self.readings
            .get(resort_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no readings for resort '{resort_id}'"))
    }
}
