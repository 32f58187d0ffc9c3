//! # Cached Quality Service
//! The externally visible "get snow quality for resort X" operation.
//!
//! Wraps the aggregator behind the TTL cache: the cache key is built from
//! `(resort_id, optional as-of bucket)`, and on a miss the service fetches
//! per-band scores from the weather collaborator and aggregates them.
//! Interactive lookups and the batch snapshot job share the same cache
//! region, so a batch run warms the cache for subsequent requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::{self, AggregatedQuality};
use crate::cache::{CacheStatus, TtlCache};
use crate::elevation::ElevationWeights;
use crate::weather::BandScoreProvider;

/// Cache region shared by interactive and batch quality lookups.
pub const QUALITY_REGION: &str = "quality";

/// Result of a quality lookup: either a computed summary or an explicit
/// not-available indicator. Callers never see a silently wrong number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QualityOutcome {
    Ready(AggregatedQuality),
    InsufficientData { resort_id: String, reason: String },
}

impl QualityOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, QualityOutcome::Ready(_))
    }
}

/// Cache key arguments. Serialized canonically, so field order here is
/// irrelevant to the fingerprint.
#[derive(Serialize)]
struct QualityKey<'a> {
    resort_id: &'a str,
    as_of_bucket: Option<u64>,
}

/// Facade over cache + aggregator + weather collaborator.
pub struct QualityService {
    cache: Arc<TtlCache>,
    provider: Arc<dyn BandScoreProvider>,
    weights: ElevationWeights,
}

impl QualityService {
    pub fn new(
        cache: Arc<TtlCache>,
        provider: Arc<dyn BandScoreProvider>,
        weights: ElevationWeights,
    ) -> Self {
        Self {
            cache,
            provider,
            weights,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    /// Quality summary for one resort.
    ///
    /// Upstream failures and empty band data both collapse to
    /// [`QualityOutcome::InsufficientData`]; neither is cached, so the next
    /// call retries the fetch.
    pub async fn quality_for(
        &self,
        resort_id: &str,
        as_of_bucket: Option<u64>,
    ) -> (QualityOutcome, CacheStatus) {
        let key = QualityKey {
            resort_id,
            as_of_bucket,
        };

        let computed = self
            .cache
            .get_or_compute_traced(QUALITY_REGION, &key, || self.compute_fresh(resort_id))
            .await;

        match computed {
            Ok((quality, status)) => (QualityOutcome::Ready(quality), status),
            Err(err) => {
                warn!(resort_id, error = %err, "quality unavailable");
                (
                    QualityOutcome::InsufficientData {
                        resort_id: resort_id.to_string(),
                        reason: err.to_string(),
                    },
                    CacheStatus::Miss,
                )
            }
        }
    }

    /// Batch lookup over many resorts. Per-resort failures are recorded as
    /// insufficient-data entries and never abort the rest of the batch.
    pub async fn quality_for_all<I, S>(&self, resort_ids: I) -> BTreeMap<String, QualityOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = BTreeMap::new();
        for id in resort_ids {
            let id = id.as_ref();
            let (outcome, _) = self.quality_for(id, None).await;
            out.insert(id.to_string(), outcome);
        }
        out
    }

    /// The compute closure behind the cache: one bounded fetch, then pure
    /// aggregation. Retries belong to the collaborator, not here.
    async fn compute_fresh(&self, resort_id: &str) -> anyhow::Result<AggregatedQuality> {
        let scores = self.provider.fetch_band_scores(resort_id).await?;
        aggregate::aggregate(resort_id, &scores, &self.weights)
            .ok_or_else(|| anyhow::anyhow!("no usable band scores for '{resort_id}'"))
    }
}
