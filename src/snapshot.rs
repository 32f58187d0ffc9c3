//! Batch snapshot: aggregate every resort in the catalog and render static
//! JSON documents for edge caching. Upload/CDN mechanics stay out of scope;
//! this module only produces the files.
//!
//! The snapshot job goes through the same `QualityService` (and therefore
//! the same cache region) as interactive requests, so a scheduled run warms
//! the cache for the traffic that follows it.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::quality::{QualityOutcome, QualityService};

/// Index document summarizing one snapshot run.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotIndex {
    pub generated_at: DateTime<Utc>,
    pub resorts_total: usize,
    pub resorts_ready: usize,
    pub resort_ids: Vec<String>,
}

/// Compute quality for every given resort and return the per-resort map
/// plus the index. Pure with respect to the filesystem; writing is separate
/// so tests can inspect results without touching disk.
pub async fn build_snapshot(
    service: &QualityService,
    resort_ids: &[String],
) -> (BTreeMap<String, QualityOutcome>, SnapshotIndex) {
    let results = service.quality_for_all(resort_ids).await;

    let ready = results.values().filter(|o| o.is_ready()).count();
    let index = SnapshotIndex {
        generated_at: Utc::now(),
        resorts_total: results.len(),
        resorts_ready: ready,
        resort_ids: results.keys().cloned().collect(),
    };
    (results, index)
}

/// Write one `<resort_id>.json` per resort plus `index.json` into `out_dir`.
pub async fn write_snapshot(
    out_dir: &Path,
    results: &BTreeMap<String, QualityOutcome>,
    index: &SnapshotIndex,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating snapshot dir {}", out_dir.display()))?;

    for (resort_id, outcome) in results {
        let path = out_dir.join(format!("{resort_id}.json"));
        let body = serde_json::to_vec_pretty(outcome)
            .with_context(|| format!("serializing snapshot for '{resort_id}'"))?;
        fs::write(&path, body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let index_path = out_dir.join("index.json");
    let body = serde_json::to_vec_pretty(index).context("serializing snapshot index")?;
    fs::write(&index_path, body)
        .await
        .with_context(|| format!("writing {}", index_path.display()))?;

    info!(
        resorts_total = index.resorts_total,
        resorts_ready = index.resorts_ready,
        out_dir = %out_dir.display(),
        "snapshot written"
    );
    Ok(())
}
