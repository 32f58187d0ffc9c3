//! The snapshot job must emit one JSON document per resort plus an index,
//! readable back into the same types.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use snowline::aggregate::ElevationScore;
use snowline::elevation::ElevationWeights;
use snowline::quality::{QualityOutcome, QualityService, QUALITY_REGION};
use snowline::snapshot::{build_snapshot, write_snapshot, SnapshotIndex};
use snowline::weather::StaticBandScoreProvider;
use snowline::{RegionConfig, TtlCache};

fn unique_out_dir() -> std::path::PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("snowline-snapshot-test-{nonce}"))
}

#[tokio::test]
async fn snapshot_writes_per_resort_files_and_index() {
    let mut top_only = BTreeMap::new();
    top_only.insert(
        "top".to_string(),
        ElevationScore {
            score: 9.0,
            sample_count: Some(4),
        },
    );

    let cache = Arc::new(TtlCache::with_regions([(
        QUALITY_REGION.to_string(),
        RegionConfig {
            ttl: Duration::from_secs(60),
            capacity: 16,
        },
    )]));
    let provider = Arc::new(StaticBandScoreProvider::new().with_resort("alpenblick", top_only));
    let service = QualityService::new(cache, provider, ElevationWeights::default_seed());

    let ids = vec!["alpenblick".to_string(), "ghost-mountain".to_string()];
    let (results, index) = build_snapshot(&service, &ids).await;
    assert_eq!(index.resorts_total, 2);
    assert_eq!(index.resorts_ready, 1);

    let out_dir = unique_out_dir();
    write_snapshot(&out_dir, &results, &index).await.unwrap();

    let raw = std::fs::read(out_dir.join("alpenblick.json")).unwrap();
    let outcome: QualityOutcome = serde_json::from_slice(&raw).unwrap();
    match outcome {
        QualityOutcome::Ready(q) => {
            // Single band: renormalization collapses to the band's own score.
            assert!((q.overall_score - 9.0).abs() < 1e-9);
            assert_eq!(q.resort_id, "alpenblick");
        }
        other => panic!("expected ready snapshot, got {other:?}"),
    }

    let raw = std::fs::read(out_dir.join("ghost-mountain.json")).unwrap();
    let outcome: QualityOutcome = serde_json::from_slice(&raw).unwrap();
    assert!(matches!(outcome, QualityOutcome::InsufficientData { .. }));

    let raw = std::fs::read(out_dir.join("index.json")).unwrap();
    let parsed: SnapshotIndex = serde_json::from_slice(&raw).unwrap();
    assert_eq!(parsed.resort_ids, vec!["alpenblick", "ghost-mountain"]);

    std::fs::remove_dir_all(&out_dir).ok();
}
