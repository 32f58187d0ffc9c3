//! # Snow Quality Aggregation
//! Pure, testable logic that maps per-elevation-band scores → one overall
//! quality score. No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy: each present band contributes `score * weight_for(band)`; the sum
//! is divided by the weight mass of the bands actually present, so a resort
//! reporting only `top` data is not penalized for missing `base`/`mid`
//! coverage. Zero usable bands yields no score at all, never a default.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::elevation::ElevationWeights;

/// Declared range for raw band scores. Anything outside is observational
/// noise (sensor glitch, bad report) and is dropped from aggregation.
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// One observed quality score at one elevation band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationScore {
    /// Raw quality measure in `[MIN_SCORE, MAX_SCORE]`.
    pub score: f64,
    /// Number of reports behind the score, when the upstream provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u32>,
}

/// The computed per-resort summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedQuality {
    pub resort_id: String,
    /// Weighted combination over present bands, rounded to one decimal.
    pub overall_score: f64,
    /// The band scores that actually contributed (invalid ones excluded).
    pub per_band_scores: BTreeMap<String, ElevationScore>,
    pub computed_at: DateTime<Utc>,
}

/// Combine per-band scores into one weighted quality score.
///
/// Returns `None` when no usable band remains — callers surface this as an
/// explicit insufficient-data outcome, never as a numeric default.
pub fn aggregate(
    resort_id: &str,
    scores: &BTreeMap<String, ElevationScore>,
    weights: &ElevationWeights,
) -> Option<AggregatedQuality> {
    let mut weighted_sum = 0.0;
    let mut weight_mass = 0.0;
    let mut used = BTreeMap::new();

    for (band, es) in scores {
        if !es.score.is_finite() || es.score < MIN_SCORE || es.score > MAX_SCORE {
            warn!(resort_id, band = band.as_str(), score = es.score, "dropping invalid band score");
            counter!("snow_bands_dropped_total").increment(1);
            continue;
        }
        let w = weights.weight_for(band);
        weighted_sum += es.score * w;
        weight_mass += w;
        used.insert(band.clone(), es.clone());
    }

    if used.is_empty() || weight_mass <= 0.0 {
        return None;
    }

    Some(AggregatedQuality {
        resort_id: resort_id.to_string(),
        overall_score: round1(weighted_sum / weight_mass),
        per_band_scores: used,
        computed_at: Utc::now(),
    })
}

/// Round to one decimal place for presentation stability.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(v: f64) -> ElevationScore {
        ElevationScore {
            score: v,
            sample_count: None,
        }
    }

    fn bands(pairs: &[(&str, f64)]) -> BTreeMap<String, ElevationScore> {
        pairs
            .iter()
            .map(|(b, v)| (b.to_string(), score(*v)))
            .collect()
    }

    #[test]
    fn two_band_renormalized_scenario() {
        let w = ElevationWeights::default_seed();
        let q = aggregate("alpenblick", &bands(&[("top", 8.0), ("mid", 6.0)]), &w).unwrap();
        // (8*0.50 + 6*0.35) / 0.85 ≈ 7.18 → 7.2
        assert!((q.overall_score - 7.2).abs() < 1e-9);
        assert_eq!(q.per_band_scores.len(), 2);
    }

    #[test]
    fn single_band_collapses_to_identity() {
        let w = ElevationWeights::default_seed();
        for band in ["base", "mid", "top"] {
            let q = aggregate("r", &bands(&[(band, 4.5)]), &w).unwrap();
            assert!((q.overall_score - 4.5).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_input_yields_no_score() {
        let w = ElevationWeights::default_seed();
        assert!(aggregate("r", &BTreeMap::new(), &w).is_none());
    }

    #[test]
    fn invalid_scores_are_excluded_not_propagated() {
        let w = ElevationWeights::default_seed();
        let q = aggregate(
            "r",
            &bands(&[("top", 8.0), ("mid", f64::NAN), ("base", 99.0)]),
            &w,
        )
        .unwrap();
        assert!((q.overall_score - 8.0).abs() < 1e-9);
        assert_eq!(q.per_band_scores.len(), 1);
        assert!(q.per_band_scores.contains_key("top"));
    }

    #[test]
    fn all_bands_invalid_yields_no_score() {
        let w = ElevationWeights::default_seed();
        let input = bands(&[("top", f64::INFINITY), ("base", -3.0)]);
        assert!(aggregate("r", &input, &w).is_none());
    }

    #[test]
    fn full_coverage_uses_fixed_weights() {
        let w = ElevationWeights::default_seed();
        let q = aggregate("r", &bands(&[("base", 2.0), ("mid", 5.0), ("top", 9.0)]), &w).unwrap();
        // 2*0.15 + 5*0.35 + 9*0.50 = 6.55 → 6.6 (divisor 1.0)
        assert!((q.overall_score - 6.6).abs() < 1e-9);
    }

    #[test]
    fn unknown_band_aggregates_with_default_weight() {
        let w = ElevationWeights::default_seed();
        let q = aggregate("r", &bands(&[("glacier", 10.0), ("top", 5.0)]), &w).unwrap();
        // (10*0.15 + 5*0.50) / 0.65 = 6.1538… → 6.2
        assert!((q.overall_score - 6.2).abs() < 1e-9);
    }
}
