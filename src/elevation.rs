//! # Elevation Weights
//!
//! This module provides a configurable mapping from elevation bands
//! ("base", "mid", "top") to normalized importance weights in `[0.0, 1.0]`.
//!
//! - Loads from JSON config (weights + aliases).
//! - Case-insensitive lookup with normalization of punctuation, dashes, etc.
//! - Aliases map alternative labels ("summit", "valley", …) to canonical bands.
//! - Fallback order: aliases → exact match → default.
//! - Includes a built-in `default_seed()` with the standard three-band split.
//!
//! The seed weights sum to 1.0: most skiing activity happens near the summit,
//! so `top` carries half the mass. An unrecognized band still aggregates with
//! the default weight rather than aborting.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use tracing::warn;

/// Default location of the weight config, relative to the runtime workdir.
pub const DEFAULT_WEIGHTS_PATH: &str = "config/elevation_weights.json";

static SHARED: Lazy<ElevationWeights> =
    Lazy::new(|| ElevationWeights::load_from_file(DEFAULT_WEIGHTS_PATH));

/// Canonical elevation bands a resort reports conditions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElevationBand {
    Base,
    Mid,
    Top,
}

impl ElevationBand {
    /// Canonical label used as a map key and in JSON payloads.
    pub fn label(self) -> &'static str {
        match self {
            ElevationBand::Base => "base",
            ElevationBand::Mid => "mid",
            ElevationBand::Top => "top",
        }
    }

    /// Parse a normalized label into a known band, if it is one.
    pub fn parse(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "base" => Some(ElevationBand::Base),
            "mid" => Some(ElevationBand::Mid),
            "top" => Some(ElevationBand::Top),
            _ => None,
        }
    }
}

/// Configuration for elevation weights, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ElevationWeights {
    /// Default weight if no match is found.
    #[serde(default = "default_default_weight")]
    pub default_weight: f64,
    /// Explicit weights for canonical band labels.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Aliases mapping non-canonical labels → canonical bands.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_default_weight() -> f64 {
    0.15
}

impl ElevationWeights {
    /// Process-wide table, loaded once from [`DEFAULT_WEIGHTS_PATH`] (seed
    /// fallback). Weights are immutable configuration; nothing ever
    /// mutates them after startup.
    pub fn shared() -> &'static ElevationWeights {
        &SHARED
    }

    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => Self::from_json(&s).unwrap_or_else(Self::default_seed),
            Err(_) => Self::default_seed(),
        }
    }

    /// Parse a JSON config. Weights that do not sum to 1.0 are still
    /// accepted (aggregation renormalizes over the bands present) but
    /// logged, since a skewed table usually means a typo in the config.
    pub fn from_json(s: &str) -> Option<Self> {
        let cfg: Self = serde_json::from_str(s).ok()?;
        let sum: f64 = cfg.weights.values().sum();
        if !cfg.weights.is_empty() && (sum - 1.0).abs() > 1e-6 {
            warn!(sum, "configured elevation weights do not sum to 1.0");
        }
        Some(cfg)
    }

    /// Get the weight for a given band label.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical → weight.
    /// 2. Exact weight match.
    /// 3. Default weight.
    pub fn weight_for(&self, band: &str) -> f64 {
        let b = normalize(band);

        // 1) Alias resolution.
        if let Some(canon) = self.aliases.get(&b) {
            let c = normalize(canon);
            if let Some(&w) = self.weights.get(&c) {
                return clamp01(w);
            }
        }

        // 2) Exact weight match.
        if let Some(&w) = self.weights.get(&b) {
            return clamp01(w);
        }

        // 3) Default.
        clamp01(self.default_weight)
    }

    /// Built-in seed with the standard three-band split.
    /// Used as fallback if no config is found.
    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [("base", 0.15), ("mid", 0.35), ("top", 0.50)] {
            weights.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("bottom", "base"),
            ("valley", "base"),
            ("lower", "base"),
            ("middle", "mid"),
            ("mid mountain", "mid"),
            ("mid station", "mid"),
            ("summit", "top"),
            ("peak", "top"),
            ("upper", "top"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_weight: 0.15,
            weights,
            aliases,
        }
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }

    out = out.replace(['\n', '\r', '\t', '.', ','], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clamp to [0.0, 1.0].
fn clamp01(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}
