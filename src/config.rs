//! Service configuration: cache regions, upstream endpoint, resort catalog.
//!
//! Load order:
//! 1. `$SNOWLINE_CONFIG_PATH` (error if set but missing)
//! 2. `config/snowline.toml`
//! 3. Built-in defaults with a seed resort catalog.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::RegionConfig;
use crate::geo::Coord;

const ENV_PATH: &str = "SNOWLINE_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/snowline.toml";

/// Cache region shared by nearby-resort lookups.
pub const RESORTS_REGION: &str = "resorts";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheSettings,
    pub weather: WeatherSettings,
    pub resorts: Vec<Resort>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub quality: RegionSettings,
    pub resorts: RegionSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegionSettings {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl RegionSettings {
    pub fn to_region_config(self) -> RegionConfig {
        RegionConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    /// Base URL of the upstream conditions API.
    pub base_url: String,
    /// Single-attempt timeout for one fetch; retries are the upstream
    /// client's concern, never ours.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resort {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Resort {
    pub fn coord(&self) -> Coord {
        Coord {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            weather: WeatherSettings::default(),
            resorts: default_catalog(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            quality: RegionSettings {
                ttl_secs: 60,
                capacity: 512,
            },
            resorts: RegionSettings {
                ttl_secs: 300,
                capacity: 128,
            },
        }
    }
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            timeout_secs: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load configuration using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("SNOWLINE_CONFIG_PATH points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Region table for constructing the process-wide cache.
    pub fn cache_regions(&self) -> Vec<(String, RegionConfig)> {
        vec![
            (
                crate::quality::QUALITY_REGION.to_string(),
                self.cache.quality.to_region_config(),
            ),
            (
                RESORTS_REGION.to_string(),
                self.cache.resorts.to_region_config(),
            ),
        ]
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather.timeout_secs)
    }
}

/// Seed catalog used when no config file is present.
fn default_catalog() -> Vec<Resort> {
    [
        ("alpenblick", "Alpenblick", 47.2692, 11.4041),
        ("weisshorn", "Weisshorn Arosa", 46.7790, 9.6800),
        ("kandersteg", "Kandersteg", 46.4956, 7.6739),
        ("hochkar", "Hochkar", 47.7208, 14.9231),
        ("serre-bleue", "Serre Bleue", 44.9334, 6.5200),
    ]
    .into_iter()
    .map(|(id, name, lat, lon)| Resort {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lon,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.cache.quality.ttl_secs, 60);
        assert!(cfg.cache.quality.capacity > 0);
        assert!(!cfg.resorts.is_empty());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [cache.quality]
            ttl_secs = 10
            capacity = 4

            [[resorts]]
            id = "testberg"
            name = "Testberg"
            lat = 47.0
            lon = 11.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cache.quality.ttl_secs, 10);
        assert_eq!(cfg.cache.resorts.ttl_secs, 300);
        assert_eq!(cfg.resorts.len(), 1);
        assert_eq!(cfg.resorts[0].id, "testberg");
    }

    #[test]
    fn region_table_covers_both_regions() {
        let cfg = AppConfig::default();
        let regions = cfg.cache_regions();
        let names: Vec<_> = regions.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&crate::quality::QUALITY_REGION));
        assert!(names.contains(&RESORTS_REGION));
    }
}
