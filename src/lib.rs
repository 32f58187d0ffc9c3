// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod elevation;
pub mod geo;
pub mod metrics;
pub mod quality;
pub mod snapshot;
pub mod weather;

// ---- Re-exports for stable public API ----
pub use crate::api::{app, create_router, AppState};
pub use crate::cache::{CacheStatus, RegionConfig, TtlCache};
pub use crate::quality::{QualityOutcome, QualityService};
