//! # dow-ladder
//!
//! Dawn of War: Definitive Edition ladder aggregation service.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (boards, ladder rows, snapshots, levels)
//! - **fetch**: Relic community API client and the `RankingApi` seam
//! - **aggregate**: Cross-faction deduplication and re-ranking
//! - **delta**: Rank movement against historical snapshots
//! - **service**: Pipeline orchestration (fetch -> aggregate -> resolve -> annotate)
//! - **storage**: Append-only JSONL snapshot history
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod aggregate;
pub mod api;
pub mod config;
pub mod delta;
pub mod fetch;
pub mod models;
pub mod service;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num * multiplier))
}
