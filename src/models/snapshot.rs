//! Persisted ranking snapshots.
//!
//! A snapshot is an append-only, timestamped copy of a previously served
//! ranking result. Snapshots are written once per refresh and never
//! mutated; the delta computer only ever reads the two most recent for a
//! given mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AggregatedRow;

/// One persisted ranking result for a view mode (e.g. "combined-1v1").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub mode: String,
    pub captured_at: DateTime<Utc>,
    pub rows: Vec<SnapshotRow>,
}

/// One row of a persisted snapshot.
///
/// `leaderboard_id` and `faction` are optional so that snapshots taken
/// under older schema versions still deserialize; the delta key falls back
/// across them in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub profile_id: String,
    pub rank: u32,

    #[serde(default)]
    pub leaderboard_id: Option<u32>,

    #[serde(default)]
    pub faction: Option<String>,

    #[serde(default)]
    pub rating: Option<i32>,

    #[serde(default)]
    pub player_name: Option<String>,
}

impl RankSnapshot {
    /// Capture the rows of a served result under the given mode.
    pub fn capture(mode: impl Into<String>, rows: &[AggregatedRow]) -> Self {
        let rows = rows
            .iter()
            .map(|r| SnapshotRow {
                profile_id: r.row.profile_id.clone(),
                rank: r.row.rank,
                leaderboard_id: Some(r.leaderboard_id),
                faction: r.row.faction.map(|f| f.slug().to_string()),
                rating: Some(r.row.rating),
                player_name: Some(r.row.player_name.clone()),
            })
            .collect();

        Self {
            mode: mode.into(),
            captured_at: Utc::now(),
            rows,
        }
    }
}
