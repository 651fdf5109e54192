//! Pipeline orchestration.
//!
//! Control flow per request: fetch source boards concurrently, join
//! best-effort, aggregate, resolve missing names, annotate levels and rank
//! deltas, assemble the served view. No retries anywhere: a failed
//! external call is accepted as a loss for the cycle and the next
//! scheduled refresh recovers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{aggregate_boards, split_outcomes};
use crate::delta::{baseline_ranks, rank_delta, DeltaKey};
use crate::fetch::{FetchError, RankingApi};
use crate::models::{
    level_for_xp, AggregatedRow, LeaderboardDef, MatchType, PlayerProfile, RankSnapshot,
    SourceFailure,
};
use crate::storage::{SnapshotStore, StorageError};

/// Display name used when resolution fails or misses.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Errors from pipeline operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Unknown leaderboard: {0}")]
    UnknownBoard(u32),

    #[error("All source boards failed for {mode}")]
    Degraded { mode: String },
}

/// A servable/snapshottable ranking view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKey {
    /// Cross-faction aggregation over all boards of one match type
    Combined(MatchType),
    /// A single per-faction board
    Board(u32),
}

impl ViewKey {
    /// Snapshot mode string, also used as the served leaderboard id.
    pub fn mode(&self) -> String {
        match self {
            ViewKey::Combined(mt) => format!("combined-{}", mt),
            ViewKey::Board(id) => format!("board-{}", id),
        }
    }

    /// The combined views for every match type.
    pub fn combined_all() -> Vec<ViewKey> {
        MatchType::ALL.iter().map(|&mt| ViewKey::Combined(mt)).collect()
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode())
    }
}

impl FromStr for ViewKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(mt) = s.strip_prefix("combined-") {
            let mt = mt.parse::<MatchType>()?;
            return Ok(ViewKey::Combined(mt));
        }
        if let Some(id) = s.strip_prefix("board-") {
            let id = id
                .parse::<u32>()
                .map_err(|_| format!("invalid board id: {}", id))?;
            return Ok(ViewKey::Board(id));
        }
        Err(format!(
            "unknown view: {} (expected combined-<match_type> or board-<id>)",
            s
        ))
    }
}

/// The served ranking document.
///
/// `stale: true` with empty rows means "service degraded, no data" —
/// callers must never read it as "zero players".
#[derive(Debug, Clone, Serialize)]
pub struct LadderView {
    pub leaderboard_id: String,
    pub last_updated: DateTime<Utc>,
    pub stale: bool,
    pub failed_sources: Vec<SourceFailure>,
    pub rows: Vec<AggregatedRow>,
}

/// Per-mode snapshot bookkeeping for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModeSummary {
    pub mode: String,
    pub snapshots: usize,
    pub latest_at: Option<DateTime<Utc>>,
}

/// Orchestrates fetch, aggregation, name resolution and annotation.
pub struct LadderService {
    api: Arc<dyn RankingApi>,
    store: SnapshotStore,
}

impl LadderService {
    pub fn new(api: Arc<dyn RankingApi>, store: SnapshotStore) -> Self {
        Self { api, store }
    }

    /// Board ids contributing to a view, in canonical registry order.
    fn source_boards(&self, key: &ViewKey) -> Result<Vec<u32>, ServiceError> {
        match key {
            ViewKey::Combined(mt) => Ok(LeaderboardDef::for_match_type(*mt)
                .iter()
                .map(|d| d.id)
                .collect()),
            ViewKey::Board(id) => {
                LeaderboardDef::by_id(*id).ok_or(ServiceError::UnknownBoard(*id))?;
                Ok(vec![*id])
            }
        }
    }

    /// Build the live view for a key.
    ///
    /// Per-board failures degrade to diagnostics; only the total loss of
    /// every source marks the view stale.
    pub async fn view(&self, key: &ViewKey) -> Result<LadderView, ServiceError> {
        let board_ids = self.source_boards(key)?;
        let mode = key.mode();

        // Independent fetches, no shared state; merged by a single
        // aggregation pass afterwards.
        let outcomes = join_all(board_ids.iter().map(|&id| async move {
            (id, self.api.fetch_board(id).await)
        }))
        .await;

        let (boards, failures) = split_outcomes(outcomes);
        for failure in &failures {
            warn!(
                "Board {} excluded from {}: {}",
                failure.leaderboard_id, mode, failure.error
            );
        }

        let stale = boards.is_empty() && !failures.is_empty();
        let mut rows = aggregate_boards(boards);

        if !rows.is_empty() {
            self.fill_names(&mut rows).await;
        }
        self.annotate(&mut rows, &mode);

        Ok(LadderView {
            leaderboard_id: mode,
            last_updated: Utc::now(),
            stale,
            failed_sources: failures,
            rows,
        })
    }

    /// Resolve display names for rows that arrived without one.
    ///
    /// Resolution state lives in this call, scoped to one request; misses
    /// render as the fallback literal.
    async fn fill_names(&self, rows: &mut [AggregatedRow]) {
        let missing: Vec<String> = rows
            .iter()
            .filter(|r| r.row.player_name.is_empty())
            .map(|r| r.row.profile_id.clone())
            .collect();
        if missing.is_empty() {
            return;
        }

        let resolved = self.api.resolve_names(&missing).await;
        info!("Resolved {}/{} missing names", resolved.len(), missing.len());

        for entry in rows.iter_mut().filter(|r| r.row.player_name.is_empty()) {
            entry.row.player_name = resolved
                .get(&entry.row.profile_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        }
    }

    /// Annotate levels and rank deltas in place.
    ///
    /// A snapshot history that cannot be read only costs the deltas, not
    /// the view.
    fn annotate(&self, rows: &mut [AggregatedRow], mode: &str) {
        let baseline = match self.store.latest(mode, 2) {
            Ok(snapshots) => baseline_ranks(&snapshots),
            Err(e) => {
                warn!("Snapshot history unavailable for {}: {}", mode, e);
                None
            }
        };

        for entry in rows.iter_mut() {
            entry.level = entry.row.xp.map(level_for_xp);
            let key = DeltaKey::from_parts(
                Some(entry.leaderboard_id),
                entry.row.faction.map(|f| f.slug()),
            );
            entry.rank_delta = rank_delta(
                baseline.as_ref(),
                &entry.row.profile_id,
                key,
                entry.row.rank,
            );
        }
    }

    /// Fetch, aggregate and persist one snapshot for a view.
    ///
    /// A degraded cycle writes nothing; the history keeps its last good
    /// entry.
    pub async fn take_snapshot(&self, key: &ViewKey) -> Result<RankSnapshot, ServiceError> {
        let view = self.view(key).await?;
        if view.stale {
            return Err(ServiceError::Degraded { mode: key.mode() });
        }

        let snapshot = RankSnapshot::capture(key.mode(), &view.rows);
        self.store.append(&snapshot)?;
        info!(
            "Captured snapshot of {} ({} rows)",
            snapshot.mode,
            snapshot.rows.len()
        );
        Ok(snapshot)
    }

    /// One player's profile and standings.
    pub async fn player(&self, profile_id: &str) -> Result<PlayerProfile, ServiceError> {
        Ok(self.api.fetch_personal(profile_id).await?)
    }

    /// Snapshot bookkeeping per mode, for the status endpoint.
    pub fn snapshot_summaries(&self) -> Result<Vec<ModeSummary>, StorageError> {
        let mut summaries = Vec::new();
        for mode in self.store.modes()? {
            let latest = self.store.latest(&mode, 1)?;
            summaries.push(ModeSummary {
                snapshots: self.store.count(&mode)?,
                latest_at: latest.first().map(|s| s.captured_at),
                mode,
            });
        }
        Ok(summaries)
    }
}
