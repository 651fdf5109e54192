//! Rank movement against historical snapshots.
//!
//! Deltas compare the live ranking to the second-most-recent persisted
//! snapshot. The most recent snapshot may be identical to the result
//! currently being served, so the baseline is always the prior period.

use std::collections::HashMap;

use crate::models::{RankSnapshot, SnapshotRow};

/// Discriminator for a profile's position within a snapshot.
///
/// The fallback precedence is fixed: leaderboard id when present, else the
/// faction label, else unknown. Snapshots taken under older schema
/// versions may only carry the later parts of the chain, and their deltas
/// must still line up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeltaKey {
    ByLeaderboard(u32),
    ByFaction(String),
    Unknown,
}

impl DeltaKey {
    /// Build a key following the leaderboard → faction → unknown chain.
    pub fn from_parts(leaderboard_id: Option<u32>, faction: Option<&str>) -> Self {
        if let Some(id) = leaderboard_id {
            DeltaKey::ByLeaderboard(id)
        } else if let Some(f) = faction {
            DeltaKey::ByFaction(f.to_string())
        } else {
            DeltaKey::Unknown
        }
    }

    fn for_row(row: &SnapshotRow) -> Self {
        Self::from_parts(row.leaderboard_id, row.faction.as_deref())
    }
}

/// Lookup from (profile, discriminator) to the rank held in the baseline
/// snapshot.
pub type BaselineRanks = HashMap<(String, DeltaKey), u32>;

/// Build the baseline rank lookup from snapshots sorted newest-first.
///
/// Fewer than two snapshots means there is no prior period to compare
/// against: every delta is null, which is distinct from zero movement.
pub fn baseline_ranks(snapshots: &[RankSnapshot]) -> Option<BaselineRanks> {
    if snapshots.len() < 2 {
        return None;
    }

    let baseline = &snapshots[1];
    let mut ranks = HashMap::with_capacity(baseline.rows.len());
    for row in &baseline.rows {
        ranks.insert((row.profile_id.clone(), DeltaKey::for_row(row)), row.rank);
    }
    Some(ranks)
}

/// `previous_rank - current_rank`; positive means the player moved up.
pub fn rank_delta(
    baseline: Option<&BaselineRanks>,
    profile_id: &str,
    key: DeltaKey,
    current_rank: u32,
) -> Option<i64> {
    let baseline = baseline?;
    baseline
        .get(&(profile_id.to_string(), key))
        .map(|previous| *previous as i64 - current_rank as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn snapshot(age_minutes: i64, rows: &[(&str, u32, Option<u32>, Option<&str>)]) -> RankSnapshot {
        RankSnapshot {
            mode: "combined-1v1".to_string(),
            captured_at: Utc::now() - Duration::minutes(age_minutes),
            rows: rows
                .iter()
                .map(|(id, rank, board, faction)| SnapshotRow {
                    profile_id: id.to_string(),
                    rank: *rank,
                    leaderboard_id: *board,
                    faction: faction.map(|f| f.to_string()),
                    rating: None,
                    player_name: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_fewer_than_two_snapshots_yields_no_baseline() {
        assert!(baseline_ranks(&[]).is_none());
        assert!(baseline_ranks(&[snapshot(0, &[("a", 1, Some(1), None)])]).is_none());
    }

    #[test]
    fn test_baseline_uses_second_most_recent() {
        let snapshots = vec![
            snapshot(0, &[("a", 1, Some(1), None)]),
            snapshot(60, &[("a", 10, Some(1), None)]),
            snapshot(120, &[("a", 50, Some(1), None)]),
        ];

        let baseline = baseline_ranks(&snapshots).unwrap();
        // Rank comes from the middle (second-most-recent) snapshot
        let delta = rank_delta(Some(&baseline), "a", DeltaKey::ByLeaderboard(1), 4);
        assert_eq!(delta, Some(6));
    }

    #[test]
    fn test_delta_sign() {
        let snapshots = vec![
            snapshot(0, &[]),
            snapshot(60, &[("up", 10, Some(2), None), ("down", 4, Some(2), None)]),
        ];
        let baseline = baseline_ranks(&snapshots).unwrap();

        // previous 10, current 4: improvement
        assert_eq!(
            rank_delta(Some(&baseline), "up", DeltaKey::ByLeaderboard(2), 4),
            Some(6)
        );
        // previous 4, current 10: decline
        assert_eq!(
            rank_delta(Some(&baseline), "down", DeltaKey::ByLeaderboard(2), 10),
            Some(-6)
        );
    }

    #[test]
    fn test_absent_profile_is_null_not_zero() {
        let snapshots = vec![snapshot(0, &[]), snapshot(60, &[("a", 1, Some(1), None)])];
        let baseline = baseline_ranks(&snapshots).unwrap();

        assert_eq!(
            rank_delta(Some(&baseline), "newcomer", DeltaKey::ByLeaderboard(1), 3),
            None
        );
    }

    #[test]
    fn test_no_baseline_is_null() {
        assert_eq!(rank_delta(None, "a", DeltaKey::ByLeaderboard(1), 3), None);
    }

    #[test]
    fn test_key_fallback_precedence() {
        assert_eq!(
            DeltaKey::from_parts(Some(4), Some("eldar")),
            DeltaKey::ByLeaderboard(4)
        );
        assert_eq!(
            DeltaKey::from_parts(None, Some("eldar")),
            DeltaKey::ByFaction("eldar".to_string())
        );
        assert_eq!(DeltaKey::from_parts(None, None), DeltaKey::Unknown);
    }

    #[test]
    fn test_old_schema_snapshot_keys_by_faction() {
        // Baseline rows written before leaderboard ids were recorded
        let snapshots = vec![
            snapshot(0, &[]),
            snapshot(60, &[("a", 8, None, Some("orks"))]),
        ];
        let baseline = baseline_ranks(&snapshots).unwrap();

        // A live row that also falls back to the faction label still matches
        assert_eq!(
            rank_delta(
                Some(&baseline),
                "a",
                DeltaKey::from_parts(None, Some("orks")),
                5
            ),
            Some(3)
        );
        // But a live row keyed by leaderboard id does not
        assert_eq!(
            rank_delta(Some(&baseline), "a", DeltaKey::ByLeaderboard(3), 5),
            None
        );
    }
}
