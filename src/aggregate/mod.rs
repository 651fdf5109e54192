//! Cross-faction leaderboard aggregation.
//!
//! Merges several per-faction boards into one ranking by keeping each
//! player's best entry: concatenate rows tagged with their source board,
//! group by profile id, keep the row with the highest rating, then re-rank
//! densely by rating descending.

use std::collections::HashMap;

use crate::fetch::FetchError;
use crate::models::{AggregatedRow, LadderRow, SourceFailure};

/// Aggregate per-faction boards into one deduplicated, re-ranked view.
///
/// Comparison is strict `>`, so the first occurrence in concatenation
/// order wins exact rating ties. The final sort is stable, which keeps
/// tie-break order deterministic given a fixed board order.
pub fn aggregate_boards(boards: Vec<(u32, Vec<LadderRow>)>) -> Vec<AggregatedRow> {
    let mut survivors: Vec<AggregatedRow> = Vec::new();
    let mut index_by_profile: HashMap<String, usize> = HashMap::new();

    for (leaderboard_id, rows) in boards {
        for row in rows {
            match index_by_profile.get(&row.profile_id) {
                Some(&i) => {
                    if row.rating > survivors[i].row.rating {
                        survivors[i] = AggregatedRow::from_source(row, leaderboard_id);
                    }
                }
                None => {
                    index_by_profile.insert(row.profile_id.clone(), survivors.len());
                    survivors.push(AggregatedRow::from_source(row, leaderboard_id));
                }
            }
        }
    }

    survivors.sort_by(|a, b| b.row.rating.cmp(&a.row.rating));

    for (i, entry) in survivors.iter_mut().enumerate() {
        entry.row.rank = i as u32 + 1;
    }

    survivors
}

/// Split per-board fetch outcomes into usable boards and diagnostics.
///
/// Failed boards are simply excluded from aggregation; partial results are
/// the normal case, not an exception path.
pub fn split_outcomes(
    outcomes: Vec<(u32, Result<Vec<LadderRow>, FetchError>)>,
) -> (Vec<(u32, Vec<LadderRow>)>, Vec<SourceFailure>) {
    let mut boards = Vec::new();
    let mut failures = Vec::new();

    for (leaderboard_id, outcome) in outcomes {
        match outcome {
            Ok(rows) => boards.push((leaderboard_id, rows)),
            Err(e) => failures.push(SourceFailure {
                leaderboard_id,
                error: e.to_string(),
            }),
        }
    }

    (boards, failures)
}
