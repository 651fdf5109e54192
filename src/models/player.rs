//! Per-player standings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::level::level_for_xp;
use super::{Faction, LadderRow, MatchType};

/// A player's standing on one ranked board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub leaderboard_id: u32,
    pub faction: Option<Faction>,
    pub match_type: Option<MatchType>,
    pub rank: u32,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    pub winrate: f64,
    pub streak: i32,
    pub last_match_at: Option<DateTime<Utc>>,
}

impl PlayerStanding {
    pub fn new(
        leaderboard_id: u32,
        rank: u32,
        rating: i32,
        wins: u32,
        losses: u32,
        streak: i32,
        last_match_at: Option<DateTime<Utc>>,
    ) -> Self {
        let def = crate::models::LeaderboardDef::by_id(leaderboard_id);
        Self {
            leaderboard_id,
            faction: def.map(|d| d.faction),
            match_type: def.map(|d| d.match_type),
            rank,
            rating,
            wins,
            losses,
            winrate: LadderRow::winrate(wins, losses),
            streak,
            last_match_at,
        }
    }
}

/// A player's profile with standings across all ranked boards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub profile_id: String,
    pub alias: String,
    pub country: Option<String>,
    pub xp: Option<i64>,
    pub level: Option<u32>,
    pub standings: Vec<PlayerStanding>,
}

impl PlayerProfile {
    pub fn new(
        profile_id: String,
        alias: String,
        country: Option<String>,
        xp: Option<i64>,
        standings: Vec<PlayerStanding>,
    ) -> Self {
        let level = xp.map(level_for_xp);
        Self {
            profile_id,
            alias,
            country,
            xp,
            level,
            standings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing_resolves_board_metadata() {
        let standing = PlayerStanding::new(4, 3, 1622, 30, 10, 5, None);
        assert_eq!(standing.faction, Some(Faction::Eldar));
        assert_eq!(standing.match_type, Some(MatchType::OneVsOne));
        assert!((standing.winrate - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_standing_unknown_board() {
        let standing = PlayerStanding::new(999, 1, 1500, 1, 0, 1, None);
        assert!(standing.faction.is_none());
        assert!(standing.match_type.is_none());
    }

    #[test]
    fn test_profile_level_annotation() {
        let profile = PlayerProfile::new("42".to_string(), "Macha".to_string(), None, Some(10_000), vec![]);
        assert_eq!(profile.level, Some(2));

        let unleveled = PlayerProfile::new("43".to_string(), "Taldeer".to_string(), None, None, vec![]);
        assert!(unleveled.level.is_none());
    }
}
