//! Core ladder data structures.
//!
//! A leaderboard is an externally-hosted ranked list of players for one
//! faction/match-type combination. The aggregation pipeline merges several
//! of these into one cross-faction ranking.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The nine playable factions of Dawn of War: Definitive Edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    SpaceMarines,
    Chaos,
    Orks,
    Eldar,
    ImperialGuard,
    Tau,
    Necrons,
    DarkEldar,
    SistersOfBattle,
}

impl Faction {
    /// All factions in canonical registry order.
    pub const ALL: [Faction; 9] = [
        Faction::SpaceMarines,
        Faction::Chaos,
        Faction::Orks,
        Faction::Eldar,
        Faction::ImperialGuard,
        Faction::Tau,
        Faction::Necrons,
        Faction::DarkEldar,
        Faction::SistersOfBattle,
    ];

    /// Short identifier used in board names and snapshot keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Faction::SpaceMarines => "space_marines",
            Faction::Chaos => "chaos",
            Faction::Orks => "orks",
            Faction::Eldar => "eldar",
            Faction::ImperialGuard => "imperial_guard",
            Faction::Tau => "tau",
            Faction::Necrons => "necrons",
            Faction::DarkEldar => "dark_eldar",
            Faction::SistersOfBattle => "sisters_of_battle",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Faction::SpaceMarines => "Space Marines",
            Faction::Chaos => "Chaos",
            Faction::Orks => "Orks",
            Faction::Eldar => "Eldar",
            Faction::ImperialGuard => "Imperial Guard",
            Faction::Tau => "Tau Empire",
            Faction::Necrons => "Necrons",
            Faction::DarkEldar => "Dark Eldar",
            Faction::SistersOfBattle => "Sisters of Battle",
        };
        write!(f, "{}", name)
    }
}

/// Ranked match type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
    #[serde(rename = "3v3")]
    ThreeVsThree,
    #[serde(rename = "4v4")]
    FourVsFour,
}

impl MatchType {
    pub const ALL: [MatchType; 4] = [
        MatchType::OneVsOne,
        MatchType::TwoVsTwo,
        MatchType::ThreeVsThree,
        MatchType::FourVsFour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::OneVsOne => "1v1",
            MatchType::TwoVsTwo => "2v2",
            MatchType::ThreeVsThree => "3v3",
            MatchType::FourVsFour => "4v4",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1v1" => Ok(MatchType::OneVsOne),
            "2v2" => Ok(MatchType::TwoVsTwo),
            "3v3" => Ok(MatchType::ThreeVsThree),
            "4v4" => Ok(MatchType::FourVsFour),
            other => Err(format!("unknown match type: {}", other)),
        }
    }
}

/// A single externally-hosted leaderboard (one faction, one match type).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LeaderboardDef {
    pub id: u32,
    pub faction: Faction,
    pub match_type: MatchType,
    pub name: &'static str,
}

macro_rules! board {
    ($id:expr, $faction:ident, $mt:ident, $name:expr) => {
        LeaderboardDef {
            id: $id,
            faction: Faction::$faction,
            match_type: MatchType::$mt,
            name: $name,
        }
    };
}

/// Static registry of all ranked boards, in canonical order.
///
/// Concatenation order during aggregation follows this table, which makes
/// the first-seen tie-break deterministic.
pub const LEADERBOARDS: [LeaderboardDef; 36] = [
    board!(1, SpaceMarines, OneVsOne, "1v1_space_marines"),
    board!(2, Chaos, OneVsOne, "1v1_chaos"),
    board!(3, Orks, OneVsOne, "1v1_orks"),
    board!(4, Eldar, OneVsOne, "1v1_eldar"),
    board!(5, ImperialGuard, OneVsOne, "1v1_imperial_guard"),
    board!(6, Tau, OneVsOne, "1v1_tau"),
    board!(7, Necrons, OneVsOne, "1v1_necrons"),
    board!(8, DarkEldar, OneVsOne, "1v1_dark_eldar"),
    board!(9, SistersOfBattle, OneVsOne, "1v1_sisters_of_battle"),
    board!(10, SpaceMarines, TwoVsTwo, "2v2_space_marines"),
    board!(11, Chaos, TwoVsTwo, "2v2_chaos"),
    board!(12, Orks, TwoVsTwo, "2v2_orks"),
    board!(13, Eldar, TwoVsTwo, "2v2_eldar"),
    board!(14, ImperialGuard, TwoVsTwo, "2v2_imperial_guard"),
    board!(15, Tau, TwoVsTwo, "2v2_tau"),
    board!(16, Necrons, TwoVsTwo, "2v2_necrons"),
    board!(17, DarkEldar, TwoVsTwo, "2v2_dark_eldar"),
    board!(18, SistersOfBattle, TwoVsTwo, "2v2_sisters_of_battle"),
    board!(19, SpaceMarines, ThreeVsThree, "3v3_space_marines"),
    board!(20, Chaos, ThreeVsThree, "3v3_chaos"),
    board!(21, Orks, ThreeVsThree, "3v3_orks"),
    board!(22, Eldar, ThreeVsThree, "3v3_eldar"),
    board!(23, ImperialGuard, ThreeVsThree, "3v3_imperial_guard"),
    board!(24, Tau, ThreeVsThree, "3v3_tau"),
    board!(25, Necrons, ThreeVsThree, "3v3_necrons"),
    board!(26, DarkEldar, ThreeVsThree, "3v3_dark_eldar"),
    board!(27, SistersOfBattle, ThreeVsThree, "3v3_sisters_of_battle"),
    board!(28, SpaceMarines, FourVsFour, "4v4_space_marines"),
    board!(29, Chaos, FourVsFour, "4v4_chaos"),
    board!(30, Orks, FourVsFour, "4v4_orks"),
    board!(31, Eldar, FourVsFour, "4v4_eldar"),
    board!(32, ImperialGuard, FourVsFour, "4v4_imperial_guard"),
    board!(33, Tau, FourVsFour, "4v4_tau"),
    board!(34, Necrons, FourVsFour, "4v4_necrons"),
    board!(35, DarkEldar, FourVsFour, "4v4_dark_eldar"),
    board!(36, SistersOfBattle, FourVsFour, "4v4_sisters_of_battle"),
];

impl LeaderboardDef {
    /// Look up a board by its external id.
    pub fn by_id(id: u32) -> Option<&'static LeaderboardDef> {
        LEADERBOARDS.iter().find(|b| b.id == id)
    }

    /// All boards for one match type, in registry order.
    pub fn for_match_type(match_type: MatchType) -> Vec<&'static LeaderboardDef> {
        LEADERBOARDS
            .iter()
            .filter(|b| b.match_type == match_type)
            .collect()
    }
}

/// One normalized row of a per-faction leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderRow {
    /// 1-based rank within the source board
    pub rank: u32,

    /// Stable external player identity
    pub profile_id: String,

    /// Display name; empty until resolved
    pub player_name: String,

    /// Authoritative sort key after aggregation
    pub rating: i32,

    pub wins: u32,
    pub losses: u32,

    /// Derived wins / (wins + losses), 0.0 with no games
    pub winrate: f64,

    /// Current win (positive) or loss (negative) streak
    pub streak: i32,

    pub faction: Option<Faction>,

    /// Lifetime XP when the source exposes it; feeds the level lookup
    pub xp: Option<i64>,

    pub last_match_at: Option<DateTime<Utc>>,
}

impl LadderRow {
    /// Derived win rate in [0.0, 1.0].
    pub fn winrate(wins: u32, losses: u32) -> f64 {
        let total = wins + losses;
        if total == 0 {
            0.0
        } else {
            wins as f64 / total as f64
        }
    }
}

/// A ladder row that survived aggregation, with provenance and annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRow {
    #[serde(flatten)]
    pub row: LadderRow,

    /// Rank the row held on its source board
    pub original_rank: u32,

    /// Source board that contributed the winning (highest-rating) entry
    pub leaderboard_id: u32,

    /// Level from the XP lookup, when XP is known
    pub level: Option<u32>,

    /// previous_rank - current_rank against the prior snapshot; positive
    /// means improvement, None when no baseline exists
    pub rank_delta: Option<i64>,
}

impl AggregatedRow {
    /// Tag a source row with its board of origin.
    pub fn from_source(row: LadderRow, leaderboard_id: u32) -> Self {
        let original_rank = row.rank;
        Self {
            row,
            original_rank,
            leaderboard_id,
            level: None,
            rank_delta: None,
        }
    }
}

/// Diagnostics entry for a per-board fetch that failed and was excluded
/// from aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub leaderboard_id: u32,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_unique() {
        let mut ids: Vec<u32> = LEADERBOARDS.iter().map(|b| b.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), LEADERBOARDS.len());
    }

    #[test]
    fn test_registry_covers_all_factions_per_match_type() {
        for mt in MatchType::ALL {
            let boards = LeaderboardDef::for_match_type(mt);
            assert_eq!(boards.len(), Faction::ALL.len());
        }
    }

    #[test]
    fn test_by_id() {
        let board = LeaderboardDef::by_id(4).unwrap();
        assert_eq!(board.faction, Faction::Eldar);
        assert_eq!(board.match_type, MatchType::OneVsOne);
        assert!(LeaderboardDef::by_id(999).is_none());
    }

    #[test]
    fn test_match_type_parse() {
        assert_eq!("1v1".parse::<MatchType>().unwrap(), MatchType::OneVsOne);
        assert_eq!("4v4".parse::<MatchType>().unwrap(), MatchType::FourVsFour);
        assert!("5v5".parse::<MatchType>().is_err());
    }

    #[test]
    fn test_match_type_serde_form() {
        let json = serde_json::to_string(&MatchType::TwoVsTwo).unwrap();
        assert_eq!(json, "\"2v2\"");
        let parsed: MatchType = serde_json::from_str("\"3v3\"").unwrap();
        assert_eq!(parsed, MatchType::ThreeVsThree);
    }

    #[test]
    fn test_winrate() {
        assert!((LadderRow::winrate(3, 1) - 0.75).abs() < 1e-9);
        assert_eq!(LadderRow::winrate(0, 0), 0.0);
    }

    #[test]
    fn test_aggregated_row_provenance() {
        let row = LadderRow {
            rank: 7,
            profile_id: "1001".to_string(),
            player_name: "Thule".to_string(),
            rating: 1512,
            wins: 40,
            losses: 22,
            winrate: LadderRow::winrate(40, 22),
            streak: 3,
            faction: Some(Faction::SpaceMarines),
            xp: None,
            last_match_at: None,
        };
        let agg = AggregatedRow::from_source(row, 1);
        assert_eq!(agg.original_rank, 7);
        assert_eq!(agg.leaderboard_id, 1);
        assert!(agg.level.is_none());
        assert!(agg.rank_delta.is_none());
    }

    #[test]
    fn test_aggregated_row_serializes_flat() {
        let row = LadderRow {
            rank: 1,
            profile_id: "1".to_string(),
            player_name: "x".to_string(),
            rating: 1600,
            wins: 1,
            losses: 0,
            winrate: 1.0,
            streak: 1,
            faction: Some(Faction::Orks),
            xp: Some(12_000),
            last_match_at: None,
        };
        let agg = AggregatedRow::from_source(row, 3);
        let value = serde_json::to_value(&agg).unwrap();
        assert_eq!(value["rating"], 1600);
        assert_eq!(value["leaderboard_id"], 3);
        assert_eq!(value["faction"], "orks");
    }
}
