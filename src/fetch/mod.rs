//! Ranking API client.
//!
//! Fetches per-faction leaderboards and player stats from the Relic
//! community API. Board rows arrive as ranked stat rows keyed by an opaque
//! stat-group id, joined against a parallel `statGroups` array for
//! name/country/XP. The client paginates boards, batches name lookups, and
//! enforces an explicit per-request timeout.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RelicConfig;
use crate::models::{Faction, LadderRow, LeaderboardDef, PlayerProfile, PlayerStanding};

/// Rows requested per leaderboard page.
const PAGE_SIZE: u32 = 200;

/// Profile ids per name-resolution request.
const NAME_BATCH_SIZE: usize = 25;

/// Errors that can occur while talking to the ranking API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Unknown profile: {0}")]
    ProfileNotFound(String),
}

/// Seam between the pipeline and the external ranking service.
///
/// The production implementation is [`RelicClient`]; tests swap in a mock.
#[async_trait]
pub trait RankingApi: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch every ranked row of one board, paginating as needed.
    async fn fetch_board(&self, leaderboard_id: u32) -> Result<Vec<LadderRow>, FetchError>;

    /// Best-effort batch resolution of profile ids to display names.
    /// A failed batch contributes no entries; absence is not an error.
    async fn resolve_names(&self, profile_ids: &[String]) -> HashMap<String, String>;

    /// Fetch one player's profile and standings across all boards.
    async fn fetch_personal(&self, profile_id: &str) -> Result<PlayerProfile, FetchError>;
}

// ── Wire types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    result: ApiResult,

    #[serde(default, rename = "statGroups")]
    stat_groups: Vec<WireStatGroup>,

    #[serde(default, rename = "leaderboardStats")]
    leaderboard_stats: Vec<WireStatRow>,

    #[serde(default, rename = "rankTotal")]
    rank_total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireStatGroup {
    id: i64,

    #[serde(default)]
    members: Vec<WireMember>,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    profile_id: i64,

    #[serde(default)]
    alias: Option<String>,

    #[serde(default)]
    country: Option<String>,

    #[serde(default)]
    xp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireStatRow {
    statgroup_id: i64,
    leaderboard_id: u32,
    wins: u32,
    losses: u32,
    streak: i32,
    rating: i32,
    rank: i64,

    #[serde(default)]
    lastmatchdate: Option<i64>,
}

impl ApiEnvelope {
    fn check(self) -> Result<Self, FetchError> {
        if self.result.code != 0 {
            return Err(FetchError::Api {
                code: self.result.code,
                message: self.result.message,
            });
        }
        Ok(self)
    }
}

/// Join ranked stat rows against their stat groups, keeping only rows for
/// the requested board. Rows whose stat group is missing are dropped.
fn map_board_rows(envelope: &ApiEnvelope, leaderboard_id: u32, faction: Option<Faction>) -> Vec<LadderRow> {
    let members: HashMap<i64, &WireMember> = envelope
        .stat_groups
        .iter()
        .filter_map(|g| g.members.first().map(|m| (g.id, m)))
        .collect();

    envelope
        .leaderboard_stats
        .iter()
        .filter(|s| s.leaderboard_id == leaderboard_id && s.rank >= 1)
        .filter_map(|s| {
            let member = match members.get(&s.statgroup_id) {
                Some(m) => m,
                None => {
                    warn!(
                        "Dropping row with unknown stat group {} on board {}",
                        s.statgroup_id, leaderboard_id
                    );
                    return None;
                }
            };

            Some(LadderRow {
                rank: s.rank as u32,
                profile_id: member.profile_id.to_string(),
                player_name: member.alias.clone().unwrap_or_default(),
                rating: s.rating,
                wins: s.wins,
                losses: s.losses,
                winrate: LadderRow::winrate(s.wins, s.losses),
                streak: s.streak,
                faction,
                xp: member.xp,
                last_match_at: s.lastmatchdate.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            })
        })
        .collect()
}

/// Deduplicate ids preserving first-seen order, then split into batches.
fn name_batches(profile_ids: &[String]) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let deduped: Vec<String> = profile_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect();

    deduped
        .chunks(NAME_BATCH_SIZE)
        .map(|chunk| chunk.to_vec())
        .collect()
}

// ── Client ───────────────────────────────────────────────────────

/// HTTP client for the Relic community leaderboard API.
pub struct RelicClient {
    client: Client,
    config: RelicConfig,
}

impl RelicClient {
    /// Create a new client with an explicit request timeout.
    pub fn new(config: RelicConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("dow-ladder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    async fn get_envelope(&self, path_and_query: &str) -> Result<ApiEnvelope, FetchError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path_and_query);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let envelope: ApiEnvelope = response.json().await?;
        envelope.check()
    }

    async fn leaderboard_page(
        &self,
        leaderboard_id: u32,
        start: u32,
        count: u32,
    ) -> Result<ApiEnvelope, FetchError> {
        self.get_envelope(&format!(
            "/community/leaderboard/getleaderboard2?leaderboard_id={}&start={}&count={}&sortBy=1&title=dow1-de",
            leaderboard_id, start, count
        ))
        .await
    }

    async fn personal_stat(&self, profile_ids: &[String]) -> Result<ApiEnvelope, FetchError> {
        self.get_envelope(&format!(
            "/community/leaderboard/getpersonalstat?profile_ids=[{}]&title=dow1-de",
            profile_ids.join(",")
        ))
        .await
    }

    fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.config.rate_limit_ms)
    }
}

#[async_trait]
impl RankingApi for RelicClient {
    fn name(&self) -> &'static str {
        "relic"
    }

    async fn fetch_board(&self, leaderboard_id: u32) -> Result<Vec<LadderRow>, FetchError> {
        let faction = LeaderboardDef::by_id(leaderboard_id).map(|d| d.faction);
        let max_rows = self.config.max_rows as usize;

        let mut rows: Vec<LadderRow> = Vec::new();
        let mut start: u32 = 1;

        loop {
            let envelope = self.leaderboard_page(leaderboard_id, start, PAGE_SIZE).await?;
            let page = map_board_rows(&envelope, leaderboard_id, faction);
            let page_len = page.len();
            rows.extend(page);

            let total = envelope.rank_total.unwrap_or(0) as usize;
            let exhausted = page_len < PAGE_SIZE as usize
                || rows.len() >= max_rows
                || (total > 0 && rows.len() >= total);
            if exhausted {
                break;
            }

            start += PAGE_SIZE;
            tokio::time::sleep(self.batch_delay()).await;
        }

        rows.truncate(max_rows);
        debug!("Fetched {} rows for board {}", rows.len(), leaderboard_id);
        Ok(rows)
    }

    async fn resolve_names(&self, profile_ids: &[String]) -> HashMap<String, String> {
        let batches = name_batches(profile_ids);
        let mut names = HashMap::new();

        for (i, batch) in batches.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch_delay()).await;
            }

            match self.personal_stat(batch).await {
                Ok(envelope) => {
                    for group in &envelope.stat_groups {
                        for member in &group.members {
                            if let Some(alias) = member.alias.as_deref() {
                                if !alias.is_empty() {
                                    names.insert(member.profile_id.to_string(), alias.to_string());
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    // Non-fatal: these ids stay nameless for this cycle
                    warn!("Name resolution batch of {} ids failed: {}", batch.len(), e);
                }
            }
        }

        names
    }

    async fn fetch_personal(&self, profile_id: &str) -> Result<PlayerProfile, FetchError> {
        let envelope = self.personal_stat(&[profile_id.to_string()]).await?;

        let member = envelope
            .stat_groups
            .iter()
            .flat_map(|g| g.members.iter())
            .find(|m| m.profile_id.to_string() == profile_id)
            .ok_or_else(|| FetchError::ProfileNotFound(profile_id.to_string()))?;

        let standings = envelope
            .leaderboard_stats
            .iter()
            .filter(|s| s.rank >= 1)
            .map(|s| {
                PlayerStanding::new(
                    s.leaderboard_id,
                    s.rank as u32,
                    s.rating,
                    s.wins,
                    s.losses,
                    s.streak,
                    s.lastmatchdate.and_then(|ts| DateTime::from_timestamp(ts, 0)),
                )
            })
            .collect();

        Ok(PlayerProfile::new(
            profile_id.to_string(),
            member.alias.clone().unwrap_or_default(),
            member.country.clone(),
            member.xp,
            standings,
        ))
    }
}

// ── Mock backend for tests ───────────────────────────────────────

/// Mock ranking API for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockApi {
    boards: HashMap<u32, Vec<LadderRow>>,
    failing: HashSet<u32>,
    names: HashMap<String, String>,
    profiles: HashMap<String, PlayerProfile>,
}

#[cfg(test)]
impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_board(mut self, leaderboard_id: u32, rows: Vec<LadderRow>) -> Self {
        self.boards.insert(leaderboard_id, rows);
        self
    }

    pub fn with_failing_board(mut self, leaderboard_id: u32) -> Self {
        self.failing.insert(leaderboard_id);
        self
    }

    pub fn with_name(mut self, profile_id: &str, name: &str) -> Self {
        self.names.insert(profile_id.to_string(), name.to_string());
        self
    }

    pub fn with_profile(mut self, profile: PlayerProfile) -> Self {
        self.profiles.insert(profile.profile_id.clone(), profile);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl RankingApi for MockApi {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_board(&self, leaderboard_id: u32) -> Result<Vec<LadderRow>, FetchError> {
        if self.failing.contains(&leaderboard_id) {
            return Err(FetchError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(self.boards.get(&leaderboard_id).cloned().unwrap_or_default())
    }

    async fn resolve_names(&self, profile_ids: &[String]) -> HashMap<String, String> {
        profile_ids
            .iter()
            .filter_map(|id| self.names.get(id).map(|n| (id.clone(), n.clone())))
            .collect()
    }

    async fn fetch_personal(&self, profile_id: &str) -> Result<PlayerProfile, FetchError> {
        self.profiles
            .get(profile_id)
            .cloned()
            .ok_or_else(|| FetchError::ProfileNotFound(profile_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "result": {"code": 0, "message": "SUCCESS"},
        "statGroups": [
            {"id": 501, "members": [{"profile_id": 1001, "alias": "Boreale", "country": "gb", "xp": 120000}]},
            {"id": 502, "members": [{"profile_id": 1002, "alias": "Gorgutz", "country": "de", "xp": 45000}]}
        ],
        "leaderboardStats": [
            {"statgroup_id": 501, "leaderboard_id": 1, "wins": 40, "losses": 20, "streak": 4, "rating": 1620, "rank": 1, "lastmatchdate": 1754000000},
            {"statgroup_id": 502, "leaderboard_id": 1, "wins": 33, "losses": 30, "streak": -2, "rating": 1540, "rank": 2},
            {"statgroup_id": 502, "leaderboard_id": 3, "wins": 10, "losses": 2, "streak": 10, "rating": 1700, "rank": 1}
        ],
        "rankTotal": 2
    }"#;

    #[test]
    fn test_envelope_deserializes() {
        let envelope: ApiEnvelope = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(envelope.result.code, 0);
        assert_eq!(envelope.stat_groups.len(), 2);
        assert_eq!(envelope.leaderboard_stats.len(), 3);
        assert_eq!(envelope.rank_total, Some(2));
    }

    #[test]
    fn test_envelope_error_code() {
        let json = r#"{"result": {"code": 8, "message": "UNKNOWN_LEADERBOARD"}}"#;
        let envelope: ApiEnvelope = serde_json::from_str(json).unwrap();
        match envelope.check() {
            Err(FetchError::Api { code, message }) => {
                assert_eq!(code, 8);
                assert_eq!(message, "UNKNOWN_LEADERBOARD");
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_map_board_rows_joins_members() {
        let envelope: ApiEnvelope = serde_json::from_str(SAMPLE).unwrap();
        let rows = map_board_rows(&envelope, 1, Some(Faction::SpaceMarines));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].profile_id, "1001");
        assert_eq!(rows[0].player_name, "Boreale");
        assert_eq!(rows[0].rating, 1620);
        assert_eq!(rows[0].xp, Some(120_000));
        assert!(rows[0].last_match_at.is_some());
        assert!((rows[0].winrate - 40.0 / 60.0).abs() < 1e-9);

        // Board 3 rows are excluded from board 1
        assert!(rows.iter().all(|r| r.profile_id != "1002" || r.rating == 1540));
    }

    #[test]
    fn test_map_board_rows_drops_orphan_stat_rows() {
        let json = r#"{
            "result": {"code": 0, "message": "SUCCESS"},
            "statGroups": [],
            "leaderboardStats": [
                {"statgroup_id": 9, "leaderboard_id": 1, "wins": 1, "losses": 0, "streak": 1, "rating": 1500, "rank": 1}
            ]
        }"#;
        let envelope: ApiEnvelope = serde_json::from_str(json).unwrap();
        assert!(map_board_rows(&envelope, 1, None).is_empty());
    }

    #[test]
    fn test_map_board_rows_skips_unranked() {
        let json = r#"{
            "result": {"code": 0, "message": "SUCCESS"},
            "statGroups": [{"id": 1, "members": [{"profile_id": 5}]}],
            "leaderboardStats": [
                {"statgroup_id": 1, "leaderboard_id": 1, "wins": 1, "losses": 0, "streak": 1, "rating": 1500, "rank": -1}
            ]
        }"#;
        let envelope: ApiEnvelope = serde_json::from_str(json).unwrap();
        assert!(map_board_rows(&envelope, 1, None).is_empty());
    }

    #[test]
    fn test_name_batches_dedupe_and_size() {
        let ids: Vec<String> = (0..60).map(|i| (i % 30).to_string()).collect();
        let batches = name_batches(&ids);

        // 30 unique ids in batches of 25
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 25);
        assert_eq!(batches[1].len(), 5);
        // First-seen order preserved
        assert_eq!(batches[0][0], "0");
    }

    #[test]
    fn test_name_batches_empty() {
        assert!(name_batches(&[]).is_empty());
    }

    #[test]
    fn test_client_construction() {
        let client = RelicClient::new(RelicConfig::default()).unwrap();
        assert_eq!(client.name(), "relic");
    }

    #[tokio::test]
    async fn test_mock_api_failure_and_names() {
        let api = MockApi::new()
            .with_board(1, vec![])
            .with_failing_board(2)
            .with_name("7", "Sindri");

        assert!(api.fetch_board(1).await.unwrap().is_empty());
        assert!(api.fetch_board(2).await.is_err());

        let names = api.resolve_names(&["7".to_string(), "8".to_string()]).await;
        assert_eq!(names.get("7").map(String::as_str), Some("Sindri"));
        assert!(!names.contains_key("8"));
    }
}
