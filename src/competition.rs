use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::{fetch_text, http_client};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5112/comp-api";

/// Selector for the arena screen: the live slot and the one after it.
pub const CURRENT_NEXT: &str = "current,next";
/// Selector for the outside schedule tables.
pub const SCHEDULE_WINDOW: &str = "previous,current,next,next+1,next+2,next+3";

/// Read side of the competition API. Every call blocks until the response is
/// parsed; the provider runs them off the UI thread.
pub trait CompetitionSource: Send + Sync {
    fn matches(&self, arena: &str, selector: &str) -> Result<Vec<MatchSlot>>;
    fn knockouts(&self) -> Result<Vec<Vec<RawMatch>>>;
    fn corners(&self) -> Result<Vec<Corner>>;
    fn arenas(&self) -> Result<Vec<String>>;
    fn league_scores(&self) -> Result<LeagueScores>;
    fn teams(&self) -> Result<HashMap<String, String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMatch {
    pub num: u32,
    #[serde(default)]
    pub arena: Option<String>,
    #[serde(default)]
    pub teams: Vec<Option<String>>,
    pub start_time: String,
    pub end_time: String,
}

/// One position of a `matches` response. The server answers positions it
/// has nothing for (e.g. `next` after the final) with an `error` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MatchSlot {
    Absent { error: Value },
    Scheduled(RawMatch),
}

impl MatchSlot {
    pub fn scheduled(&self) -> Option<&RawMatch> {
        match self {
            MatchSlot::Scheduled(raw) => Some(raw),
            MatchSlot::Absent { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Corner {
    #[serde(skip)]
    pub index: usize,
    pub colour: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueScores {
    /// Ordered by TLA.
    pub points: Vec<(String, f64)>,
    pub last_scored: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<MatchSlot>,
}

#[derive(Debug, Deserialize)]
struct KnockoutsResponse {
    #[serde(default)]
    rounds: Vec<Vec<RawMatch>>,
}

#[derive(Debug, Deserialize)]
struct CornersResponse {
    #[serde(default)]
    corners: BTreeMap<String, Corner>,
}

#[derive(Debug, Deserialize)]
struct ArenasResponse {
    #[serde(default)]
    arenas: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScoresResponse {
    #[serde(default)]
    league_points: BTreeMap<String, f64>,
    #[serde(default)]
    last_scored: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    #[serde(default)]
    teams: HashMap<String, TeamEntry>,
}

/// Older servers send the display name directly, newer ones an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TeamEntry {
    Name(String),
    Record { name: String },
}

pub struct HttpCompetition {
    base_url: String,
}

impl HttpCompetition {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> Result<String> {
        let client = http_client()?;
        let url = format!("{}/{path}", self.base_url);
        fetch_text(client, &url).with_context(|| format!("GET {url}"))
    }
}

impl CompetitionSource for HttpCompetition {
    fn matches(&self, arena: &str, selector: &str) -> Result<Vec<MatchSlot>> {
        let body = self.get(&format!("matches/{arena}/{selector}"))?;
        parse_matches_json(&body)
    }

    fn knockouts(&self) -> Result<Vec<Vec<RawMatch>>> {
        let body = self.get("matches/knockouts")?;
        parse_knockouts_json(&body)
    }

    fn corners(&self) -> Result<Vec<Corner>> {
        let body = self.get("corners")?;
        parse_corners_json(&body)
    }

    fn arenas(&self) -> Result<Vec<String>> {
        let body = self.get("arenas")?;
        parse_arenas_json(&body)
    }

    fn league_scores(&self) -> Result<LeagueScores> {
        let body = self.get("scores/league")?;
        parse_scores_json(&body)
    }

    fn teams(&self) -> Result<HashMap<String, String>> {
        let body = self.get("teams")?;
        parse_teams_json(&body)
    }
}

fn is_empty_body(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == "null"
}

pub fn parse_matches_json(raw: &str) -> Result<Vec<MatchSlot>> {
    if is_empty_body(raw) {
        return Ok(Vec::new());
    }
    let resp: MatchesResponse = serde_json::from_str(raw).context("invalid matches json")?;
    Ok(resp.matches)
}

pub fn parse_knockouts_json(raw: &str) -> Result<Vec<Vec<RawMatch>>> {
    if is_empty_body(raw) {
        return Ok(Vec::new());
    }
    let resp: KnockoutsResponse = serde_json::from_str(raw).context("invalid knockouts json")?;
    Ok(resp.rounds)
}

pub fn parse_corners_json(raw: &str) -> Result<Vec<Corner>> {
    if is_empty_body(raw) {
        return Ok(Vec::new());
    }
    let resp: CornersResponse = serde_json::from_str(raw).context("invalid corners json")?;
    let mut corners = Vec::with_capacity(resp.corners.len());
    for (key, mut corner) in resp.corners {
        corner.index = key
            .trim()
            .parse::<usize>()
            .with_context(|| format!("corner key {key:?} is not an index"))?;
        corners.push(corner);
    }
    // BTreeMap orders "10" before "2"; sort numerically.
    corners.sort_by_key(|c| c.index);
    Ok(corners)
}

pub fn parse_arenas_json(raw: &str) -> Result<Vec<String>> {
    if is_empty_body(raw) {
        return Ok(Vec::new());
    }
    let resp: ArenasResponse = serde_json::from_str(raw).context("invalid arenas json")?;
    Ok(resp.arenas)
}

pub fn parse_scores_json(raw: &str) -> Result<LeagueScores> {
    if is_empty_body(raw) {
        return Ok(LeagueScores::default());
    }
    let resp: ScoresResponse = serde_json::from_str(raw).context("invalid scores json")?;
    Ok(LeagueScores {
        points: resp.league_points.into_iter().collect(),
        last_scored: resp.last_scored,
    })
}

pub fn parse_teams_json(raw: &str) -> Result<HashMap<String, String>> {
    if is_empty_body(raw) {
        return Ok(HashMap::new());
    }
    let resp: TeamsResponse = serde_json::from_str(raw).context("invalid teams json")?;
    Ok(resp
        .teams
        .into_iter()
        .map(|(tla, entry)| {
            let name = match entry {
                TeamEntry::Name(name) => name,
                TeamEntry::Record { name } => name,
            };
            (tla, name)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_slot_is_absent() {
        let raw = r#"{"matches":[{"error":true,"message":"no next match"}]}"#;
        let slots = parse_matches_json(raw).expect("should parse");
        assert_eq!(slots.len(), 1);
        assert!(slots[0].scheduled().is_none());
    }

    #[test]
    fn corners_sort_numerically() {
        let mut body = String::from(r#"{"corners":{"#);
        for i in 0..11 {
            if i > 0 {
                body.push(',');
            }
            body.push_str(&format!(r##""{i}":{{"colour":"#00{i:04}"}}"##));
        }
        body.push_str("}}");
        let corners = parse_corners_json(&body).expect("should parse");
        let indices = corners.iter().map(|c| c.index).collect::<Vec<_>>();
        assert_eq!(indices, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn corner_key_must_be_numeric() {
        let raw = r#"{"corners":{"north":{"colour":"red"}}}"#;
        assert!(parse_corners_json(raw).is_err());
    }

    #[test]
    fn teams_accept_both_shapes() {
        let raw = r#"{"teams":{"ABC":"Alpha Bravo","XYZ":{"name":"X-Ray","rookie":true}}}"#;
        let teams = parse_teams_json(raw).expect("should parse");
        assert_eq!(teams.get("ABC").map(String::as_str), Some("Alpha Bravo"));
        assert_eq!(teams.get("XYZ").map(String::as_str), Some("X-Ray"));
    }

    #[test]
    fn http_base_url_drops_trailing_slash() {
        let source = HttpCompetition::new("http://example.test/comp-api/");
        assert_eq!(source.base_url(), "http://example.test/comp-api");
    }
}
