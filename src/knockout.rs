use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::competition::RawMatch;
use crate::timing::parse_timestamp;

/// One arena's instance of a knockout match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnockoutGame {
    pub num: u32,
    pub arena: String,
    pub teams: Vec<Option<String>>,
    pub start_time: DateTime<Utc>,
}

impl KnockoutGame {
    pub fn from_raw(raw: &RawMatch) -> Result<Self> {
        let start_time = parse_timestamp(&raw.start_time)
            .with_context(|| format!("knockout match {} start_time", raw.num))?;
        Ok(Self {
            num: raw.num,
            arena: raw.arena.clone().unwrap_or_default(),
            teams: raw.teams.clone(),
            start_time,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    pub arena: String,
    pub teams: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub number: u32,
    pub description: String,
    pub time: DateTime<Utc>,
    pub games: Vec<GameEntry>,
}

impl MatchGroup {
    /// Arena to print in front of a game line; only set when the match is
    /// split across arenas.
    pub fn arena_label<'a>(&self, game: &'a GameEntry) -> Option<&'a str> {
        (self.games.len() > 1).then_some(game.arena.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// 0 for the final, 1 for the semi-finals, and so on.
    pub rounds_after_this: usize,
    pub groups: Vec<MatchGroup>,
}

pub fn rounds_from_raw(rounds: &[Vec<RawMatch>]) -> Result<Vec<Vec<KnockoutGame>>> {
    rounds
        .iter()
        .map(|round| round.iter().map(KnockoutGame::from_raw).collect())
        .collect()
}

/// Splits `games` into runs of equal match number. Input must already be in
/// match order; a number that reappears after a gap starts a new run.
pub fn group_games(games: &[KnockoutGame]) -> Vec<&[KnockoutGame]> {
    games.chunk_by(|a, b| a.num == b.num).collect()
}

pub fn describe_match(num_in_round: usize, match_num: u32, rounds_after_this: usize) -> String {
    match rounds_after_this {
        0 => format!("Final (#{match_num})"),
        1 => format!("Semi {num_in_round} (#{match_num})"),
        2 => format!("Quarter {num_in_round} (#{match_num})"),
        _ => format!("Match {match_num}"),
    }
}

pub fn process_round(round: &[KnockoutGame], rounds_after_this: usize) -> Round {
    let groups = group_games(round)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, games)| {
            let first = games.first()?;
            Some(MatchGroup {
                number: first.num,
                description: describe_match(idx, first.num, rounds_after_this),
                time: first.start_time,
                games: games
                    .iter()
                    .map(|g| GameEntry {
                        arena: g.arena.clone(),
                        teams: g.teams.clone(),
                    })
                    .collect(),
            })
        })
        .collect();
    Round {
        rounds_after_this,
        groups,
    }
}

pub fn process_knockouts(rounds: &[Vec<KnockoutGame>]) -> Vec<Round> {
    let total = rounds.len();
    rounds
        .iter()
        .enumerate()
        .map(|(idx, round)| process_round(round, total - idx - 1))
        .collect()
}
