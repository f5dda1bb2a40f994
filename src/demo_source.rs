use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::competition::{CompetitionSource, Corner, LeagueScores, MatchSlot, RawMatch};

const SLOT_SECS: i64 = 240;
const LEAGUE_MATCHES: u32 = 48;
/// The first match has been running this long when the source is created.
const LEAD_IN_SECS: i64 = 100;
const ARENAS: [&str; 2] = ["A", "B"];
const CORNER_COLOURS: [&str; 4] = ["#00cc44", "#ff8800", "#cc00cc", "#ffdd00"];
const TEAMS: [(&str, &str); 16] = [
    ("BEE", "Beeston Bots"),
    ("CLF", "Clifton College"),
    ("GMR", "Gosforth Mechatronics"),
    ("HRS", "Harrow Robotics Society"),
    ("ICS", "Imperial College School"),
    ("KES", "King Edward's"),
    ("LFG", "Lincoln Forge"),
    ("MAI", "Maidstone Academy"),
    ("NUL", "Null Pointers"),
    ("PSC", "Peter Symonds"),
    ("QMC", "Queen Mary's College"),
    ("RGS", "Reading Grammar"),
    ("SEN", "Sensible Engineers"),
    ("TTN", "Tiffin Tinkerers"),
    ("WYC", "Wycombe Abbey"),
    ("ZEN", "Zenith Robotics"),
];

pub struct DemoCompetition {
    epoch: DateTime<Utc>,
    draw: Vec<&'static str>,
}

impl DemoCompetition {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let mut draw = TEAMS.iter().map(|(tla, _)| *tla).collect::<Vec<_>>();
        draw.shuffle(&mut rng);
        Self {
            epoch: Utc::now() - ChronoDuration::seconds(LEAD_IN_SECS),
            draw,
        }
    }

    /// Fixed epoch and draw, for tests and benchmarks.
    pub fn seeded(epoch: DateTime<Utc>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = TEAMS.iter().map(|(tla, _)| *tla).collect::<Vec<_>>();
        draw.shuffle(&mut rng);
        Self { epoch, draw }
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn slot_start(&self, num: u32) -> DateTime<Utc> {
        self.epoch + ChronoDuration::seconds(i64::from(num) * SLOT_SECS)
    }

    fn league_match(&self, arena_idx: usize, num: u32) -> RawMatch {
        let base = (num as usize * ARENAS.len() + arena_idx) * CORNER_COLOURS.len();
        let teams = (0..CORNER_COLOURS.len())
            .map(|corner| {
                // every seventh match runs a corner short
                if num % 7 == 6 && corner == CORNER_COLOURS.len() - 1 {
                    None
                } else {
                    Some(self.draw[(base + corner) % self.draw.len()].to_string())
                }
            })
            .collect();
        self.raw_match(num, ARENAS[arena_idx], teams)
    }

    fn raw_match(&self, num: u32, arena: &str, teams: Vec<Option<String>>) -> RawMatch {
        let start = self.slot_start(num);
        let end = start + ChronoDuration::seconds(SLOT_SECS);
        RawMatch {
            num,
            arena: Some(arena.to_string()),
            teams,
            start_time: start.to_rfc3339_opts(SecondsFormat::Secs, false),
            end_time: end.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }

    /// Index of the slot containing `now`; negative before the first match.
    fn slot_index(&self, now: DateTime<Utc>) -> i64 {
        (now - self.epoch).num_seconds().div_euclid(SLOT_SECS)
    }

    pub fn matches_at(
        &self,
        arena: &str,
        selector: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchSlot>> {
        let arena_idx = ARENAS
            .iter()
            .position(|a| *a == arena)
            .ok_or_else(|| anyhow!("unknown arena {arena:?}"))?;
        let current = self.slot_index(now);
        selector
            .split(',')
            .map(|term| {
                let offset = selector_offset(term.trim())?;
                let idx = current + offset;
                let slot = if (0..i64::from(LEAGUE_MATCHES)).contains(&idx) {
                    MatchSlot::Scheduled(self.league_match(arena_idx, idx as u32))
                } else {
                    MatchSlot::Absent {
                        error: Value::Bool(true),
                    }
                };
                Ok(slot)
            })
            .collect()
    }

    pub fn league_scores_at(&self, now: DateTime<Utc>) -> LeagueScores {
        let played = self
            .slot_index(now)
            .clamp(0, i64::from(LEAGUE_MATCHES)) as u32;
        let mut points: BTreeMap<String, f64> = self
            .draw
            .iter()
            .map(|tla| ((*tla).to_string(), 0.0))
            .collect();
        for num in 0..played {
            for arena_idx in 0..ARENAS.len() {
                let raw = self.league_match(arena_idx, num);
                for (corner, team) in raw.teams.iter().enumerate() {
                    let Some(team) = team else {
                        continue;
                    };
                    let award = ((num as usize + corner * 3) % 5) as f64;
                    *points.entry(team.clone()).or_insert(0.0) += award;
                }
            }
        }
        LeagueScores {
            points: points.into_iter().collect(),
            last_scored: played.checked_sub(1),
        }
    }

    fn knockout_rounds(&self) -> Vec<Vec<RawMatch>> {
        let first = LEAGUE_MATCHES;
        let seeds = |idx: usize| Some(self.draw[idx % self.draw.len()].to_string());
        let mut rounds = Vec::new();

        // quarters: each match split over both arenas
        let mut quarters = Vec::new();
        for q in 0..4u32 {
            for (arena_idx, arena) in ARENAS.iter().enumerate() {
                let base = (q as usize * 2 + arena_idx) * 2;
                let teams = vec![seeds(base), seeds(base + 1), None, None];
                quarters.push(self.raw_match(first + q, arena, teams));
            }
        }
        rounds.push(quarters);

        let mut semis = Vec::new();
        for s in 0..2u32 {
            for arena in ARENAS {
                semis.push(self.raw_match(first + 4 + s, arena, vec![None; CORNER_COLOURS.len()]));
            }
        }
        rounds.push(semis);

        rounds.push(vec![self.raw_match(
            first + 6,
            ARENAS[0],
            vec![None; CORNER_COLOURS.len()],
        )]);
        rounds
    }
}

impl Default for DemoCompetition {
    fn default() -> Self {
        Self::new()
    }
}

impl CompetitionSource for DemoCompetition {
    fn matches(&self, arena: &str, selector: &str) -> Result<Vec<MatchSlot>> {
        self.matches_at(arena, selector, Utc::now())
    }

    fn knockouts(&self) -> Result<Vec<Vec<RawMatch>>> {
        Ok(self.knockout_rounds())
    }

    fn corners(&self) -> Result<Vec<Corner>> {
        Ok(CORNER_COLOURS
            .iter()
            .enumerate()
            .map(|(index, colour)| Corner {
                index,
                colour: (*colour).to_string(),
            })
            .collect())
    }

    fn arenas(&self) -> Result<Vec<String>> {
        Ok(ARENAS.iter().map(|a| (*a).to_string()).collect())
    }

    fn league_scores(&self) -> Result<LeagueScores> {
        Ok(self.league_scores_at(Utc::now()))
    }

    fn teams(&self) -> Result<HashMap<String, String>> {
        Ok(TEAMS
            .iter()
            .map(|(tla, name)| ((*tla).to_string(), (*name).to_string()))
            .collect())
    }
}

fn selector_offset(term: &str) -> Result<i64> {
    match term {
        "previous" => Ok(-1),
        "current" => Ok(0),
        "next" => Ok(1),
        _ => {
            let extra = term
                .strip_prefix("next+")
                .and_then(|n| n.parse::<i64>().ok())
                .ok_or_else(|| anyhow!("unsupported selector {term:?}"))?;
            Ok(1 + extra)
        }
    }
}
