use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

use crate::competition::{Corner, LeagueScores};
use crate::countdown::CountdownOverlay;
use crate::knockout::Round;
use crate::resolver::CurrentNext;
use crate::rotation::{PageRotator, default_pages};
use crate::timing::Match;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMode {
    /// Countdown screen for one arena, seen from `main_corner`.
    Arena { arena: String, main_corner: usize },
    /// Rotating information pages for the whole venue.
    Outside,
}

/// Fetched once at startup and never changed afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub corners: Vec<Corner>,
    pub arenas: Vec<String>,
    pub teams: HashMap<String, String>,
}

impl ReferenceData {
    pub fn corner_colour(&self, slot: usize) -> Option<&str> {
        self.corners.get(slot).map(|c| c.colour.as_str())
    }

    pub fn team_name(&self, tla: &str) -> Option<&str> {
        self.teams.get(tla).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub mode: DisplayMode,
    pub reference: ReferenceData,
    pub current_next: CurrentNext,
    pub current_next_at: Option<SystemTime>,
    pub countdown: CountdownOverlay,
    /// Per arena, one row per schedule position; `None` where the server had
    /// no match for that position.
    pub schedule: HashMap<String, Vec<Option<Match>>>,
    pub league: LeagueScores,
    pub knockouts: Vec<Round>,
    pub rotator: Option<PageRotator>,
    pub logs: VecDeque<String>,
    pub console_overlay: bool,
    pub stale_after: Option<Duration>,
}

impl AppState {
    pub fn new(mode: DisplayMode, reference: ReferenceData) -> Self {
        let rotator = match mode {
            DisplayMode::Outside => Some(PageRotator::new(default_pages())),
            DisplayMode::Arena { .. } => None,
        };
        Self {
            mode,
            reference,
            current_next: CurrentNext::default(),
            current_next_at: None,
            countdown: CountdownOverlay::new("5"),
            schedule: HashMap::new(),
            league: LeagueScores::default(),
            knockouts: Vec::new(),
            rotator,
            logs: VecDeque::new(),
            console_overlay: false,
            stale_after: None,
        }
    }

    pub fn corner_count(&self) -> usize {
        self.reference.corners.len()
    }

    pub fn main_corner(&self) -> Option<usize> {
        match self.mode {
            DisplayMode::Arena { main_corner, .. } => Some(main_corner),
            DisplayMode::Outside => None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Only reports staleness when a threshold is configured; by default the
    /// last good poll keeps rendering indefinitely.
    pub fn is_stale(&self, now: SystemTime) -> bool {
        let Some(limit) = self.stale_after else {
            return false;
        };
        let Some(at) = self.current_next_at else {
            return false;
        };
        now.duration_since(at).is_ok_and(|age| age > limit)
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetCurrentNext(CurrentNext),
    SetSchedule {
        arena: String,
        rows: Vec<Option<Match>>,
    },
    SetLeague(LeagueScores),
    SetKnockouts(Vec<Round>),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderCommand {
    RefreshCurrentNext { arena: String },
    RefreshSchedule { arena: String },
    RefreshLeague,
    RefreshKnockouts,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetCurrentNext(pair) => {
            let previous = state.current_next.current.as_ref().map(|m| m.number);
            let incoming = pair.current.as_ref().map(|m| m.number);
            if previous != incoming {
                match incoming {
                    Some(num) => state.push_log(format!("[INFO] Match {num} is now current")),
                    None => state.push_log("[INFO] No current match"),
                }
            }
            state.current_next = pair;
            state.current_next_at = Some(SystemTime::now());
        }
        Delta::SetSchedule { arena, rows } => {
            state.schedule.insert(arena, rows);
        }
        Delta::SetLeague(league) => {
            state.league = league;
        }
        Delta::SetKnockouts(rounds) => {
            state.knockouts = rounds;
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_mode_owns_a_rotator() {
        let state = AppState::new(DisplayMode::Outside, ReferenceData::default());
        assert!(state.rotator.is_some());
        assert!(state.main_corner().is_none());

        let arena = AppState::new(
            DisplayMode::Arena {
                arena: "A".to_string(),
                main_corner: 2,
            },
            ReferenceData::default(),
        );
        assert!(arena.rotator.is_none());
        assert_eq!(arena.main_corner(), Some(2));
    }

    #[test]
    fn log_ring_is_capped() {
        let mut state = AppState::new(DisplayMode::Outside, ReferenceData::default());
        for i in 0..(MAX_LOGS + 25) {
            state.push_log(format!("line {i}"));
        }
        assert_eq!(state.logs.len(), MAX_LOGS);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 25"));
    }

    #[test]
    fn staleness_is_opt_in() {
        let mut state = AppState::new(DisplayMode::Outside, ReferenceData::default());
        let long_ago = SystemTime::now() - Duration::from_secs(600);
        state.current_next_at = Some(long_ago);
        assert!(!state.is_stale(SystemTime::now()));

        state.stale_after = Some(Duration::from_secs(30));
        assert!(state.is_stale(SystemTime::now()));
        state.current_next_at = Some(SystemTime::now());
        assert!(!state.is_stale(SystemTime::now()));
    }
}
