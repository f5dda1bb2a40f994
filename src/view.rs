use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};

use crate::competition::LeagueScores;
use crate::countdown::OverlayChange;
use crate::resolver::SlotDisplay;
use crate::rotation::PageRotator;
use crate::state::AppState;
use crate::timing::Match;

pub const SCORES_PER_ROW: usize = 5;
pub const LEADERBOARD_SIZE: usize = 10;
pub const EMPTY_TEAM: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CornerLabel {
    pub slot: usize,
    pub colour: String,
    pub main: bool,
    pub team: String,
    /// Only the main corner carries the match number and clock.
    pub match_label: Option<String>,
    pub time_left: Option<String>,
    /// True while counting down to a match rather than through one.
    pub waiting: bool,
}

pub fn corner_labels(state: &AppState, now: DateTime<Utc>) -> Vec<CornerLabel> {
    let main_corner = state.main_corner();
    state
        .current_next
        .resolve_slots(state.corner_count(), now)
        .into_iter()
        .enumerate()
        .map(|(slot, display)| {
            let main = main_corner == Some(slot);
            let colour = state
                .reference
                .corner_colour(slot)
                .unwrap_or_default()
                .to_string();
            match display {
                SlotDisplay::Showing {
                    team,
                    match_number,
                    time_left,
                } => CornerLabel {
                    slot,
                    colour,
                    main,
                    team: team.unwrap_or_default(),
                    match_label: main.then(|| format!("Match {match_number}")),
                    time_left: main.then(|| format_time_delta(time_left)),
                    waiting: time_left <= 0,
                },
                SlotDisplay::Cleared => CornerLabel {
                    slot,
                    colour,
                    main,
                    team: String::new(),
                    match_label: None,
                    time_left: None,
                    waiting: false,
                },
            }
        })
        .collect()
}

/// Pushes the current time-to-start into the countdown overlay and logs the
/// visibility edges.
pub fn sync_countdown(state: &mut AppState, now: DateTime<Utc>) -> OverlayChange {
    let time_to_start = state.current_next.countdown_seconds(now);
    let text = if state.current_next.next.is_some() {
        time_to_start.to_string()
    } else {
        String::new()
    };
    let change = state.countdown.update(&text, time_to_start);
    if change.visibility {
        let msg = if state.countdown.visible() {
            format!("[INFO] Countdown shown ({time_to_start}s to start)")
        } else {
            "[INFO] Countdown hidden".to_string()
        };
        state.push_log(msg);
    }
    change
}

/// `m:ss`, with a leading minus for negative values.
pub fn format_time_delta(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let abs = secs.unsigned_abs();
    format!("{sign}{}:{:02}", abs / 60, abs % 60)
}

pub fn format_clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn team_or_dash(team: Option<&str>) -> &str {
    team.filter(|t| !t.is_empty()).unwrap_or(EMPTY_TEAM)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEmphasis {
    Previous,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub emphasis: RowEmphasis,
    pub number: Option<String>,
    pub time: Option<String>,
    /// One entry per corner; empty when the server had no match here.
    pub teams: Vec<String>,
}

/// Rows for `previous,current,next,...`: the first row is the previous
/// match, the second the current one.
pub fn schedule_rows(rows: &[Option<Match>]) -> Vec<ScheduleRow> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let emphasis = match idx {
                0 => RowEmphasis::Previous,
                1 => RowEmphasis::Current,
                _ => RowEmphasis::Upcoming,
            };
            match row {
                Some(m) => ScheduleRow {
                    emphasis,
                    number: Some(m.number.to_string()),
                    time: Some(format_clock(m.start_time)),
                    teams: m
                        .teams
                        .iter()
                        .map(|t| team_or_dash(t.as_deref()).to_string())
                        .collect(),
                },
                None => ScheduleRow {
                    emphasis,
                    number: None,
                    time: None,
                    teams: Vec::new(),
                },
            }
        })
        .collect()
}

pub fn format_points(points: f64) -> String {
    format!("{points}")
}

pub fn score_grid(league: &LeagueScores) -> Vec<Vec<(String, String)>> {
    league
        .points
        .chunks(SCORES_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|(tla, points)| (tla.clone(), format_points(*points)))
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderRow {
    pub tla: String,
    pub name: String,
    pub points: String,
}

/// Top teams by league points, highest first; ties keep TLA order.
pub fn leaderboard_rows(league: &LeagueScores, teams: &HashMap<String, String>) -> Vec<LeaderRow> {
    let mut rows = league.points.iter().collect::<Vec<_>>();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    rows.into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|(tla, points)| LeaderRow {
            tla: tla.clone(),
            name: teams.get(tla).cloned().unwrap_or_default(),
            points: format_points(*points),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub page: String,
    pub position: usize,
    pub count: usize,
    pub progress: f64,
}

pub fn status_line(rotator: &PageRotator) -> StatusLine {
    StatusLine {
        page: rotator
            .current_page()
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        position: rotator.display_position(),
        count: rotator.page_count(),
        progress: rotator.progress(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_delta_formats() {
        assert_eq!(format_time_delta(0), "0:00");
        assert_eq!(format_time_delta(75), "1:15");
        assert_eq!(format_time_delta(-9), "-0:09");
        assert_eq!(format_time_delta(-600), "-10:00");
    }

    #[test]
    fn score_grid_has_five_per_row() {
        let league = LeagueScores {
            points: (0..12).map(|i| (format!("T{i:02}"), f64::from(i))).collect(),
            last_scored: Some(3),
        };
        let grid = score_grid(&league);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0].len(), 5);
        assert_eq!(grid[2].len(), 2);
        assert_eq!(grid[2][1], ("T11".to_string(), "11".to_string()));
    }

    #[test]
    fn leaderboard_is_top_ten_descending() {
        let league = LeagueScores {
            points: (0..14)
                .map(|i| (format!("T{i:02}"), f64::from(i % 7)))
                .collect(),
            last_scored: None,
        };
        let teams = HashMap::from([("T06".to_string(), "Six".to_string())]);
        let rows = leaderboard_rows(&league, &teams);
        assert_eq!(rows.len(), LEADERBOARD_SIZE);
        assert_eq!(rows[0].tla, "T06");
        assert_eq!(rows[0].name, "Six");
        assert_eq!(rows[1].tla, "T13");
        assert_eq!(rows[1].name, "");
        assert_eq!(rows[9].points, "2");
    }

    #[test]
    fn empty_team_renders_dash() {
        assert_eq!(team_or_dash(None), EMPTY_TEAM);
        assert_eq!(team_or_dash(Some("")), EMPTY_TEAM);
        assert_eq!(team_or_dash(Some("ABC")), "ABC");
    }

    #[test]
    fn fractional_points_keep_decimals() {
        assert_eq!(format_points(12.0), "12");
        assert_eq!(format_points(7.5), "7.5");
    }
}
