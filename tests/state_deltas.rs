use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use arena_screens::competition::{Corner, LeagueScores};
use arena_screens::resolver::CurrentNext;
use arena_screens::rotation::{PageKind, ticks_per_page};
use arena_screens::scheduler::DualLoop;
use arena_screens::state::{AppState, Delta, DisplayMode, ReferenceData, apply_delta};
use arena_screens::timing::Match;
use arena_screens::view::{corner_labels, schedule_rows, status_line, sync_countdown};

fn reference() -> ReferenceData {
    ReferenceData {
        corners: ["green", "orange", "purple", "yellow"]
            .iter()
            .enumerate()
            .map(|(index, colour)| Corner {
                index,
                colour: colour.to_string(),
            })
            .collect(),
        arenas: vec!["A".to_string()],
        teams: HashMap::new(),
    }
}

fn arena_state() -> AppState {
    AppState::new(
        DisplayMode::Arena {
            arena: "A".to_string(),
            main_corner: 1,
        },
        reference(),
    )
}

fn match_at(number: u32, start: DateTime<Utc>) -> Match {
    Match {
        number,
        teams: vec![
            Some(format!("A{number}")),
            Some(format!("B{number}")),
            None,
            Some(format!("D{number}")),
        ],
        start_time: start,
        end_time: start + ChronoDuration::seconds(240),
    }
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 12, 12, 0, 0).unwrap()
}

#[test]
fn current_match_fills_every_corner() {
    let now = noon();
    let mut state = arena_state();
    apply_delta(
        &mut state,
        Delta::SetCurrentNext(CurrentNext::new(
            Some(match_at(7, now - ChronoDuration::seconds(170))),
            None,
        )),
    );

    let labels = corner_labels(&state, now);
    assert_eq!(labels.len(), 4);
    assert_eq!(labels[0].team, "A7");
    assert_eq!(labels[0].colour, "green");
    assert!(labels[0].match_label.is_none());

    let main = &labels[1];
    assert!(main.main);
    assert_eq!(main.team, "B7");
    assert_eq!(main.match_label.as_deref(), Some("Match 7"));
    assert_eq!(main.time_left.as_deref(), Some("0:10"));
    assert!(!main.waiting);

    assert_eq!(labels[2].team, "");
    assert_eq!(state.logs.back().map(String::as_str), Some("[INFO] Match 7 is now current"));
}

#[test]
fn finished_match_hands_over_to_next() {
    let now = noon();
    let mut state = arena_state();
    apply_delta(
        &mut state,
        Delta::SetCurrentNext(CurrentNext::new(
            Some(match_at(7, now - ChronoDuration::seconds(181))),
            Some(match_at(8, now + ChronoDuration::seconds(59))),
        )),
    );

    let labels = corner_labels(&state, now);
    let main = &labels[1];
    assert_eq!(main.team, "B8");
    assert_eq!(main.match_label.as_deref(), Some("Match 8"));
    assert_eq!(main.time_left.as_deref(), Some("-0:59"));
    assert!(main.waiting);
}

#[test]
fn no_matches_clears_the_corners() {
    let mut state = arena_state();
    apply_delta(&mut state, Delta::SetCurrentNext(CurrentNext::default()));
    let labels = corner_labels(&state, noon());
    assert!(labels.iter().all(|l| l.team.is_empty() && l.time_left.is_none()));
}

#[test]
fn countdown_overlay_shows_and_hides_on_edges() {
    let start = noon() + ChronoDuration::seconds(10);
    let mut state = arena_state();
    apply_delta(
        &mut state,
        Delta::SetCurrentNext(CurrentNext::new(None, Some(match_at(9, start)))),
    );

    let far = sync_countdown(&mut state, noon());
    assert!(!far.visibility);
    assert!(!state.countdown.visible());

    let near = sync_countdown(&mut state, noon() + ChronoDuration::seconds(5));
    assert!(near.visibility);
    assert!(state.countdown.visible());
    assert_eq!(state.countdown.text(), "5");

    let again = sync_countdown(&mut state, noon() + ChronoDuration::milliseconds(5500));
    assert!(!again.visibility);

    let started = sync_countdown(&mut state, noon() + ChronoDuration::seconds(11));
    assert!(started.visibility);
    assert!(!state.countdown.visible());

    let edges = state
        .logs
        .iter()
        .filter(|l| l.starts_with("[INFO] Countdown"))
        .count();
    assert_eq!(edges, 2);
}

/// Same hand-off the UI loop performs when draining the provider channel.
fn receive(state: &mut AppState, dual: &mut DualLoop, delta: Delta) {
    if matches!(delta, Delta::SetCurrentNext(_)) {
        dual.refresh_completed();
    }
    apply_delta(state, delta);
}

#[test]
fn first_current_next_delta_arms_rendering() {
    let start = Instant::now();
    let mut dual = DualLoop::new(Duration::from_secs(1), Duration::from_millis(50));
    let mut state = arena_state();

    assert!(dual.tick(start).refresh);
    let warning = Delta::Log("[WARN] Match poll error: timeout".to_string());
    receive(&mut state, &mut dual, warning);
    assert!(!dual.tick(start + Duration::from_millis(60)).render);

    let at = start + Duration::from_millis(120);
    let pair = Delta::SetCurrentNext(CurrentNext::default());
    receive(&mut state, &mut dual, pair);
    assert!(dual.tick(at).render);
    assert_eq!(dual.renders(), 1);
    assert!(state.current_next_at.is_some());
}

#[test]
fn outside_state_collects_page_data() {
    let mut state = AppState::new(DisplayMode::Outside, reference());
    let now = noon();
    apply_delta(
        &mut state,
        Delta::SetSchedule {
            arena: "A".to_string(),
            rows: vec![None, Some(match_at(3, now)), Some(match_at(4, now))],
        },
    );
    apply_delta(
        &mut state,
        Delta::SetLeague(LeagueScores {
            points: vec![("A3".to_string(), 4.0)],
            last_scored: Some(2),
        }),
    );

    let rows = schedule_rows(&state.schedule["A"]);
    assert_eq!(rows.len(), 3);
    assert!(rows[0].number.is_none());
    assert_eq!(rows[1].number.as_deref(), Some("3"));
    assert_eq!(rows[2].teams[2], "—");
    assert_eq!(state.league.last_scored, Some(2));

    let rotator = state.rotator.as_mut().expect("outside mode rotates");
    for _ in 0..ticks_per_page() {
        rotator.tick();
    }
    assert_eq!(rotator.current_page().map(|p| p.kind), Some(PageKind::Scores));
    let status = status_line(rotator);
    assert_eq!(status.position, 2);
    assert_eq!(status.count, 4);
}
