use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};

use crate::competition::{CURRENT_NEXT, CompetitionSource, SCHEDULE_WINDOW};
use crate::knockout::{Round, process_knockouts, rounds_from_raw};
use crate::resolver::CurrentNext;
use crate::state::{Delta, ProviderCommand, ReferenceData};
use crate::timing::{Match, match_from_slot};

/// Runs fetch commands from the UI loop and reports each result as a delta.
///
/// Commands execute on a small pool so a slow request only holds up its own
/// kind of data. A command that is still in flight when the same command
/// arrives again is dropped; the next scheduled one replaces it.
pub fn spawn_provider(
    source: Arc<dyn CompetitionSource>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) {
    thread::spawn(move || {
        let pool = build_fetch_pool();
        let inflight: Arc<Mutex<HashSet<ProviderCommand>>> = Arc::new(Mutex::new(HashSet::new()));

        while let Ok(cmd) = cmd_rx.recv() {
            {
                let mut inflight = inflight.lock().expect("inflight commands lock poisoned");
                if inflight.contains(&cmd) {
                    continue;
                }
                inflight.insert(cmd.clone());
            }

            let source = source.clone();
            let tx = tx.clone();
            let inflight = inflight.clone();
            let job = move || {
                for delta in run_command(source.as_ref(), &cmd) {
                    let _ = tx.send(delta);
                }
                let mut inflight = inflight.lock().expect("inflight commands lock poisoned");
                inflight.remove(&cmd);
            };

            if let Some(pool) = pool.as_ref() {
                pool.spawn(job);
            } else {
                thread::spawn(job);
            }
        }
    });
}

/// Executes one command synchronously. Failures come back as `[WARN]` log
/// deltas and leave the previously delivered state untouched.
pub fn run_command(source: &dyn CompetitionSource, cmd: &ProviderCommand) -> Vec<Delta> {
    match cmd {
        ProviderCommand::RefreshCurrentNext { arena } => match fetch_current_next(source, arena) {
            Ok(pair) => vec![Delta::SetCurrentNext(pair)],
            Err(err) => vec![Delta::Log(format!("[WARN] Match poll error: {err:#}"))],
        },
        ProviderCommand::RefreshSchedule { arena } => match fetch_schedule(source, arena) {
            Ok(rows) => vec![Delta::SetSchedule {
                arena: arena.clone(),
                rows,
            }],
            Err(err) => vec![Delta::Log(format!(
                "[WARN] Schedule error (arena {arena}): {err:#}"
            ))],
        },
        ProviderCommand::RefreshLeague => match source.league_scores() {
            Ok(league) => vec![Delta::SetLeague(league)],
            Err(err) => vec![Delta::Log(format!("[WARN] League scores error: {err:#}"))],
        },
        ProviderCommand::RefreshKnockouts => match fetch_knockouts(source) {
            Ok(rounds) => vec![Delta::SetKnockouts(rounds)],
            Err(err) => vec![Delta::Log(format!("[WARN] Knockouts error: {err:#}"))],
        },
    }
}

pub fn fetch_current_next(source: &dyn CompetitionSource, arena: &str) -> Result<CurrentNext> {
    let slots = source
        .matches(arena, CURRENT_NEXT)
        .context("current/next request failed")?;
    let current = slots.first().map(match_from_slot).transpose()?.flatten();
    let next = slots.get(1).map(match_from_slot).transpose()?.flatten();
    Ok(CurrentNext::new(current, next))
}

fn fetch_schedule(source: &dyn CompetitionSource, arena: &str) -> Result<Vec<Option<Match>>> {
    let slots = source
        .matches(arena, SCHEDULE_WINDOW)
        .context("schedule request failed")?;
    slots.iter().map(match_from_slot).collect()
}

fn fetch_knockouts(source: &dyn CompetitionSource) -> Result<Vec<Round>> {
    let raw = source.knockouts().context("knockouts request failed")?;
    let rounds = rounds_from_raw(&raw)?;
    Ok(process_knockouts(&rounds))
}

fn build_fetch_pool() -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(fetch_parallelism())
        .thread_name(|idx| format!("fetch-{idx}"))
        .build()
        .ok()
}

fn fetch_parallelism() -> usize {
    env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(4)
        .clamp(2, 16)
}

/// Loads the data that stays fixed for the life of the process. Team names
/// are only needed by the outside pages.
pub fn load_reference(source: &dyn CompetitionSource, with_teams: bool) -> Result<ReferenceData> {
    let corners = source.corners().context("failed to load corners")?;
    let arenas = source.arenas().context("failed to load arenas")?;
    let teams = if with_teams {
        source.teams().context("failed to load teams")?
    } else {
        HashMap::new()
    };
    Ok(ReferenceData {
        corners,
        arenas,
        teams,
    })
}
