use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use arena_screens::competition::{CompetitionSource, HttpCompetition, parse_knockouts_json};
use arena_screens::config::{ScreenConfig, SourceKind};
use arena_screens::demo_source::DemoCompetition;
use arena_screens::knockout::{process_knockouts, rounds_from_raw};
use arena_screens::view::{format_clock, team_or_dash};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let raw = match parse_file_arg(&args) {
        Some(path) => {
            let body = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_knockouts_json(&body)?
        }
        None => {
            let config = ScreenConfig::from_env(&args)?;
            let source: Box<dyn CompetitionSource> = match config.source {
                SourceKind::Http => Box::new(HttpCompetition::new(config.base_url)),
                SourceKind::Demo => Box::new(DemoCompetition::new()),
            };
            source.knockouts().context("knockouts request failed")?
        }
    };

    let rounds = process_knockouts(&rounds_from_raw(&raw)?);
    if rounds.is_empty() {
        println!("No knockout matches");
        return Ok(());
    }

    for round in &rounds {
        println!("== {} round(s) after this ==", round.rounds_after_this);
        for group in &round.groups {
            println!("{}  {}", group.description, format_clock(group.time));
            for game in &group.games {
                let teams = game
                    .teams
                    .iter()
                    .map(|t| team_or_dash(t.as_deref()))
                    .collect::<Vec<_>>()
                    .join("  ");
                match group.arena_label(game) {
                    Some(arena) => println!("  {arena}: {teams}"),
                    None => println!("  {teams}"),
                }
            }
        }
        println!();
    }

    Ok(())
}

fn parse_file_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--file=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--file" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
