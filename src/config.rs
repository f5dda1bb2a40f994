use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::competition::DEFAULT_BASE_URL;
use crate::state::{DisplayMode, ReferenceData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeRequest {
    Arena {
        arena: Option<String>,
        corner: Option<String>,
    },
    Outside,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenConfig {
    pub mode: ModeRequest,
    pub source: SourceKind,
    pub base_url: String,
    pub match_poll: Duration,
    pub render_interval: Duration,
    pub page_poll: Duration,
    pub page_tick: Duration,
    pub stale_after: Option<Duration>,
}

impl ScreenConfig {
    pub fn from_env(args: &[String]) -> Result<Self> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    /// `args` excludes the program name. Flags win over environment values.
    pub fn from_lookup(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode_name = args
            .first()
            .filter(|a| !a.starts_with("--"))
            .cloned()
            .or_else(|| env("SCREEN_MODE"))
            .unwrap_or_else(|| "arena".to_string())
            .to_lowercase();

        let mode = match mode_name.as_str() {
            "arena" => ModeRequest::Arena {
                arena: arg_value(args, "--arena").or_else(|| env("SCREEN_ARENA")),
                corner: arg_value(args, "--corner").or_else(|| env("SCREEN_CORNER")),
            },
            "outside" => ModeRequest::Outside,
            other => bail!("unknown screen mode {other:?} (expected \"arena\" or \"outside\")"),
        };

        let source = if args.iter().any(|a| a == "--demo") {
            SourceKind::Demo
        } else {
            match env("SCREEN_SOURCE")
                .unwrap_or_else(|| "http".to_string())
                .to_lowercase()
                .as_str()
            {
                "demo" => SourceKind::Demo,
                _ => SourceKind::Http,
            }
        };

        let base_url = arg_value(args, "--url")
            .or_else(|| env("SRCOMP_URL"))
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let match_poll = Duration::from_millis(
            parse_env(&env, "MATCH_POLL_MS").unwrap_or(1000).clamp(200, 60_000),
        );
        let render_interval = Duration::from_millis(
            parse_env(&env, "RENDER_INTERVAL_MS").unwrap_or(50).clamp(16, 1000),
        );
        let page_poll = Duration::from_secs(
            parse_env(&env, "PAGE_POLL_SECS").unwrap_or(30).clamp(5, 600),
        );
        let page_tick =
            Duration::from_millis(parse_env(&env, "PAGE_TICK_MS").unwrap_or(50).clamp(10, 1000));
        let stale_after = parse_env(&env, "STALE_AFTER_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            mode,
            source,
            base_url,
            match_poll,
            render_interval,
            page_poll,
            page_tick,
            stale_after,
        })
    }
}

/// Checks the requested arena and corner against what the competition
/// offers. The error lists every valid choice.
pub fn resolve_display_mode(
    request: &ModeRequest,
    reference: &ReferenceData,
) -> Result<DisplayMode> {
    let ModeRequest::Arena { arena, corner } = request else {
        return Ok(DisplayMode::Outside);
    };

    let arena = arena.as_deref().map(str::trim).filter(|a| !a.is_empty());
    let corner = corner.as_deref().and_then(|c| c.trim().parse::<usize>().ok());
    let (Some(arena), Some(corner)) = (arena, corner) else {
        return Err(bad_corner(reference));
    };
    if corner >= reference.corners.len() {
        return Err(bad_corner(reference));
    }
    if !reference.arenas.is_empty() && !reference.arenas.iter().any(|a| a == arena) {
        return Err(bad_corner(reference));
    }
    Ok(DisplayMode::Arena {
        arena: arena.to_string(),
        main_corner: corner,
    })
}

pub fn corner_choices(reference: &ReferenceData) -> Vec<String> {
    reference
        .arenas
        .iter()
        .flat_map(|arena| {
            (0..reference.corners.len()).map(move |corner| format!("{arena}:{corner}"))
        })
        .collect()
}

fn bad_corner(reference: &ReferenceData) -> anyhow::Error {
    let mut lines = corner_choices(reference)
        .into_iter()
        .map(|choice| {
            let (arena, corner) = choice.rsplit_once(':').unwrap_or((choice.as_str(), ""));
            format!("  {choice}    arena --arena={arena} --corner={corner}")
        })
        .collect::<Vec<_>>();
    if lines.is_empty() {
        lines.push("  (the competition lists no arenas or corners)".to_string());
    }
    anyhow!(
        "Invalid arena corner specified\nPlease choose a suitable corner:\n{}",
        lines.join("\n")
    )
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn parse_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    env(key).and_then(|val| val.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::competition::Corner;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn reference() -> ReferenceData {
        ReferenceData {
            corners: (0..4)
                .map(|index| Corner {
                    index,
                    colour: "red".to_string(),
                })
                .collect(),
            arenas: vec!["A".to_string(), "B".to_string()],
            teams: HashMap::new(),
        }
    }

    #[test]
    fn defaults_without_env() {
        let cfg = ScreenConfig::from_lookup(&[], |_| None).expect("defaults");
        assert_eq!(
            cfg.mode,
            ModeRequest::Arena {
                arena: None,
                corner: None
            }
        );
        assert_eq!(cfg.source, SourceKind::Http);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.match_poll, Duration::from_secs(1));
        assert_eq!(cfg.render_interval, Duration::from_millis(50));
        assert_eq!(cfg.page_poll, Duration::from_secs(30));
        assert_eq!(cfg.page_tick, Duration::from_millis(50));
        assert_eq!(cfg.stale_after, None);
    }

    #[test]
    fn flags_override_env() {
        let env = HashMap::from([
            ("SCREEN_ARENA", "B"),
            ("SCREEN_CORNER", "1"),
            ("MATCH_POLL_MS", "5"),
            ("STALE_AFTER_SECS", "45"),
        ]);
        let cfg = ScreenConfig::from_lookup(&args(&["arena", "--arena=A", "--demo"]), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .expect("valid");
        assert_eq!(
            cfg.mode,
            ModeRequest::Arena {
                arena: Some("A".to_string()),
                corner: Some("1".to_string())
            }
        );
        assert_eq!(cfg.source, SourceKind::Demo);
        // clamped to the minimum
        assert_eq!(cfg.match_poll, Duration::from_millis(200));
        assert_eq!(cfg.stale_after, Some(Duration::from_secs(45)));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(ScreenConfig::from_lookup(&args(&["lobby"]), |_| None).is_err());
    }

    #[test]
    fn valid_corner_resolves() {
        let request = ModeRequest::Arena {
            arena: Some("B".to_string()),
            corner: Some("3".to_string()),
        };
        let mode = resolve_display_mode(&request, &reference()).expect("valid");
        assert_eq!(
            mode,
            DisplayMode::Arena {
                arena: "B".to_string(),
                main_corner: 3
            }
        );
    }

    #[test]
    fn bad_corner_lists_choices() {
        let cases = [
            (Some("A"), Some("4")),
            (None, Some("0")),
            (Some("A"), Some("x")),
            (Some("C"), Some("0")),
        ];
        for (arena, corner) in cases {
            let request = ModeRequest::Arena {
                arena: arena.map(str::to_string),
                corner: corner.map(str::to_string),
            };
            let err = resolve_display_mode(&request, &reference()).expect_err("invalid");
            let msg = err.to_string();
            assert!(msg.starts_with("Invalid arena corner specified"));
            assert!(msg.contains("  B:3    arena --arena=B --corner=3"));
        }
        assert_eq!(corner_choices(&reference()).len(), 8);
    }
}
