use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::competition::{MatchSlot, RawMatch};

/// Gameplay length of a match. Schedule slots are longer because they include
/// changeover time, which is never shown to the audience as time left.
pub const MATCH_DURATION_SECS: i64 = 180;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub number: u32,
    pub teams: Vec<Option<String>>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Match {
    pub fn from_raw(raw: &RawMatch) -> Result<Self> {
        let start_time = parse_timestamp(&raw.start_time)
            .with_context(|| format!("match {} start_time", raw.num))?;
        let end_time = parse_timestamp(&raw.end_time)
            .with_context(|| format!("match {} end_time", raw.num))?;
        Ok(Self {
            number: raw.num,
            teams: raw.teams.clone(),
            start_time,
            end_time,
        })
    }

    /// Whole seconds until the match starts; negative once it has started.
    /// Evaluated against the clock on every call.
    pub fn seconds_to_start(&self) -> i64 {
        self.seconds_to_start_at(Utc::now())
    }

    pub fn seconds_to_start_at(&self, now: DateTime<Utc>) -> i64 {
        whole_seconds_between(now, self.start_time)
    }

    pub fn seconds_to_end(&self) -> i64 {
        self.seconds_to_end_at(Utc::now())
    }

    pub fn seconds_to_end_at(&self, now: DateTime<Utc>) -> i64 {
        whole_seconds_between(now, self.end_time)
    }

    pub fn team(&self, slot: usize) -> Option<&str> {
        self.teams.get(slot).and_then(|t| t.as_deref())
    }
}

/// Builds the match for one response position; `error` positions are `None`.
pub fn match_from_slot(slot: &MatchSlot) -> Result<Option<Match>> {
    match slot.scheduled() {
        Some(raw) => Match::from_raw(raw).map(Some),
        None => Ok(None),
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp {raw:?}"))
}

fn whole_seconds_between(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    (target - now).num_milliseconds().div_euclid(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn match_starting_at(start: DateTime<Utc>) -> Match {
        Match {
            number: 7,
            teams: vec![Some("ABC".to_string()), None],
            start_time: start,
            end_time: start + ChronoDuration::seconds(300),
        }
    }

    #[test]
    fn seconds_to_start_counts_down() {
        let now = Utc::now();
        let m = match_starting_at(now + ChronoDuration::seconds(10));
        assert_eq!(m.seconds_to_start_at(now), 10);
        let first = m.seconds_to_start_at(now + ChronoDuration::milliseconds(1500));
        let second = m.seconds_to_start_at(now + ChronoDuration::milliseconds(2500));
        assert_eq!(first, 8);
        assert!(second < first);
    }

    #[test]
    fn live_clock_is_within_a_second() {
        let m = match_starting_at(Utc::now() + ChronoDuration::seconds(10));
        let secs = m.seconds_to_start();
        assert!((9..=10).contains(&secs), "got {secs}");
    }

    #[test]
    fn partial_seconds_floor_towards_past() {
        let now = Utc::now();
        let m = match_starting_at(now - ChronoDuration::milliseconds(500));
        assert_eq!(m.seconds_to_start_at(now), -1);
        assert_eq!(m.seconds_to_end_at(now), 299);
    }

    #[test]
    fn error_slot_never_becomes_a_match() {
        let slot = MatchSlot::Absent {
            error: serde_json::Value::Bool(true),
        };
        assert!(match_from_slot(&slot).expect("absent is not an error").is_none());
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let raw = RawMatch {
            num: 3,
            arena: None,
            teams: Vec::new(),
            start_time: "soon".to_string(),
            end_time: "2026-04-12T10:05:00+01:00".to_string(),
        };
        assert!(Match::from_raw(&raw).is_err());
    }

    #[test]
    fn offsets_normalise_to_utc() {
        let raw = RawMatch {
            num: 3,
            arena: Some("A".to_string()),
            teams: vec![Some("ABC".to_string())],
            start_time: "2026-04-12T10:00:00+01:00".to_string(),
            end_time: "2026-04-12T10:05:00+01:00".to_string(),
        };
        let m = Match::from_raw(&raw).expect("valid");
        assert_eq!(m.start_time.to_rfc3339(), "2026-04-12T09:00:00+00:00");
        assert_eq!(m.team(0), Some("ABC"));
        assert_eq!(m.team(1), None);
    }
}
