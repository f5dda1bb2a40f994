use chrono::{DateTime, Utc};

use crate::timing::{MATCH_DURATION_SECS, Match};

/// Time-to-start reported to the countdown when there is no next match.
pub const NO_NEXT_MATCH: i64 = -1;

/// Latest answer to the `current,next` poll. Replaced wholesale on each poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentNext {
    pub current: Option<Match>,
    pub next: Option<Match>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotDisplay {
    /// `time_left` is positive while a match is being played and zero or
    /// negative (minus the time until start) while waiting for the next one.
    Showing {
        team: Option<String>,
        match_number: u32,
        time_left: i64,
    },
    Cleared,
}

impl CurrentNext {
    pub fn new(current: Option<Match>, next: Option<Match>) -> Self {
        Self { current, next }
    }

    /// Seconds of gameplay left in `current`, if it is still being played.
    pub fn in_progress_time_left(&self, now: DateTime<Utc>) -> Option<i64> {
        let current = self.current.as_ref()?;
        // add: time to the start of a running match is negative
        let time_left = MATCH_DURATION_SECS + current.seconds_to_start_at(now);
        (time_left > 0).then_some(time_left)
    }

    pub fn resolve_slot(&self, slot: usize, now: DateTime<Utc>) -> SlotDisplay {
        if let (Some(current), Some(time_left)) =
            (self.current.as_ref(), self.in_progress_time_left(now))
        {
            return SlotDisplay::Showing {
                team: current.team(slot).map(str::to_string),
                match_number: current.number,
                time_left,
            };
        }
        match self.next.as_ref() {
            Some(next) => SlotDisplay::Showing {
                team: next.team(slot).map(str::to_string),
                match_number: next.number,
                time_left: -next.seconds_to_start_at(now),
            },
            None => SlotDisplay::Cleared,
        }
    }

    /// One entry per corner, all evaluated against the same instant.
    pub fn resolve_slots(&self, corner_count: usize, now: DateTime<Utc>) -> Vec<SlotDisplay> {
        (0..corner_count)
            .map(|slot| self.resolve_slot(slot, now))
            .collect()
    }

    pub fn countdown_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.next
            .as_ref()
            .map(|next| next.seconds_to_start_at(now))
            .unwrap_or(NO_NEXT_MATCH)
    }
}
