use std::time::{Duration, Instant};

/// A fixed-period timer driven by explicit `now` values.
#[derive(Debug, Clone)]
pub struct Cadence {
    period: Duration,
    next_due: Option<Instant>,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    /// Fires at most once per call. The first call always fires; later ones
    /// fire when a period has passed since the last firing. Missed periods
    /// are dropped.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.period);
                true
            }
        }
    }

    /// Number of whole periods elapsed since the previous call. The first
    /// call starts the clock and returns 0. Missed periods are all returned,
    /// so a consumer ticking once per period keeps wall-clock pace.
    pub fn drain(&mut self, now: Instant) -> u32 {
        let Some(mut due) = self.next_due else {
            self.next_due = Some(now + self.period);
            return 0;
        };
        let mut ticks = 0u32;
        while now >= due {
            ticks = ticks.saturating_add(1);
            due += self.period;
        }
        self.next_due = Some(due);
        ticks
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.next_due {
            Some(due) => due.saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopTick {
    pub refresh: bool,
    pub render: bool,
}

#[derive(Debug, Clone)]
pub struct DualLoop {
    refresh: Cadence,
    render: Cadence,
    armed: bool,
    renders: u64,
}

impl DualLoop {
    pub fn new(refresh_period: Duration, render_period: Duration) -> Self {
        Self {
            refresh: Cadence::new(refresh_period),
            render: Cadence::new(render_period),
            armed: false,
            renders: 0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> LoopTick {
        let refresh = self.refresh.poll(now);
        let render = self.armed && self.render.poll(now);
        if render {
            self.renders = self.renders.saturating_add(1);
        }
        LoopTick { refresh, render }
    }

    /// The first completed refresh arms the render side.
    pub fn refresh_completed(&mut self) {
        self.armed = true;
    }

    /// Opens the render side without waiting for data, for screens that have
    /// something to show before their first refresh.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// How long the loop may block before one of the timers is due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        let refresh = self.refresh.time_until_due(now);
        if !self.armed {
            return refresh;
        }
        refresh.min(self.render.time_until_due(now))
    }
}
