/// Progress is counted in thousandths so that page length does not drift.
const PROGRESS_SCALE: u32 = 1000;
/// 0.003 of a page per tick.
const PROGRESS_STEP: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Schedule,
    Scores,
    Leaderboard,
    Knockouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub kind: PageKind,
    pub name: String,
}

impl Page {
    pub fn new(kind: PageKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

pub fn default_pages() -> Vec<Page> {
    vec![
        Page::new(PageKind::Schedule, "Upcoming matches"),
        Page::new(PageKind::Scores, "League scores"),
        Page::new(PageKind::Leaderboard, "Leaderboard"),
        Page::new(PageKind::Knockouts, "Knockouts"),
    ]
}

/// Cycles through pages on a fixed progress timer. The rotator is the only
/// writer of its index and progress.
#[derive(Debug, Clone)]
pub struct PageRotator {
    pages: Vec<Page>,
    current_index: Option<usize>,
    progress: u32,
    advances: u64,
}

impl PageRotator {
    /// Starts before the first page and immediately moves onto it.
    pub fn new(pages: Vec<Page>) -> Self {
        let mut rotator = Self {
            pages,
            current_index: None,
            progress: 0,
            advances: 0,
        };
        rotator.next_page();
        rotator
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_index.and_then(|idx| self.pages.get(idx))
    }

    /// Position shown to viewers, counting from 1.
    pub fn display_position(&self) -> usize {
        self.current_index.map_or(0, |idx| idx + 1)
    }

    pub fn is_visible(&self, idx: usize) -> bool {
        self.current_index == Some(idx)
    }

    /// Fraction of the current page's time already spent, in `[0, 1)`.
    pub fn progress(&self) -> f64 {
        f64::from(self.progress) / f64::from(PROGRESS_SCALE)
    }

    /// Page changes since construction, not counting the initial one.
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Advances progress by one step; returns true when the page changed.
    pub fn tick(&mut self) -> bool {
        self.progress += PROGRESS_STEP;
        if self.progress >= PROGRESS_SCALE {
            self.progress = 0;
            self.next_page();
            self.advances += 1;
            return true;
        }
        false
    }

    fn next_page(&mut self) {
        if self.pages.is_empty() {
            self.current_index = None;
            return;
        }
        let next = match self.current_index {
            Some(idx) if idx + 1 < self.pages.len() => idx + 1,
            _ => 0,
        };
        self.current_index = Some(next);
    }
}

/// Ticks needed to show one page, i.e. `ceil(1 / 0.003)`.
pub fn ticks_per_page() -> u32 {
    PROGRESS_SCALE.div_ceil(PROGRESS_STEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible_count(rotator: &PageRotator) -> usize {
        (0..rotator.page_count())
            .filter(|idx| rotator.is_visible(*idx))
            .count()
    }

    #[test]
    fn first_page_is_shown_on_start() {
        let rotator = PageRotator::new(default_pages());
        assert_eq!(rotator.current_index(), Some(0));
        assert_eq!(rotator.display_position(), 1);
        assert_eq!(rotator.progress(), 0.0);
        assert_eq!(rotator.advances(), 0);
    }

    #[test]
    fn full_cycle_returns_to_start() {
        let mut rotator = PageRotator::new(default_pages());
        let total = 4 * ticks_per_page();
        for _ in 0..total {
            rotator.tick();
            assert_eq!(visible_count(&rotator), 1);
            assert!(rotator.progress() < 1.0);
        }
        assert_eq!(rotator.advances(), 4);
        assert_eq!(rotator.current_index(), Some(0));
    }

    #[test]
    fn page_lasts_334_ticks() {
        let mut rotator = PageRotator::new(default_pages());
        for _ in 0..333 {
            assert!(!rotator.tick());
        }
        assert!((rotator.progress() - 0.999).abs() < 1e-9);
        assert!(rotator.tick());
        assert_eq!(rotator.current_index(), Some(1));
    }

    #[test]
    fn wraps_after_last_page() {
        let mut rotator = PageRotator::new(vec![
            Page::new(PageKind::Scores, "a"),
            Page::new(PageKind::Leaderboard, "b"),
        ]);
        let mut seen = Vec::new();
        for _ in 0..(3 * ticks_per_page()) {
            if rotator.tick() {
                seen.push(rotator.current_index());
            }
        }
        assert_eq!(seen, vec![Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn no_pages_means_nothing_visible() {
        let mut rotator = PageRotator::new(Vec::new());
        assert!(rotator.current_page().is_none());
        for _ in 0..ticks_per_page() {
            rotator.tick();
        }
        assert!(rotator.current_page().is_none());
        assert_eq!(rotator.display_position(), 0);
    }
}
