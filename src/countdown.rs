/// Length of the pre-roll window, in seconds, during which the big countdown
/// is shown before the next match starts.
pub const PRE_ROLL_SECS: i64 = 5;

pub fn is_visible(time_to_start: i64) -> bool {
    (0..=PRE_ROLL_SECS).contains(&time_to_start)
}

/// Full-screen countdown shown over the corner view.
///
/// Text and visibility are only written when they change, so callers can
/// re-assert the same state every frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountdownOverlay {
    text: String,
    visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayChange {
    pub text: bool,
    pub visibility: bool,
}

impl OverlayChange {
    pub fn any(self) -> bool {
        self.text || self.visibility
    }
}

impl CountdownOverlay {
    pub fn new(initial_text: impl Into<String>) -> Self {
        Self {
            text: initial_text.into(),
            visible: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn update(&mut self, text: &str, time_to_start: i64) -> OverlayChange {
        let mut change = OverlayChange::default();
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
            change.text = true;
        }
        let visible = is_visible(time_to_start);
        if self.visible != visible {
            self.visible = visible;
            change.visibility = true;
        }
        change
    }
}
