use std::time::{Duration, Instant};

/// Default time a notice stays visible
pub const NOTICE_DURATION: Duration = Duration::from_millis(3200);

/// A transient user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub shown_at: Instant,
}

/// Holds at most one notice; a new one replaces the old one and each expires
/// on its own timer.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    current: Option<Notice>,
    duration: Duration,
}

impl NoticeBoard {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    pub fn show(&mut self, text: impl Into<String>) {
        self.show_at(text, Instant::now());
    }

    pub fn show_at(&mut self, text: impl Into<String>, now: Instant) {
        self.current = Some(Notice {
            text: text.into(),
            shown_at: now,
        });
    }

    /// Visible notice text, if any.
    pub fn current(&self) -> Option<&str> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|notice| now.saturating_duration_since(notice.shown_at) < self.duration)
            .map(|notice| notice.text.as_str())
    }

    /// Drop an expired notice. Returns true when something was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.current.is_some() && self.current_at(now).is_none() {
            self.current = None;
            return true;
        }
        false
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(NOTICE_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_duration() {
        let mut board = NoticeBoard::default();
        let start = Instant::now();
        board.show_at("Network hiccup.", start);

        assert_eq!(board.current_at(start + Duration::from_millis(3199)), Some("Network hiccup."));
        assert_eq!(board.current_at(start + Duration::from_millis(3200)), None);
        assert!(board.expire(start + Duration::from_secs(4)));
        assert!(board.current.is_none());
    }

    #[test]
    fn new_notice_replaces_current_and_restarts_timer() {
        let mut board = NoticeBoard::default();
        let start = Instant::now();
        board.show_at("first", start);
        board.show_at("second", start + Duration::from_secs(3));

        let later = start + Duration::from_secs(5);
        assert_eq!(board.current_at(later), Some("second"));
        assert!(!board.expire(later));
    }
}
