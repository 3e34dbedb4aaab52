use quiz_core::model::percentage;
use quiz_core::time::format_elapsed;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Share of answered questions, rounded.
    #[must_use]
    pub fn percent(&self) -> u32 {
        percentage(self.answered as u64, self.total as u64)
    }
}

/// Elapsed time derived from stored timestamps; poll it as often as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime {
    pub session_secs: u64,
    /// `None` once the session has no active question.
    pub question_secs: Option<u64>,
}

impl ElapsedTime {
    /// Session clock formatted as `"{m}m {s}s"`.
    #[must_use]
    pub fn session_display(&self) -> String {
        format_elapsed(self.session_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_answered() {
        let progress = SessionProgress {
            total: 4,
            answered: 1,
            remaining: 3,
            is_complete: false,
        };
        assert_eq!(progress.percent(), 25);
    }

    #[test]
    fn session_display_uses_minutes() {
        let elapsed = ElapsedTime {
            session_secs: 125,
            question_secs: Some(5),
        };
        assert_eq!(elapsed.session_display(), "2m 5s");
    }
}
