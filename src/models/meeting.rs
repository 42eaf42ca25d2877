//! Calendar meeting model

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A calendar event reduced to what the briefing shows
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Meeting {
    /// Event subject line
    pub subject: String,
    /// Start in local wall-clock time
    pub start: NaiveDateTime,
    /// End in local wall-clock time
    pub end: NaiveDateTime,
}

impl Meeting {
    #[must_use]
    pub fn new(subject: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            subject: subject.into(),
            start,
            end,
        }
    }
}

/// The 24 hour query window starting at local midnight of a day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MeetingWindow {
    #[must_use]
    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::MIN);
        Self {
            start,
            end: start + Duration::hours(24),
        }
    }

    /// Start within `[start, end]` and end no later than `end`
    #[must_use]
    pub fn contains(&self, meeting: &Meeting) -> bool {
        meeting.start >= self.start && meeting.start <= self.end && meeting.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_window_spans_one_day() {
        let window = MeetingWindow::for_day(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert_eq!(window.start, at(17, 0, 0));
        assert_eq!(window.end, at(18, 0, 0));
    }

    #[test]
    fn test_window_membership() {
        let window = MeetingWindow::for_day(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert!(window.contains(&Meeting::new("Standup", at(17, 9, 0), at(17, 9, 15))));
        assert!(!window.contains(&Meeting::new("Late", at(17, 23, 0), at(18, 1, 0))));
        assert!(!window.contains(&Meeting::new("Yesterday", at(16, 23, 0), at(17, 0, 30))));
    }
}
