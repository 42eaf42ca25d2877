//! Calendar section
//!
//! [`FirstMeeting`] reads today's meetings from a [`MeetingSource`]. The
//! production source is [`GraphCalendar`], which authenticates through an
//! [`OAuthTokenProvider`] that persists tokens between runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::briefing::Provider;
use crate::i18n::{self, keys};
use crate::models::{Meeting, MeetingWindow};
use crate::Result;

pub mod auth;
pub mod graph;

pub use auth::{
    ConsentPrompt, OAuthTokenProvider, StaticTokenProvider, StdinPrompt, StoredToken, TokenProvider,
    TokenState, TokenStore,
};
pub use graph::GraphCalendar;

/// Source of calendar events overlapping a window
#[async_trait]
pub trait MeetingSource: Send + Sync {
    async fn meetings(&self, window: &MeetingWindow) -> Result<Vec<Meeting>>;
}

/// `HH:MM: <subject>`, plus ` | <subject>` when the second meeting starts
/// at the same minute. `meetings` must be sorted by start.
#[must_use]
pub fn format_first_meeting(meetings: &[Meeting], lang: &str) -> String {
    let Some(first) = meetings.first() else {
        return i18n::get(keys::NO_EVENTS, lang).to_string();
    };

    let mut line = format!("{}: {}", first.start.format("%H:%M"), first.subject);
    if let Some(second) = meetings.get(1) {
        if second.start == first.start {
            line.push_str(" | ");
            line.push_str(&second.subject);
        }
    }
    line
}

/// Meetings of `window`, sorted by start; ties keep source order
#[must_use]
pub fn meetings_in_window(mut meetings: Vec<Meeting>, window: &MeetingWindow) -> Vec<Meeting> {
    meetings.retain(|m| window.contains(m));
    meetings.sort_by_key(|m| m.start);
    meetings
}

/// The day's first meeting
pub struct FirstMeeting {
    source: Arc<dyn MeetingSource>,
    today: NaiveDate,
    lang: String,
}

impl FirstMeeting {
    pub fn new(source: Arc<dyn MeetingSource>, today: NaiveDate, lang: impl Into<String>) -> Self {
        Self {
            source,
            today,
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl Provider for FirstMeeting {
    fn name(&self) -> &str {
        "first_meeting"
    }

    #[instrument(name = "first_meeting", skip(self), fields(day = %self.today))]
    async fn fetch(&self) -> Result<String> {
        let window = MeetingWindow::for_day(self.today);
        let meetings = meetings_in_window(self.source.meetings(&window).await?, &window);
        debug!("{} meetings today", meetings.len());
        Ok(format_first_meeting(&meetings, &self.lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn meeting(subject: &str, start: (u32, u32), end: (u32, u32)) -> Meeting {
        Meeting::new(subject, at(start.0, start.1), at(end.0, end.1))
    }

    struct FixedMeetings(Vec<Meeting>);

    #[async_trait]
    impl MeetingSource for FixedMeetings {
        async fn meetings(&self, _window: &MeetingWindow) -> Result<Vec<Meeting>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_same_start_meetings_are_joined() {
        let meetings = vec![
            meeting("Standup", (9, 0), (9, 15)),
            meeting("Planning", (9, 0), (10, 0)),
        ];
        assert_eq!(format_first_meeting(&meetings, "en"), "09:00: Standup | Planning");
    }

    #[test]
    fn test_only_first_meeting_when_starts_differ() {
        let meetings = vec![
            meeting("Standup", (9, 0), (9, 15)),
            meeting("Review", (11, 30), (12, 0)),
            meeting("Retro", (11, 30), (12, 0)),
        ];
        assert_eq!(format_first_meeting(&meetings, "en"), "09:00: Standup");
    }

    #[test]
    fn test_no_meetings_is_localized() {
        assert_eq!(format_first_meeting(&[], "en"), "There are no events today.");
        assert_eq!(format_first_meeting(&[], "ru"), "Календарь на сегодня пуст.");
    }

    #[test]
    fn test_window_filter_and_sort() {
        let window = MeetingWindow::for_day(at(0, 0).date());
        let next_day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let meetings = vec![
            meeting("Lunch", (12, 0), (13, 0)),
            meeting("Late", (23, 0), (23, 30)),
            Meeting::new("Overnight", at(23, 0), next_day.and_hms_opt(1, 0, 0).unwrap()),
            meeting("Breakfast", (8, 0), (8, 30)),
        ];

        let subjects: Vec<_> = meetings_in_window(meetings, &window)
            .into_iter()
            .map(|m| m.subject)
            .collect();
        assert_eq!(subjects, ["Breakfast", "Lunch", "Late"]);
    }

    #[tokio::test]
    async fn test_provider_sorts_before_formatting() {
        let source = FixedMeetings(vec![
            meeting("Planning", (10, 0), (11, 0)),
            meeting("Standup", (9, 0), (9, 15)),
            meeting("Sync", (9, 0), (9, 30)),
        ]);
        let provider = FirstMeeting::new(Arc::new(source), at(0, 0).date(), "en");
        assert_eq!(provider.fetch().await.unwrap(), "09:00: Standup | Sync");
    }
}
