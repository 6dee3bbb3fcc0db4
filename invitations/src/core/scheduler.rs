//! Fixed bi-weekly cadence of the Open Evening
//!
//! Events recur every 14 days from a known reference date. The calendar
//! published on the forum is validated against this cadence before any
//! invitation goes out.

use chrono::{Duration, NaiveDate};
use shared::CalendarEvent;
use tracing::{debug, warn};

pub const CADENCE_DAYS: i64 = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduler {
    reference: NaiveDate,
}

impl Scheduler {
    pub fn new(reference: NaiveDate) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    /// Days from `today` to the next event; 0 when today is an event day
    pub fn days_until_next(&self, today: NaiveDate) -> i64 {
        let elapsed = (today - self.reference).num_days();
        (CADENCE_DAYS - elapsed.rem_euclid(CADENCE_DAYS)) % CADENCE_DAYS
    }

    pub fn next_event(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.days_until_next(today))
    }

    pub fn is_event_day(&self, today: NaiveDate) -> bool {
        self.days_until_next(today) == 0
    }

    /// Whether the calendar reports a usable upcoming event
    ///
    /// A reported date later than the computed one is accepted as a
    /// rescheduled event; an earlier one blocks invitations.
    pub fn has_valid_upcoming_event(&self, calendar_event: Option<&CalendarEvent>, today: NaiveDate) -> bool {
        let Some(event) = calendar_event else {
            warn!("scheduler: No upcoming Open Evening reported by the calendar.");
            return false;
        };

        let expected = self.next_event(today);
        if event.date == expected {
            debug!("scheduler: Calendar event matches the expected date {}.", expected);
            true
        } else if event.date > expected {
            debug!(
                "scheduler: Calendar event {} is later than the expected {}; treating as rescheduled.",
                event.date, expected
            );
            true
        } else {
            warn!(
                "scheduler: Calendar event {} precedes the expected date {}. Blocking invitations.",
                event.date, expected
            );
            false
        }
    }

    /// The calendar event when it passes validation
    pub fn authoritative_event(&self, calendar_event: Option<CalendarEvent>, today: NaiveDate) -> Option<CalendarEvent> {
        calendar_event.filter(|event| self.has_valid_upcoming_event(Some(event), today))
    }
}
