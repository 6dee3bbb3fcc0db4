//! Open Evening lookup in the forum's event calendar

use chrono::NaiveDate;
use shared::{CalendarEvent, CalendarTopic};
use tracing::{debug, warn};

/// Whether a calendar topic announces an Open Evening
pub fn is_open_evening(title: &str) -> bool {
    let title = title.to_lowercase();
    title.contains("open") && title.contains("evening")
}

/// Date portion of an event start such as `2023-08-09T18:00:00.000Z`
pub fn event_date(start: &str) -> Option<NaiveDate> {
    let day = start.split('T').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Earliest Open Evening on or after `today`
///
/// Returns today's event when today is an Open Evening.
pub fn select_open_evening(topics: &[CalendarTopic], today: NaiveDate, base_url: &str) -> Option<CalendarEvent> {
    let base_url = base_url.trim_end_matches('/');
    let closest = topics
        .iter()
        .filter(|topic| is_open_evening(&topic.title))
        .filter_map(|topic| {
            let date = topic.event_start.as_deref().and_then(event_date)?;
            Some(CalendarEvent::new(date, format!("{}/t/{}/{}", base_url, topic.slug, topic.id)))
        })
        .filter(|event| event.date >= today)
        .min();

    match &closest {
        Some(event) => debug!("calendar: Next Open Evening: {}", event),
        None => warn!("calendar: No future Open Evening event found on the forum."),
    }
    closest
}
