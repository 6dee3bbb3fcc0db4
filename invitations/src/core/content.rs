//! Campaign content date/URL synchronisation
//!
//! The invitation body mentions the next Open Evening in prose ("... is on
//! Wednesday, 12th July ...") together with a link to its forum thread.
//! Patching is a literal substring replacement: a date phrase that cannot be
//! found verbatim is left alone while the URL is still replaced.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use shared::CalendarEvent;
use tracing::{error, info, warn};

use crate::error::{InvitationError, InvitationResult};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Month number for a full English month name
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS.iter().position(|m| *m == name).map(|i| i as u32 + 1)
}

/// Human readable date as written into the campaign body
pub fn format_event_date(date: NaiveDate) -> String {
    date.format("%A, %d %B").to_string()
}

pub struct ContentSynchronizer {
    event_pattern: Regex,
    url_pattern: Regex,
    date_phrase_pattern: Regex,
}

impl ContentSynchronizer {
    /// Build the extraction patterns for event threads under `calendar_url`
    pub fn new(calendar_url: &str) -> InvitationResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| InvitationError::config(format!("content pattern: {e}")))
        };
        let base = regex::escape(calendar_url.trim_end_matches('/'));

        Ok(Self {
            event_pattern: compile(r"is(?: on)? ([A-Za-z]+),? (\d{1,2})(?:st|nd|rd|th)?\s*([A-Za-z]+)")?,
            url_pattern: compile(&format!(r"{base}/t/[^/\s]+/\d+"))?,
            // two-digit days only; a single-digit phrase is left as written
            date_phrase_pattern: compile(r"\w+, \d{2}(?:st|nd|rd|th)? \w+")?,
        })
    }

    /// Event date mentioned in `content`; the year is taken from `today`
    pub fn extract_date(&self, content: &str, today: NaiveDate) -> Option<NaiveDate> {
        let captures = self.event_pattern.captures(content)?;
        let day: u32 = captures.get(2)?.as_str().parse().ok()?;
        let month_name = captures.get(3)?.as_str();
        let month = month_number(month_name)?;
        NaiveDate::from_ymd_opt(today.year(), month, day)
    }

    /// First event-thread URL in `content`
    pub fn extract_url(&self, content: &str) -> Option<String> {
        self.url_pattern.find(content).map(|m| m.as_str().to_string())
    }

    /// Date and URL currently advertised by the content
    pub fn extract(&self, content: &str, today: NaiveDate) -> Option<CalendarEvent> {
        let Some(date) = self.extract_date(content, today) else {
            error!("content: Could not find date or URL.");
            return None;
        };
        let Some(url) = self.extract_url(content) else {
            error!("content: Could not find date or URL.");
            return None;
        };
        Some(CalendarEvent { date, url })
    }

    /// Rewrite a stale date phrase and event URL to match `authoritative`
    pub fn synchronize(&self, content: &str, authoritative: &CalendarEvent, today: NaiveDate) -> String {
        if self.extract(content, today).as_ref() == Some(authoritative) {
            info!("content: Campaign Date and URL up to date. Nothing to do.");
            return content.to_string();
        }
        info!("content: Campaign Date and URL need updating.");

        let mut updated = content.to_string();
        match self.date_phrase_pattern.find(content) {
            Some(old_date) => {
                updated = updated.replace(old_date.as_str(), &format_event_date(authoritative.date));
            }
            None => warn!("content: No date phrase found, date left unchanged."),
        }
        match self.extract_url(content) {
            Some(old_url) => updated = updated.replace(&old_url, &authoritative.url),
            None => error!("content: No event URL found, URL left unchanged."),
        }
        updated
    }
}
