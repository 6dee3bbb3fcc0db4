//! Shared logging utilities
//!
//! Console output goes through the usual `tracing_subscriber` fmt layer. Every
//! record that passes the level filter is also copied into a [`LogSink`], an
//! explicit buffer that the audit publisher drains at the end of a run and
//! posts to the forum log topic.

use chrono::Local;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;

/// Buffer of formatted log records captured during a run
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    records: Arc<Mutex<Vec<String>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already formatted record
    pub fn push(&self, record: String) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    /// Snapshot of the records captured so far
    pub fn records(&self) -> Vec<String> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Take all records, leaving the sink empty for the next run
    pub fn drain(&self) -> Vec<String> {
        self.records
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().map(|r| r.is_empty()).unwrap_or(true)
    }

    /// Tracing layer writing into this sink
    pub fn layer(&self) -> LogSinkLayer {
        LogSinkLayer { sink: self.clone() }
    }
}

/// Layer that renders events as `YYYY-MM-DD HH:MM:SS - LEVEL - message`
pub struct LogSinkLayer {
    sink: LogSink,
}

impl<S> tracing_subscriber::Layer<S> for LogSinkLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        let mut fields = String::new();
        let mut visitor = RecordVisitor {
            message: &mut message,
            fields: &mut fields,
        };
        event.record(&mut visitor);

        self.sink.push(format!(
            "{} - {} - {}{}",
            format_timestamp(),
            event.metadata().level(),
            message,
            fields
        ));
    }
}

/// Visitor collecting the message and any extra `key=value` fields
struct RecordVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut String,
}

impl<'a> tracing::field::Visit for RecordVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }
}

/// Filter directive for the automation crates at the requested level
pub fn filter_directive(log_level: &str) -> String {
    let base_level = log_level.to_ascii_lowercase();
    format!("invitations={base_level},invitations_timer={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize console tracing plus the capture sink; returns the sink handle
pub fn init_tracing_with_level(log_level: Option<&str>) -> LogSink {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let sink = LogSink::new();
    let env_filter = EnvFilter::new(filter_directive(log_level.unwrap_or("info")));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sink.layer())
        .init();

    sink
}

/// Local wall-clock timestamp used in captured records
pub fn format_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
