//! Error reporting sink. Components receive an `Arc<dyn ErrorReporter>` instead of calling a
//! global client.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One captured failure or message, as handed to the sink.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub event_id: Uuid,
    pub level: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rendered error chain, outermost first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ErrorEvent {
    pub fn new(level: Severity) -> Self {
        ErrorEvent {
            event_id: Uuid::new_v4(),
            level,
            message: None,
            exception: None,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        self.exception = Some(chain);
        self
    }
}

/// Stamp an event with the time it was captured. The tag, the extra entry and the message suffix
/// share one value.
/// Existing tags and extra entries are kept; an event without a message stays without one.
pub fn stamp_event(mut event: ErrorEvent, now: DateTime<Local>) -> ErrorEvent {
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    event.tags.insert("timestamp".into(), timestamp.clone());
    event
        .extra
        .insert("timestamp".into(), serde_json::Value::String(timestamp.clone()));
    if let Some(message) = event.message.take() {
        event.message = Some(format!("{} [timestamp: {}]", message, timestamp));
    }
    event
}

pub trait ErrorReporter: Send + Sync {
    fn capture(&self, event: ErrorEvent);

    /// Report a caught failure together with a human-readable description of where it happened.
    fn report_error(&self, error: &(dyn std::error::Error + 'static), message: &str) {
        self.capture(
            ErrorEvent::new(Severity::Error)
                .with_error(error)
                .with_message(message),
        );
    }

    fn report_message(&self, level: Severity, message: &str) {
        self.capture(ErrorEvent::new(level).with_message(message));
    }
}

/// Emits events through `tracing`, tagged with the deployment environment.
pub struct TracingReporter {
    environment: String,
}

impl TracingReporter {
    pub fn new(environment: impl Into<String>) -> Self {
        TracingReporter {
            environment: environment.into(),
        }
    }
}

impl ErrorReporter for TracingReporter {
    fn capture(&self, mut event: ErrorEvent) {
        event
            .tags
            .insert("environment".into(), self.environment.clone());
        let event = stamp_event(event, Local::now());
        let message = event.message.as_deref().unwrap_or_default();
        let exception = event.exception.as_deref().unwrap_or_default();
        match event.level {
            Severity::Error => tracing::error!(
                event_id = %event.event_id,
                environment = %self.environment,
                exception,
                "{}",
                message
            ),
            Severity::Warning => tracing::warn!(
                event_id = %event.event_id,
                environment = %self.environment,
                exception,
                "{}",
                message
            ),
            Severity::Info => tracing::info!(
                event_id = %event.event_id,
                environment = %self.environment,
                "{}",
                message
            ),
        }
    }
}

/// Keeps captured events in memory.
#[derive(Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ErrorEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ErrorEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.message)
            .collect()
    }
}

impl ErrorReporter for MemoryReporter {
    fn capture(&self, event: ErrorEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn stamp_adds_same_timestamp_everywhere() {
        let event = stamp_event(
            ErrorEvent::new(Severity::Error).with_message("Test error message"),
            fixed_now(),
        );
        assert_eq!(event.tags["timestamp"], "2024-03-09 14:05:07");
        assert_eq!(event.extra["timestamp"], "2024-03-09 14:05:07");
        assert_eq!(
            event.message.as_deref(),
            Some("Test error message [timestamp: 2024-03-09 14:05:07]")
        );
    }

    #[test]
    fn stamp_preserves_existing_tags_and_extra() {
        let mut event = ErrorEvent::new(Severity::Error);
        event.tags.insert("existing_tag".into(), "tag_value".into());
        event
            .extra
            .insert("existing_extra".into(), serde_json::json!("extra_value"));
        let event = stamp_event(event, fixed_now());
        assert_eq!(event.tags["existing_tag"], "tag_value");
        assert_eq!(event.extra["existing_extra"], "extra_value");
        assert!(event.tags.contains_key("timestamp"));
    }

    #[test]
    fn stamp_does_not_invent_a_message() {
        let event = stamp_event(ErrorEvent::new(Severity::Warning), fixed_now());
        assert!(event.message.is_none());
        assert!(event.extra.contains_key("timestamp"));
    }

    #[test]
    fn report_error_records_chain_and_message() {
        let reporter = MemoryReporter::new();
        let err = crate::error::MigrationError::Copy {
            table: "lettings_address".into(),
            source: crate::error::AppError::NotFound("address 3".into()),
        };
        reporter.report_error(&err, "migration failed");
        let events = reporter.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Severity::Error);
        assert_eq!(events[0].message.as_deref(), Some("migration failed"));
        let exception = events[0].exception.as_deref().unwrap();
        assert!(exception.starts_with("copying lettings_address failed"));
        assert!(exception.ends_with("not found: address 3"));
    }
}
