//! Observability for duckpage
//!
//! This module provides:
//! - Structured logging (JSON, one line per event)
//! - Typed lifecycle events
//! - Scope-based begin/complete logging for startup phases
//!
//! # Usage
//!
//! ```ignore
//! use duckpage::observability::{log_event_with_fields, Event, Logger};
//!
//! Logger::info("CONFIG_LOADED", &[("table", "pages")]);
//! log_event_with_fields(Event::Serving, &[("addr", "0.0.0.0:8080")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    if event.is_fatal() {
        Logger::fatal(event.as_str(), fields);
    } else {
        Logger::info(event.as_str(), fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::StartupBegin);
        log_event(Event::StartupComplete);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("table", "pages")]);
    }
}
