//! ObservationScope for automatic begin/complete logging
//!
//! - Logs BEGIN event on creation
//! - Logs COMPLETE event on `complete()`
//! - Logs FAILED on `fail()`, INCOMPLETE if dropped without either

use std::time::{Duration, Instant};

use super::logger::Logger;

/// A scope that logs the lifecycle of one startup phase
///
/// ```ignore
/// let scope = ObservationScope::with_fields("INIT_SCRIPT", &[("file", path)]);
/// // ... run statements ...
/// scope.complete_with_fields(&[("statements", "12")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: bool,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope, logging `{name}_BEGIN`
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope with fields repeated on every event
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let event = format!("{}_BEGIN", name);
        Logger::info(&event, fields);

        Self {
            name,
            completed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        let event = format!("{}_COMPLETE", self.name);
        let elapsed = self.timer.elapsed_ms();

        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.extend(extra_fields.iter().copied());
        all_fields.push(("elapsed_ms", &elapsed));

        Logger::info(&event, &all_fields);
    }

    /// Mark the scope as failed with a reason, logging `{name}_FAILED`
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        let event = format!("{}_FAILED", self.name);

        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.push(("reason", reason));

        Logger::error(&event, &all_fields);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}

/// A simple duration timer for logging elapsed time
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
