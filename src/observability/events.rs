//! Observable lifecycle events
//!
//! Events are explicit and typed so that every log line a deployment may
//! alert on has a stable name.

use std::fmt;

/// Observable events in duckpage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Provisioning begins
    StartupBegin,
    /// Provisioning complete, handler ready
    StartupComplete,
    /// Provisioning failed (FATAL)
    StartupFailed,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Backing store opened and pinged
    StoreOpened,
    /// Listener bound, accepting traffic
    Serving,

    // Init script
    /// Single init statement about to run
    InitStatement,

    // Requests
    /// SQL text about to be sent to the store
    QueryIssued,
    /// Request handled by the page router
    RequestServed,
    /// Request passed to the next handler
    RequestPassed,
    /// Store failure while serving a request
    UpstreamFailed,
    /// Health report produced
    HealthReported,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StartupBegin => "DUCKPAGE_STARTUP_BEGIN",
            Event::StartupComplete => "DUCKPAGE_STARTUP_COMPLETE",
            Event::StartupFailed => "DUCKPAGE_STARTUP_FAILED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpened => "STORE_OPENED",
            Event::Serving => "DUCKPAGE_SERVING",

            Event::InitStatement => "INIT_STATEMENT",

            Event::QueryIssued => "QUERY_ISSUED",
            Event::RequestServed => "REQUEST_SERVED",
            Event::RequestPassed => "REQUEST_PASSED",
            Event::UpstreamFailed => "UPSTREAM_FAILED",
            Event::HealthReported => "HEALTH_REPORTED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StartupFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
