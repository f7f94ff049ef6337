use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

/// Raw events emitted by a driver backend.
///
/// Network events carry a driver-assigned `request_id`; it is the only
/// correlation key between a request and its response or failure. URL-based
/// matching is deliberately absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverEvent {
    Console {
        level: ConsoleLevel,
        text: String,
        timestamp: DateTime<Utc>,
    },
    PageError {
        message: String,
        timestamp: DateTime<Utc>,
    },
    RequestStarted {
        request_id: String,
        url: String,
        method: String,
        timestamp: DateTime<Utc>,
    },
    ResponseReceived {
        request_id: String,
        url: String,
        status: u16,
        timestamp: DateTime<Utc>,
    },
    RequestFailed {
        request_id: String,
        url: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}
