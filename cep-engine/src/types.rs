//! Core types for the CEP engine
//!
//! This module defines the values that flow through the engine: event types,
//! timestamps, events themselves, and the error type shared by every
//! operation that can fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Timestamp type used throughout the engine
///
/// Seconds since the Unix epoch (or logical time in tests). Zero is a
/// reserved sentinel meaning "not yet set".
pub type Timestamp = i64;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CepError>;

/// Identifies a kind of event
///
/// Event types are named enumerants. The empty name is reserved for
/// [`EventType::UNDEFINED`], which is also the default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// The reserved "undefined" event type
    pub const UNDEFINED: EventType = EventType(Cow::Borrowed(""));

    /// Create an event type from a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Create an event type from a static name (usable in constants)
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The name of this event type
    pub fn name(&self) -> &str {
        &self.0
    }

    /// True if this is the reserved undefined type
    pub fn is_undefined(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            write!(f, "<undefined>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A timestamped occurrence of a given event type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Seconds since epoch (0 = unset)
    #[serde(default)]
    pub time: Timestamp,
    /// Kind of event
    #[serde(rename = "type")]
    pub event_type: EventType,
}

impl Event {
    /// Create an event at the given time
    pub fn new(time: Timestamp, event_type: impl Into<EventType>) -> Self {
        Self {
            time,
            event_type: event_type.into(),
        }
    }

    /// Create an event with only its type set (time left unset)
    pub fn of_type(event_type: impl Into<EventType>) -> Self {
        Self::new(0, event_type)
    }

    /// Convert the timestamp to a calendar time, if it is set and in range
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        if self.time == 0 {
            return None;
        }
        DateTime::from_timestamp(self.time, 0)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.datetime() {
            Some(dt) => write!(f, "{} @ {}", self.event_type, dt.to_rfc3339()),
            None => write!(f, "{} @ t={}", self.event_type, self.time),
        }
    }
}

/// Errors that can occur while processing events
#[derive(Debug, thiserror::Error)]
pub enum CepError {
    #[error("Flow already exists: {0}")]
    AlreadyExists(String),

    #[error("Recursion limit exceeded: derived events nested {depth} levels deep")]
    RecursionLimitExceeded { depth: usize },

    #[error("Flow id space exhausted for prefix {0:?}")]
    IdSpaceExhausted(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Emitter failed: {0}")]
    Emitter(String),
}
