//! Event stream input
//!
//! Events are read as JSON lines: `{"time": 1700000000, "type": "Foo"}`.
//! `time` may also be an RFC 3339 string. Blank lines and lines starting
//! with `#` are skipped.

use anyhow::{Context, Result};
use cep_engine::{Event, Timestamp};
use chrono::DateTime;
use serde::Deserialize;
use std::io::BufRead;

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(default)]
    time: TimeField,
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeField {
    Seconds(Timestamp),
    Rfc3339(String),
}

impl Default for TimeField {
    fn default() -> Self {
        TimeField::Seconds(0)
    }
}

impl TimeField {
    fn to_timestamp(&self) -> Result<Timestamp> {
        match self {
            TimeField::Seconds(secs) => Ok(*secs),
            TimeField::Rfc3339(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp())
                .with_context(|| format!("Invalid RFC 3339 time: {:?}", text)),
        }
    }
}

/// Parse one input line; `Ok(None)` for blank and comment lines
pub fn parse_line(line: &str) -> Result<Option<Event>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let record: EventRecord =
        serde_json::from_str(trimmed).context("Malformed event record")?;
    let time = record.time.to_timestamp()?;
    Ok(Some(Event::new(time, record.event_type)))
}

/// Iterate over the events in a JSON-lines stream
///
/// Each item carries the 1-based line number it came from.
pub fn read_events<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, Event)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line_no = index + 1;
            let parsed = line
                .with_context(|| format!("Failed to read line {}", line_no))
                .and_then(|text| parse_line(&text))
                .with_context(|| format!("Line {}", line_no));
            match parsed {
                Ok(Some(event)) => Some(Ok((line_no, event))),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })
}
