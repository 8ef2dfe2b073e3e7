//! Derived-event output and run summary

use anyhow::{Context, Result};
use cep_engine::Event;
use std::collections::BTreeMap;
use std::io::Write;

/// Counters collected over one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub events_read: usize,
    pub events_derived: usize,
    /// Derived events per event type name
    pub derived_by_type: BTreeMap<String, usize>,
    pub live_flows: usize,
}

impl Summary {
    pub fn record_derived(&mut self, event: &Event) {
        self.events_derived += 1;
        *self
            .derived_by_type
            .entry(event.event_type.to_string())
            .or_insert(0) += 1;
    }

    pub fn log(&self) {
        log::info!("Events read:    {}", self.events_read);
        log::info!("Events derived: {}", self.events_derived);
        for (event_type, count) in &self.derived_by_type {
            log::info!("  {}: {}", event_type, count);
        }
        log::info!("Live flows at end of stream: {}", self.live_flows);
    }
}

/// Write one derived event as a JSON line
pub fn write_event<W: Write>(out: &mut W, event: &Event) -> Result<()> {
    serde_json::to_writer(&mut *out, event).context("Failed to serialize derived event")?;
    writeln!(out).context("Failed to write derived event")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_event_json_line() {
        let mut out = Vec::new();
        write_event(&mut out, &Event::new(7, "Bar")).unwrap();
        write_event(&mut out, &Event::new(8, "Baz")).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\"time\":7,\"type\":\"Bar\"}\n{\"time\":8,\"type\":\"Baz\"}\n"
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.record_derived(&Event::new(1, "Bar"));
        summary.record_derived(&Event::new(2, "Bar"));
        summary.record_derived(&Event::new(3, "Baz"));

        assert_eq!(summary.events_derived, 3);
        assert_eq!(summary.derived_by_type.get("Bar"), Some(&2));
        assert_eq!(summary.derived_by_type.get("Baz"), Some(&1));
    }
}
