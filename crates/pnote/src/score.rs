//! The `PNote` event container and rendering.

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::Event;
use crate::{builder, smf, Result};

/// A set of notation events with deterministic rendering.
///
/// Events may be inserted in any order; [`fmt::Display`] re-applies the
/// canonical sort on every render, so the output text is a pure function
/// of the event set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PNote {
    events: Vec<Event>,
}

impl PNote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Convert an SMF byte buffer. Atomic: any parse error yields no
    /// events at all. Equal inputs produce byte-identical renderings.
    pub fn from_midi(bytes: &[u8]) -> Result<Self> {
        let smf = smf::parse_smf(bytes)?;
        let events = builder::build_events(&smf);
        debug!(
            tracks = smf.tracks.len(),
            events = events.len(),
            "converted MIDI buffer"
        );
        Ok(Self { events })
    }

    /// Convert from any byte source by buffering it first.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_midi(&bytes)
    }

    /// Append one event. Callers need not pre-sort.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events in insertion order. Rendering order may differ.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn sorted(&self) -> Vec<&Event> {
        let mut sorted: Vec<&Event> = self.events.iter().collect();
        // Stable, so exact duplicates keep insertion order.
        sorted.sort_by(|a, b| a.canonical_cmp(b));
        sorted
    }
}

impl fmt::Display for PNote {
    /// One event per line, newline-joined, no trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, event) in self.sorted().into_iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{event}")?;
        }
        Ok(())
    }
}
