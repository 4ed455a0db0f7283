//! Event types and the canonical total order over them.
//!
//! `Event` is the only type that crosses the crate's public boundary from
//! conversion. The ordering here is what makes output deterministic: it is
//! a total order over distinct events, so rendering does not depend on the
//! order events were inserted (exact duplicates keep insertion order, which
//! renders identically either way).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;

/// Performance controls recognized by the notation.
///
/// Variant order matches alphabetical order of the rendered names, which is
/// the tie-break order for controls at an equal start.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ControlName {
    Instr,
    SoftPedal,
    Sostenuto,
    Sustain,
    Tempo,
}

impl ControlName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlName::Instr => "Instr",
            ControlName::SoftPedal => "SoftPedal",
            ControlName::Sostenuto => "Sostenuto",
            ControlName::Sustain => "Sustain",
            ControlName::Tempo => "Tempo",
        }
    }
}

impl fmt::Display for ControlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A control's value: pedal state or a decimal number (BPM, program).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlValue {
    On,
    Off,
    Number(u32),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::On => write!(f, "on"),
            ControlValue::Off => write!(f, "off"),
            ControlValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A complete note: pitch, onset, duration, and velocity, with times in
/// sixty-fourth-note units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub start: u64,
    /// Always >= 1; sub-unit notes are floored to one unit.
    pub dur: u64,
    pub vel: u8,
}

/// A control change at a point in time, in sixty-fourth-note units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub name: ControlName,
    pub value: ControlValue,
    pub start: u64,
}

/// A notation event: either a note or a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Note(NoteEvent),
    Control(ControlEvent),
}

impl Event {
    pub fn start(&self) -> u64 {
        match self {
            Event::Note(n) => n.start,
            Event::Control(c) => c.start,
        }
    }

    /// Controls sort before notes at an equal start.
    fn kind_rank(&self) -> u8 {
        match self {
            Event::Control(_) => 0,
            Event::Note(_) => 1,
        }
    }

    /// The canonical total order: ascending start, controls before notes,
    /// controls by (name, value-as-string), notes by descending MIDI pitch.
    /// Returns `Equal` only for events that render identically, so a stable
    /// sort over this comparator yields deterministic output.
    pub fn canonical_cmp(&self, other: &Event) -> Ordering {
        self.start()
            .cmp(&other.start())
            .then_with(|| self.kind_rank().cmp(&other.kind_rank()))
            .then_with(|| match (self, other) {
                (Event::Control(a), Event::Control(b)) => a
                    .name
                    .cmp(&b.name)
                    .then_with(|| a.value.to_string().cmp(&b.value.to_string())),
                (Event::Note(a), Event::Note(b)) => {
                    b.pitch.midi_number().cmp(&a.pitch.midi_number())
                }
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Note(n) => write!(
                f,
                "{}:start={}:dur={}:vel={}",
                n.pitch, n.start, n.dur, n.vel
            ),
            Event::Control(c) => write!(f, "{}:{}:start={}", c.name, c.value, c.start),
        }
    }
}
