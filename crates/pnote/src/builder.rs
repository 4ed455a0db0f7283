//! Pairs raw MIDI events into notation events.
//!
//! Note-ons are held in a pending table keyed by (channel, pitch); each key
//! holds a stack so a re-triggered note-on opens an independent entry and a
//! note-off closes the most recent one. The table is scoped to one track.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::event::{ControlEvent, ControlName, ControlValue, Event, NoteEvent};
use crate::pitch::Pitch;
use crate::smf::{RawKind, SmfData, CC_SOFT_PEDAL, CC_SOSTENUTO, CC_SUSTAIN};
use crate::timing::{bpm, ticks_to_units, TempoMap};

/// Build the complete event set for a decoded SMF. All tracks are flattened
/// into one absolute timeline; ordering is left to the canonical sort.
pub(crate) fn build_events(smf: &SmfData) -> Vec<Event> {
    let ppq = smf.ppq;
    let tempo_map = TempoMap::from_tracks(&smf.tracks);
    let mut events = Vec::new();

    // Tempo controls come from the deduplicated map, not the raw stream, so
    // a tick carries at most one Tempo event.
    for &(tick, usec) in tempo_map.entries() {
        events.push(Event::Control(ControlEvent {
            name: ControlName::Tempo,
            value: ControlValue::Number(bpm(usec)),
            start: ticks_to_units(tick, ppq),
        }));
    }

    for track in &smf.tracks {
        // BTreeMap keeps leftover-note iteration deterministic.
        let mut pending: BTreeMap<(u8, u8), Vec<(u64, u8)>> = BTreeMap::new();

        for raw in &track.events {
            match raw.kind {
                RawKind::NoteOn { channel, key, vel } => {
                    pending.entry((channel, key)).or_default().push((raw.tick, vel));
                }
                RawKind::NoteOff { channel, key } => {
                    match pending.get_mut(&(channel, key)).and_then(Vec::pop) {
                        Some((on_tick, vel)) => {
                            events.push(note(key, on_tick, raw.tick, vel, ppq));
                        }
                        None => {
                            trace!(tick = raw.tick, key, "discarding orphan note-off");
                        }
                    }
                }
                RawKind::ControlChange {
                    controller, value, ..
                } => {
                    let name = match controller {
                        CC_SUSTAIN => ControlName::Sustain,
                        CC_SOSTENUTO => ControlName::Sostenuto,
                        CC_SOFT_PEDAL => ControlName::SoftPedal,
                        _ => continue,
                    };
                    let value = if value >= 64 {
                        ControlValue::On
                    } else {
                        ControlValue::Off
                    };
                    events.push(Event::Control(ControlEvent {
                        name,
                        value,
                        start: ticks_to_units(raw.tick, ppq),
                    }));
                }
                RawKind::ProgramChange { program, .. } => {
                    events.push(Event::Control(ControlEvent {
                        name: ControlName::Instr,
                        value: ControlValue::Number(u32::from(program)),
                        start: ticks_to_units(raw.tick, ppq),
                    }));
                }
                // Already folded into the tempo map.
                RawKind::TempoMeta { .. } => {}
            }
        }

        // Notes still pending at track end are closed at the final tick.
        for (&(_, key), stack) in &pending {
            for &(on_tick, vel) in stack {
                trace!(key, on_tick, "closing unterminated note at track end");
                events.push(note(key, on_tick, track.end_tick, vel, ppq));
            }
        }
    }

    debug!(events = events.len(), "built event set");
    events
}

fn note(key: u8, on_tick: u64, off_tick: u64, vel: u8, ppq: u16) -> Event {
    let start = ticks_to_units(on_tick, ppq);
    let end = ticks_to_units(off_tick, ppq);
    Event::Note(NoteEvent {
        pitch: Pitch::from_midi(key),
        start,
        dur: end.saturating_sub(start).max(1),
        vel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smf::{RawEvent, RawTrack};
    use pretty_assertions::assert_eq;

    fn smf(events: Vec<RawEvent>, end_tick: u64) -> SmfData {
        SmfData {
            ppq: 480,
            tracks: vec![RawTrack { events, end_tick }],
        }
    }

    fn on(tick: u64, key: u8, vel: u8) -> RawEvent {
        RawEvent {
            tick,
            kind: RawKind::NoteOn {
                channel: 0,
                key,
                vel,
            },
        }
    }

    fn off(tick: u64, key: u8) -> RawEvent {
        RawEvent {
            tick,
            kind: RawKind::NoteOff { channel: 0, key },
        }
    }

    #[test]
    fn pairs_note_on_with_note_off() {
        let events = build_events(&smf(vec![on(0, 60, 80), off(480, 60)], 480));
        assert_eq!(
            events,
            vec![Event::Note(NoteEvent {
                pitch: Pitch::from_midi(60),
                start: 0,
                dur: 16,
                vel: 80,
            })]
        );
    }

    #[test]
    fn zero_length_note_gets_one_unit() {
        let events = build_events(&smf(vec![on(0, 60, 80), off(1, 60)], 1));
        let Event::Note(note) = events[0] else {
            panic!("expected note");
        };
        assert_eq!(note.dur, 1);
    }

    #[test]
    fn orphan_note_off_is_discarded() {
        let events = build_events(&smf(vec![off(480, 60)], 480));
        assert_eq!(events, vec![]);
    }

    #[test]
    fn retriggered_note_closes_most_recent_first() {
        // Two note-ons on the same key before any note-off.
        let events = build_events(&smf(
            vec![on(0, 60, 80), on(480, 60, 90), off(960, 60), off(1440, 60)],
            1440,
        ));
        let notes: Vec<_> = events
            .iter()
            .map(|e| match e {
                Event::Note(n) => (n.start, n.dur, n.vel),
                _ => panic!("expected note"),
            })
            .collect();
        // First note-off closes the 480-tick onset (LIFO).
        assert_eq!(notes, vec![(16, 16, 90), (0, 48, 80)]);
    }

    #[test]
    fn unterminated_note_closes_at_track_end() {
        let events = build_events(&smf(vec![on(0, 60, 80)], 960));
        assert_eq!(
            events,
            vec![Event::Note(NoteEvent {
                pitch: Pitch::from_midi(60),
                start: 0,
                dur: 32,
                vel: 80,
            })]
        );
    }

    #[test]
    fn unterminated_note_at_track_end_tick_gets_one_unit() {
        let events = build_events(&smf(vec![on(960, 60, 80)], 960));
        let Event::Note(note) = events[0] else {
            panic!("expected note");
        };
        assert_eq!(note.dur, 1);
    }

    #[test]
    fn same_pitch_different_channels_are_independent() {
        let mut events_raw = vec![on(0, 60, 80), off(960, 60)];
        events_raw.insert(
            1,
            RawEvent {
                tick: 480,
                kind: RawKind::NoteOff { channel: 1, key: 60 },
            },
        );
        // The channel-1 note-off has no pending entry and is dropped.
        let events = build_events(&smf(events_raw, 960));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn pedal_controls_map_to_on_off() {
        let raw = vec![
            RawEvent {
                tick: 0,
                kind: RawKind::ControlChange {
                    channel: 0,
                    controller: CC_SUSTAIN,
                    value: 100,
                },
            },
            RawEvent {
                tick: 480,
                kind: RawKind::ControlChange {
                    channel: 0,
                    controller: CC_SUSTAIN,
                    value: 63,
                },
            },
            RawEvent {
                tick: 960,
                kind: RawKind::ControlChange {
                    channel: 0,
                    controller: CC_SOFT_PEDAL,
                    value: 64,
                },
            },
        ];
        let events = build_events(&smf(raw, 960));
        assert_eq!(
            events,
            vec![
                Event::Control(ControlEvent {
                    name: ControlName::Sustain,
                    value: ControlValue::On,
                    start: 0,
                }),
                Event::Control(ControlEvent {
                    name: ControlName::Sustain,
                    value: ControlValue::Off,
                    start: 16,
                }),
                Event::Control(ControlEvent {
                    name: ControlName::SoftPedal,
                    value: ControlValue::On,
                    start: 32,
                }),
            ]
        );
    }

    #[test]
    fn program_change_maps_to_instr() {
        let raw = vec![RawEvent {
            tick: 0,
            kind: RawKind::ProgramChange {
                channel: 0,
                program: 41,
            },
        }];
        let events = build_events(&smf(raw, 0));
        assert_eq!(
            events,
            vec![Event::Control(ControlEvent {
                name: ControlName::Instr,
                value: ControlValue::Number(41),
                start: 0,
            })]
        );
    }

    #[test]
    fn tempo_meta_maps_to_bpm_control() {
        let raw = vec![RawEvent {
            tick: 0,
            kind: RawKind::TempoMeta {
                usec_per_quarter: 500_000,
            },
        }];
        let events = build_events(&smf(raw, 0));
        assert_eq!(
            events,
            vec![Event::Control(ControlEvent {
                name: ControlName::Tempo,
                value: ControlValue::Number(120),
                start: 0,
            })]
        );
    }

    #[test]
    fn repeated_tempo_at_one_tick_emits_once() {
        let raw = vec![
            RawEvent {
                tick: 0,
                kind: RawKind::TempoMeta {
                    usec_per_quarter: 500_000,
                },
            },
            RawEvent {
                tick: 0,
                kind: RawKind::TempoMeta {
                    usec_per_quarter: 400_000,
                },
            },
        ];
        let events = build_events(&smf(raw, 0));
        assert_eq!(
            events,
            vec![Event::Control(ControlEvent {
                name: ControlName::Tempo,
                value: ControlValue::Number(150),
                start: 0,
            })]
        );
    }
}
