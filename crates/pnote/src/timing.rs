//! Tempo map and tick-to-unit conversion.
//!
//! The notation's time axis is tick-proportional and tempo-invariant: one
//! quarter note is always 16 sixty-fourth-note units, whatever the tempo.
//! Tempo entries only determine the value of emitted Tempo control events.

use crate::smf::{RawKind, RawTrack};

/// Explicit tempo entries across all tracks, ascending by tick, with the
/// last value winning at a repeated tick. Scoped to one conversion.
#[derive(Debug, Clone)]
pub(crate) struct TempoMap {
    entries: Vec<(u64, u32)>,
}

impl TempoMap {
    pub fn from_tracks(tracks: &[RawTrack]) -> Self {
        let mut collected: Vec<(u64, u32)> = tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .filter_map(|event| match event.kind {
                RawKind::TempoMeta { usec_per_quarter } => Some((event.tick, usec_per_quarter)),
                _ => None,
            })
            .collect();
        // Stable by tick so the last-collected value at a tick wins.
        collected.sort_by_key(|&(tick, _)| tick);

        let mut entries: Vec<(u64, u32)> = Vec::with_capacity(collected.len());
        for (tick, usec) in collected {
            match entries.last_mut() {
                Some(last) if last.0 == tick => last.1 = usec,
                _ => entries.push((tick, usec)),
            }
        }
        Self { entries }
    }

    /// Explicit entries only: a file without set-tempo events has none,
    /// and no default is synthesized.
    pub fn entries(&self) -> &[(u64, u32)] {
        &self.entries
    }
}

/// Convert an absolute tick to sixty-fourth-note units, rounding half up.
pub(crate) fn ticks_to_units(tick: u64, ppq: u16) -> u64 {
    let ppq = ppq as u64;
    (tick * 32 + ppq) / (ppq * 2)
}

/// Integer BPM for a tempo entry, rounding half up.
pub(crate) fn bpm(usec_per_quarter: u32) -> u32 {
    (60_000_000 + usec_per_quarter / 2) / usec_per_quarter
}
