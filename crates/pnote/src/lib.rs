//! MIDI to PNote converter.
//!
//! This crate translates a Standard MIDI File's binary event stream into
//! PNote: a deterministic, line-oriented textual notation that preserves
//! pitch, timing, velocity, and a fixed set of performance controls
//! (sustain, soft pedal, sostenuto, tempo, instrument).
//!
//! Conversion is a pure function of the input bytes: equal inputs always
//! produce byte-identical output, and rendering re-applies the canonical
//! event order no matter how events were inserted.
//!
//! # Example
//!
//! ```
//! use pnote::{ControlEvent, ControlName, ControlValue, Event, PNote};
//!
//! let mut score = PNote::new();
//! score.add_event(Event::Control(ControlEvent {
//!     name: ControlName::Tempo,
//!     value: ControlValue::Number(120),
//!     start: 0,
//! }));
//! assert_eq!(score.to_string(), "Tempo:120:start=0");
//! ```

pub mod event;
pub mod parser;
pub mod pitch;
pub mod score;

mod builder;
mod smf;
mod timing;

pub use event::{ControlEvent, ControlName, ControlValue, Event, NoteEvent};
pub use parser::parse;
pub use pitch::{Accidental, NoteName, Pitch};
pub use score::PNote;

/// Errors from MIDI conversion or PNote text parsing.
///
/// All MIDI-side errors are fatal and atomic: a failed conversion produces
/// no output at all. Byte offsets are absolute within the input buffer;
/// track indices are zero-based.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed header at offset {offset}: {detail}")]
    MalformedHeader { offset: usize, detail: String },

    #[error("track {track}: chunk truncated at offset {offset}")]
    TruncatedChunk { track: usize, offset: usize },

    #[error("track {track}: variable-length quantity at offset {offset} exceeds 4 bytes")]
    InvalidVarLength { track: usize, offset: usize },

    #[error("track {track}: unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte {
        track: usize,
        offset: usize,
        byte: u8,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid pitch '{0}'")]
    InvalidPitch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
