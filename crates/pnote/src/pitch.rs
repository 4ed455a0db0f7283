//! Pitch names and their mapping to MIDI note numbers.
//!
//! MIDI note 60 is C4. Output spelling is canonical: black keys always use
//! sharps. Flat spellings are accepted on input and canonicalized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// Semitone offset from C (0-11)
    pub fn to_semitone(&self) -> i8 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    pub fn parse(c: char) -> Option<NoteName> {
        match c {
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            _ => None,
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        };
        write!(f, "{c}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    Sharp,
    Flat,
}

impl Accidental {
    pub fn to_semitone_offset(&self) -> i8 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

impl fmt::Display for Accidental {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accidental::Sharp => write!(f, "#"),
            Accidental::Flat => write!(f, "b"),
        }
    }
}

/// A named pitch with octave, e.g. `C4`, `F#2`, `A#-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    pub name: NoteName,
    pub accidental: Option<Accidental>,
    pub octave: i8,
}

impl Pitch {
    /// Canonical spelling of a MIDI note number, sharps only.
    pub fn from_midi(note: u8) -> Self {
        let (name, accidental) = match note % 12 {
            0 => (NoteName::C, None),
            1 => (NoteName::C, Some(Accidental::Sharp)),
            2 => (NoteName::D, None),
            3 => (NoteName::D, Some(Accidental::Sharp)),
            4 => (NoteName::E, None),
            5 => (NoteName::F, None),
            6 => (NoteName::F, Some(Accidental::Sharp)),
            7 => (NoteName::G, None),
            8 => (NoteName::G, Some(Accidental::Sharp)),
            9 => (NoteName::A, None),
            10 => (NoteName::A, Some(Accidental::Sharp)),
            11 => (NoteName::B, None),
            _ => unreachable!(),
        };
        Pitch {
            name,
            accidental,
            octave: (note / 12) as i8 - 1,
        }
    }

    /// MIDI note number (C4 = 60). The value is guaranteed in 0..=127 for
    /// pitches produced by [`Pitch::from_midi`] or parsed from text.
    pub fn midi_number(&self) -> u8 {
        let semitone = self.name.to_semitone()
            + self
                .accidental
                .map(|a| a.to_semitone_offset())
                .unwrap_or(0);
        let value = (self.octave as i16 + 1) * 12 + semitone as i16;
        value.clamp(0, 127) as u8
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(acc) = self.accidental {
            write!(f, "{acc}")?;
        }
        write!(f, "{}", self.octave)
    }
}

impl FromStr for Pitch {
    type Err = Error;

    /// Parse a pitch spelling. Flats are accepted and canonicalized to the
    /// sharp spelling, so `Db4` parses to the same pitch as `C#4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::pitch_from_str(s).ok_or_else(|| Error::InvalidPitch(s.to_string()))
    }
}
