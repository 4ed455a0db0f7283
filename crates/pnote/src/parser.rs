//! PNote text parser using winnow combinators.
//!
//! Reads the textual grammar back into a [`PNote`]: one event per line,
//! blank lines ignored. Flat spellings are accepted and canonicalized to
//! sharps; errors carry the 1-based line number.

use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::event::{ControlEvent, ControlName, ControlValue, Event, NoteEvent};
use crate::pitch::{Accidental, NoteName, Pitch};
use crate::score::PNote;
use crate::{Error, Result};

type PResult<T> = winnow::ModalResult<T>;

/// Parse PNote text into a score.
pub fn parse(input: &str) -> Result<PNote> {
    let mut score = PNote::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let event = parse_line(line).map_err(|message| Error::Syntax {
            line: idx + 1,
            message,
        })?;
        score.add_event(event);
    }
    Ok(score)
}

fn parse_line(line: &str) -> std::result::Result<Event, String> {
    let mut input = line;
    let event = alt((
        parse_control_event.map(Event::Control),
        parse_note_event.map(Event::Note),
    ))
    .parse_next(&mut input)
    .map_err(|_| format!("unrecognized event '{line}'"))?;
    if !input.is_empty() {
        return Err(format!("trailing input '{input}'"));
    }
    if let Event::Note(note) = &event {
        if note.dur == 0 {
            return Err("note duration must be at least 1".to_string());
        }
        if note.vel > 127 {
            return Err(format!("velocity {} exceeds 127", note.vel));
        }
    }
    Ok(event)
}

fn parse_control_event(input: &mut &str) -> PResult<ControlEvent> {
    let name = parse_control_name(input)?;
    ':'.parse_next(input)?;
    let value = parse_control_value(input)?;
    ":start=".parse_next(input)?;
    let start = parse_number::<u64>(input)?;
    Ok(ControlEvent { name, value, start })
}

fn parse_note_event(input: &mut &str) -> PResult<NoteEvent> {
    let pitch = parse_pitch(input)?;
    ":start=".parse_next(input)?;
    let start = parse_number::<u64>(input)?;
    ":dur=".parse_next(input)?;
    let dur = parse_number::<u64>(input)?;
    ":vel=".parse_next(input)?;
    let vel = parse_number::<u8>(input)?;
    Ok(NoteEvent {
        pitch,
        start,
        dur,
        vel,
    })
}

fn parse_control_name(input: &mut &str) -> PResult<ControlName> {
    alt((
        "SoftPedal".map(|_| ControlName::SoftPedal),
        "Sostenuto".map(|_| ControlName::Sostenuto),
        "Sustain".map(|_| ControlName::Sustain),
        "Tempo".map(|_| ControlName::Tempo),
        "Instr".map(|_| ControlName::Instr),
    ))
    .parse_next(input)
}

fn parse_control_value(input: &mut &str) -> PResult<ControlValue> {
    alt((
        "on".map(|_| ControlValue::On),
        "off".map(|_| ControlValue::Off),
        parse_number::<u32>.map(ControlValue::Number),
    ))
    .parse_next(input)
}

/// Parse a pitch spelling and canonicalize it (flats become sharps).
/// Fails if the spelling lands outside the MIDI range 0..=127.
fn parse_pitch(input: &mut &str) -> PResult<Pitch> {
    let name_char = one_of(['A', 'B', 'C', 'D', 'E', 'F', 'G']).parse_next(input)?;
    let name = match NoteName::parse(name_char) {
        Some(name) => name,
        None => unreachable!(), // one_of already validated the character
    };
    let accidental = opt(alt((
        '#'.map(|_| Accidental::Sharp),
        'b'.map(|_| Accidental::Flat),
    )))
    .parse_next(input)?;
    let negative = opt('-').parse_next(input)?.is_some();
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let octave: i16 = digits.parse().map_err(|_| backtrack())?;
    let octave = if negative { -octave } else { octave };

    let semitone = name.to_semitone() + accidental.map(|a| a.to_semitone_offset()).unwrap_or(0);
    let midi = (octave + 1) * 12 + i16::from(semitone);
    if !(0..=127).contains(&midi) {
        return Err(backtrack());
    }
    Ok(Pitch::from_midi(midi as u8))
}

fn parse_number<T: std::str::FromStr>(input: &mut &str) -> PResult<T> {
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    digits.parse().map_err(|_| backtrack())
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

pub(crate) fn pitch_from_str(s: &str) -> Option<Pitch> {
    let mut input = s;
    let pitch = parse_pitch(&mut input).ok()?;
    input.is_empty().then_some(pitch)
}
