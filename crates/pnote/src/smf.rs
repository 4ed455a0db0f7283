//! Standard MIDI File binary reader.
//!
//! Decodes the MThd/MTrk chunk container into per-track sequences of
//! absolute-tick-stamped raw events. Only the events the notation cares
//! about are emitted (notes, the three pedal controllers, program changes,
//! set-tempo metas); everything else is structurally consumed so the byte
//! cursor stays synchronized. All errors are fatal and carry the absolute
//! byte offset where decoding stopped.

use tracing::{debug, trace};

use crate::{Error, Result};

/// Controller numbers recognized by the notation.
pub(crate) const CC_SUSTAIN: u8 = 64;
pub(crate) const CC_SOSTENUTO: u8 = 66;
pub(crate) const CC_SOFT_PEDAL: u8 = 67;

/// A decoded low-level event at an absolute tick within its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawEvent {
    pub tick: u64,
    pub kind: RawKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawKind {
    NoteOn { channel: u8, key: u8, vel: u8 },
    NoteOff { channel: u8, key: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    TempoMeta { usec_per_quarter: u32 },
}

/// One track's events plus the tick where the track ends (the tick of its
/// last event, End-of-Track included). Ticks are nondecreasing.
#[derive(Debug, Clone)]
pub(crate) struct RawTrack {
    pub events: Vec<RawEvent>,
    pub end_tick: u64,
}

/// A fully decoded SMF container.
#[derive(Debug, Clone)]
pub(crate) struct SmfData {
    pub ppq: u16,
    pub tracks: Vec<RawTrack>,
}

/// Decode an SMF byte buffer into raw tracks.
pub(crate) fn parse_smf(bytes: &[u8]) -> Result<SmfData> {
    let mut cursor = Cursor { bytes, pos: 0 };

    let (ppq, track_count) = parse_header(&mut cursor)?;
    debug!(ppq, track_count, "parsed SMF header");

    let mut tracks = Vec::with_capacity(track_count as usize);
    while tracks.len() < track_count as usize {
        let track_index = tracks.len();
        let chunk_start = cursor.pos;
        let id = cursor.take(4).ok_or(Error::TruncatedChunk {
            track: track_index,
            offset: chunk_start,
        })?;
        let len = cursor.u32_be().ok_or(Error::TruncatedChunk {
            track: track_index,
            offset: chunk_start,
        })? as usize;
        let data_start = cursor.pos;
        let data_end = data_start.checked_add(len).filter(|&e| e <= bytes.len()).ok_or(
            Error::TruncatedChunk {
                track: track_index,
                offset: chunk_start,
            },
        )?;

        if id == b"MTrk" {
            let track = parse_track(&mut cursor, track_index, data_end)?;
            trace!(track = track_index, events = track.events.len(), "parsed track");
            tracks.push(track);
        } else {
            // Alien chunk between tracks: skip it whole.
            trace!(offset = chunk_start, "skipping non-MTrk chunk");
        }
        cursor.pos = data_end;
    }

    Ok(SmfData { ppq, tracks })
}

/// Validate the MThd chunk and return (ppq, track count).
fn parse_header(cursor: &mut Cursor) -> Result<(u16, u16)> {
    let malformed = |offset: usize, detail: &str| Error::MalformedHeader {
        offset,
        detail: detail.to_string(),
    };

    let magic = cursor
        .take(4)
        .ok_or_else(|| malformed(0, "truncated header"))?;
    if magic != b"MThd" {
        return Err(malformed(0, "bad magic, expected MThd"));
    }
    let len = cursor
        .u32_be()
        .ok_or_else(|| malformed(4, "truncated header"))? as usize;
    if len < 6 {
        return Err(malformed(4, "header chunk shorter than 6 bytes"));
    }
    let body_start = cursor.pos;
    let format = cursor
        .u16_be()
        .ok_or_else(|| malformed(body_start, "truncated header"))?;
    if format > 2 {
        return Err(malformed(body_start, "unsupported format type"));
    }
    let track_count = cursor
        .u16_be()
        .ok_or_else(|| malformed(body_start, "truncated header"))?;
    let division = cursor
        .u16_be()
        .ok_or_else(|| malformed(body_start, "truncated header"))?;
    // SMPTE division (bit 15 set) has no pulses-per-quarter to convert with.
    if division & 0x8000 != 0 {
        return Err(malformed(body_start + 4, "SMPTE division not supported"));
    }
    if division == 0 {
        return Err(malformed(body_start + 4, "zero pulses-per-quarter"));
    }
    // Longer-than-6 headers are legal; skip the extra declared bytes.
    let skip = len - 6;
    if cursor.take(skip).is_none() {
        return Err(malformed(cursor.pos, "truncated header"));
    }
    Ok((division, track_count))
}

/// Decode one MTrk chunk body up to `end`.
fn parse_track(cursor: &mut Cursor, track: usize, end: usize) -> Result<RawTrack> {
    let mut events = Vec::new();
    let mut tick: u64 = 0;
    let mut running: Option<u8> = None;

    while cursor.pos < end {
        tick += read_varlen(cursor, track, end)? as u64;

        let offset = cursor.pos;
        let first = peek(cursor, track, end)?;
        let status = if first & 0x80 != 0 {
            cursor.pos += 1;
            if first < 0xF0 {
                running = Some(first);
            }
            first
        } else {
            // Data byte: reuse the running status.
            running.ok_or(Error::UnexpectedByte {
                track,
                offset,
                byte: first,
            })?
        };

        match status {
            0xFF => {
                // Meta events cancel running status.
                running = None;
                let meta_type = read_u8(cursor, track, end)?;
                let len = read_varlen(cursor, track, end)? as usize;
                let payload_start = cursor.pos;
                if payload_start + len > end {
                    return Err(Error::TruncatedChunk {
                        track,
                        offset: payload_start,
                    });
                }
                match meta_type {
                    0x2F => {
                        // End of Track: remaining declared bytes are skipped
                        // by the caller.
                        cursor.pos = payload_start + len;
                        return Ok(RawTrack {
                            events,
                            end_tick: tick,
                        });
                    }
                    0x51 if len == 3 => {
                        let usec = u32::from(cursor.bytes[payload_start]) << 16
                            | u32::from(cursor.bytes[payload_start + 1]) << 8
                            | u32::from(cursor.bytes[payload_start + 2]);
                        if usec > 0 {
                            events.push(RawEvent {
                                tick,
                                kind: RawKind::TempoMeta {
                                    usec_per_quarter: usec,
                                },
                            });
                        } else {
                            trace!(track, tick, "ignoring zero set-tempo");
                        }
                    }
                    _ => {
                        trace!(track, tick, meta_type, "skipping meta event");
                    }
                }
                cursor.pos = payload_start + len;
            }
            0xF0 | 0xF7 => {
                // Sysex: length-prefixed in SMF, cancels running status.
                running = None;
                let len = read_varlen(cursor, track, end)? as usize;
                if cursor.pos + len > end {
                    return Err(Error::TruncatedChunk {
                        track,
                        offset: cursor.pos,
                    });
                }
                trace!(track, tick, len, "skipping sysex event");
                cursor.pos += len;
            }
            0xF1..=0xF6 | 0xF8..=0xFE => {
                // System common/realtime bytes have no place in an SMF track.
                return Err(Error::UnexpectedByte {
                    track,
                    offset,
                    byte: status,
                });
            }
            _ => {
                let channel = status & 0x0F;
                match status >> 4 {
                    0x8 => {
                        let key = read_data_byte(cursor, track, end)?;
                        let _vel = read_data_byte(cursor, track, end)?;
                        events.push(RawEvent {
                            tick,
                            kind: RawKind::NoteOff { channel, key },
                        });
                    }
                    0x9 => {
                        let key = read_data_byte(cursor, track, end)?;
                        let vel = read_data_byte(cursor, track, end)?;
                        let kind = if vel == 0 {
                            RawKind::NoteOff { channel, key }
                        } else {
                            RawKind::NoteOn { channel, key, vel }
                        };
                        events.push(RawEvent { tick, kind });
                    }
                    0xB => {
                        let controller = read_data_byte(cursor, track, end)?;
                        let value = read_data_byte(cursor, track, end)?;
                        if matches!(controller, CC_SUSTAIN | CC_SOSTENUTO | CC_SOFT_PEDAL) {
                            events.push(RawEvent {
                                tick,
                                kind: RawKind::ControlChange {
                                    channel,
                                    controller,
                                    value,
                                },
                            });
                        } else {
                            trace!(track, tick, controller, "skipping controller");
                        }
                    }
                    0xC => {
                        let program = read_data_byte(cursor, track, end)?;
                        events.push(RawEvent {
                            tick,
                            kind: RawKind::ProgramChange { channel, program },
                        });
                    }
                    // Polyphonic aftertouch and pitch bend: two data bytes.
                    0xA | 0xE => {
                        read_data_byte(cursor, track, end)?;
                        read_data_byte(cursor, track, end)?;
                    }
                    // Channel aftertouch: one data byte.
                    0xD => {
                        read_data_byte(cursor, track, end)?;
                    }
                    _ => unreachable!("status bytes >= 0xF0 handled above"),
                }
            }
        }
    }

    // Track without an End-of-Track meta: ends at its declared length.
    Ok(RawTrack {
        events,
        end_tick: tick,
    })
}

/// Variable-length quantity: big-endian base-128, high-bit continuation,
/// at most four encoded bytes.
fn read_varlen(cursor: &mut Cursor, track: usize, end: usize) -> Result<u32> {
    let start = cursor.pos;
    let mut value: u32 = 0;
    for _ in 0..4 {
        let byte = read_u8(cursor, track, end)?;
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::InvalidVarLength {
        track,
        offset: start,
    })
}

fn peek(cursor: &Cursor, track: usize, end: usize) -> Result<u8> {
    if cursor.pos < end {
        Ok(cursor.bytes[cursor.pos])
    } else {
        Err(Error::TruncatedChunk {
            track,
            offset: cursor.pos,
        })
    }
}

fn read_u8(cursor: &mut Cursor, track: usize, end: usize) -> Result<u8> {
    let byte = peek(cursor, track, end)?;
    cursor.pos += 1;
    Ok(byte)
}

/// Channel-voice data byte: the high bit must be clear, or the stream has
/// lost sync with its status bytes.
fn read_data_byte(cursor: &mut Cursor, track: usize, end: usize) -> Result<u8> {
    let offset = cursor.pos;
    let byte = read_u8(cursor, track, end)?;
    if byte & 0x80 != 0 {
        return Err(Error::UnexpectedByte {
            track,
            offset,
            byte,
        });
    }
    Ok(byte)
}

/// Byte cursor over the whole input buffer, so error offsets are absolute.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u16_be(&mut self) -> Option<u16> {
        let b = self.take(2)?;
        Some(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32_be(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
