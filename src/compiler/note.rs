//! Note and rest encoding

use super::channel::{ChannelState, Effect, StateChange};
use super::cursor::Cursor;
use super::length::parse_length;
use crate::driver::opcode;
use crate::error::{ErrorKind, Fault};

/// Tone index of a rest
pub const REST: u8 = 0;

/// Highest octave the driver plays
pub const MAX_OCTAVE: u8 = 8;

/// How a note header tells the driver its length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// Same as the `L` length
    Default = 0,
    /// Same as the `L+` length
    Plus = 1,
    /// One length byte follows
    Byte = 2,
    /// Two little-endian length bytes follow
    Word = 3,
}

impl LengthClass {
    pub fn of(ticks: u16, state: &ChannelState) -> Self {
        if ticks == state.default_len {
            Self::Default
        } else if ticks == state.plus_len {
            Self::Plus
        } else if ticks <= 255 {
            Self::Byte
        } else {
            Self::Word
        }
    }
}

/// Chromatic tone of a note letter: C=1 .. B=12
pub fn tone_of(letter: u8) -> Option<u8> {
    match letter.to_ascii_uppercase() {
        b'C' => Some(1),
        b'D' => Some(3),
        b'E' => Some(5),
        b'F' => Some(6),
        b'G' => Some(8),
        b'A' => Some(10),
        b'B' => Some(12),
        _ => None,
    }
}

/// Apply the key shift, carrying into the neighbouring octave
pub fn transpose(tone: u8, octave: u8, key_shift: i8) -> Result<(u8, u8), Fault> {
    let mut tone = i32::from(tone) + i32::from(key_shift);
    let mut octave = i32::from(octave);
    if tone > 12 {
        octave += 1;
        tone -= 12;
    } else if tone < 1 {
        octave -= 1;
        tone += 12;
    }
    if !(1..=i32::from(MAX_OCTAVE)).contains(&octave) {
        return Err(Fault::new(
            ErrorKind::NoteOverflow,
            "transposed note is out of range",
        ));
    }
    Ok((tone as u8, octave as u8))
}

/// Pack a note header byte
pub fn header(tone: u8, class: LengthClass, tie: bool) -> u8 {
    let tie = if tie { opcode::NOTE_TIE } else { 0 };
    tie | ((class as u8) << opcode::NOTE_CLASS_SHIFT) | (tone & opcode::NOTE_TONE_MASK)
}

/// Compile a note (`A`-`G`) or rest (`R`) whose letter was just consumed
pub fn compile_note(letter: u8, cur: &mut Cursor, state: &ChannelState) -> Result<Effect, Fault> {
    let (tone, octave) = if letter == b'R' {
        (REST, state.octave)
    } else {
        let mut tone = tone_of(letter)
            .ok_or_else(|| Fault::new(ErrorKind::Syntax, "invalid note (A-G)"))?;
        cur.skip_blanks();
        match cur.peek() {
            Some(b'#' | b'+') => {
                cur.bump();
                tone = (tone + 1).min(12);
            }
            Some(b'-') => {
                cur.bump();
                tone = tone.saturating_sub(1).max(1);
            }
            _ => {}
        }
        transpose(tone, state.octave, state.key_shift)?
    };

    let length = parse_length(cur, state.default_len)?;
    if length.flags.plus {
        return Err(Fault::range("'+' is not allowed in a note length"));
    }
    if length.flags.minus {
        return Err(Fault::range("'-' is not allowed in a note length"));
    }

    cur.skip_blanks();
    let tie = cur.eat(b'&');

    let mut effect = Effect::default();
    if octave != state.octave_last {
        effect.bytes.push(opcode::OCTAVE | octave);
        effect.change = Some(StateChange::EmittedOctave(octave));
    }
    let class = LengthClass::of(length.ticks, state);
    effect.bytes.push(header(tone, class, tie));
    match class {
        LengthClass::Byte => effect.bytes.push(length.ticks as u8),
        LengthClass::Word => effect.bytes.extend_from_slice(&length.ticks.to_le_bytes()),
        LengthClass::Default | LengthClass::Plus => {}
    }
    Ok(effect)
}
