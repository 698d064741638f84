//! Single-letter commands other than notes and loops

use super::channel::{ChannelState, Effect, StateChange};
use super::cursor::Cursor;
use super::length::parse_length;
use super::note::MAX_OCTAVE;
use super::param::{eat_comma, read_signed, read_unsigned, sign_byte};
use crate::driver::opcode;
use crate::error::{ErrorKind, Fault};
use std::ops::RangeInclusive;

/// Compile the command `command` (already upper-cased and consumed).
///
/// `in_nest` tells whether a loop is open; `J` and `X` are rejected there.
pub fn dispatch(
    command: u8,
    cur: &mut Cursor,
    state: &ChannelState,
    in_nest: bool,
) -> Result<Effect, Fault> {
    match command {
        b'O' => {
            let v = required(read_unsigned(cur), "O")?;
            set_octave(i32::from(v))
        }
        b'>' => {
            let v = read_unsigned(cur).unwrap_or(1);
            set_octave(i32::from(state.octave) + i32::from(v))
        }
        b'<' => {
            let v = read_unsigned(cur).unwrap_or(1);
            set_octave(i32::from(state.octave) - i32::from(v))
        }
        b'V' => {
            let v = in_range(required(read_unsigned(cur), "V")?.into(), 0..=15, "V")?;
            Ok(Effect::emit(&[opcode::VOLUME + v as u8]))
        }
        b'(' => {
            let v = in_range(read_unsigned(cur).unwrap_or(1).into(), 1..=15, "(")?;
            Ok(Effect::emit(&[opcode::VOLUME_UP + v as u8]))
        }
        b')' => {
            let v = in_range(read_unsigned(cur).unwrap_or(1).into(), 1..=15, ")")?;
            Ok(Effect::emit(&[opcode::VOLUME_DOWN + v as u8]))
        }
        b'I' => {
            let v = in_range(required(read_unsigned(cur), "I")?.into(), 0..=255, "I")?;
            Ok(Effect::emit(&[opcode::WORK, v as u8]))
        }
        b'J' => {
            if in_nest {
                return Err(Fault::new(
                    ErrorKind::ReturnInNest,
                    "'J' cannot be used inside '[' ']'",
                ));
            }
            Ok(Effect::emit(&[opcode::LOOP_POINT]))
        }
        b'L' => set_length(cur, state),
        b'M' => vibrato(cur),
        b'N' => Ok(Effect::emit(&[opcode::VIBRATO_TOGGLE])),
        b'P' => {
            let v = required(read_unsigned(cur), "P")?;
            if !(1..=3).contains(&v) {
                return Err(Fault::range("'P' value out of range (1,2,3)"));
            }
            Ok(Effect::emit(&[opcode::NOISE_MODE + (v - 1) as u8]))
        }
        b'Q' => {
            let v = in_range(required(read_unsigned(cur), "Q")?.into(), 0..=255, "Q")?;
            Ok(Effect::emit(&[opcode::GATE, v as u8]))
        }
        b'S' => envelope(cur),
        b'T' => tempo(cur),
        b'U' => detune(cur),
        b'W' => noise_frequency(cur),
        b'X' => {
            if in_nest {
                return Err(Fault::new(
                    ErrorKind::ReturnInNest,
                    "'X' cannot be used inside '[' ']'",
                ));
            }
            cur.skip_line();
            Ok(Effect::with_change(&[opcode::HALT], StateChange::Halt))
        }
        b'_' => {
            let v = in_range(required(read_signed(cur), "_")?, -12..=12, "_")?;
            Ok(Effect::change(StateChange::KeyShift(v as i8)))
        }
        _ => Err(Fault::new(
            ErrorKind::Syntax,
            "character is not part of the MML command set",
        )),
    }
}

fn required<T>(value: Option<T>, command: &str) -> Result<T, Fault> {
    value.ok_or_else(|| Fault::range(format!("'{}' has no value", command)))
}

fn in_range(value: i32, range: RangeInclusive<i32>, command: &str) -> Result<i32, Fault> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(Fault::range(format!(
            "'{}' value out of range ({}..{})",
            command,
            range.start(),
            range.end()
        )))
    }
}

fn set_octave(octave: i32) -> Result<Effect, Fault> {
    if !(1..=i32::from(MAX_OCTAVE)).contains(&octave) {
        return Err(Fault::new(
            ErrorKind::OctaveRange,
            format!("octave out of range (1..{})", MAX_OCTAVE),
        ));
    }
    Ok(Effect::change(StateChange::Octave(octave as u8)))
}

/// `L n` / `L+ n`
fn set_length(cur: &mut Cursor, state: &ChannelState) -> Result<Effect, Fault> {
    let length = parse_length(cur, state.default_len)?;
    if length.flags.no_value {
        return Err(Fault::range("'L' has no value"));
    }
    if length.flags.minus {
        return Err(Fault::range("'-' is not allowed in 'L'"));
    }
    if length.ticks > 255 {
        return Err(Fault::range("'L' value out of range (1..255 ticks)"));
    }
    let ticks = length.ticks as u8;
    Ok(if length.flags.plus {
        Effect::with_change(
            &[opcode::PLUS_LENGTH, ticks],
            StateChange::PlusLength(length.ticks),
        )
    } else {
        Effect::with_change(
            &[opcode::LENGTH, ticks],
            StateChange::DefaultLength(length.ticks),
        )
    })
}

/// `M n1,n2,n3,n4` or `M%n`
fn vibrato(cur: &mut Cursor) -> Result<Effect, Fault> {
    cur.skip_blanks();
    if cur.eat(b'%') {
        let v = in_range(required(read_signed(cur), "M%")?, -127..=127, "M%")?;
        return Ok(Effect::emit(&[opcode::VIBRATO_DEPTH, sign_byte(v)]));
    }

    let malformed = || Fault::range("'M' parameters are malformed");
    let n1 = read_unsigned(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n2 = read_unsigned(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n3 = read_unsigned(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n4 = read_signed(cur).ok_or_else(malformed)?;

    let n1 = in_range(n1.into(), 0..=255, "M")?;
    let n2 = in_range(n2.into(), 0..=255, "M")?;
    let n3 = in_range(n3.into(), 0..=255, "M")?;
    let n4 = in_range(n4, -127..=127, "M")?;
    Ok(Effect::emit(&[
        opcode::VIBRATO,
        n1 as u8,
        n2 as u8,
        n3 as u8,
        sign_byte(n4),
    ]))
}

/// `S n1,n2,n3,n4,n5`; `n1 = 0` turns the envelope off
fn envelope(cur: &mut Cursor) -> Result<Effect, Fault> {
    let malformed = || Fault::range("'S' parameters are malformed");
    let n1 = read_signed(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n2 = read_unsigned(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n3 = read_signed(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n4 = read_signed(cur).ok_or_else(malformed)?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n5 = read_signed(cur).ok_or_else(malformed)?;

    let n1 = in_range(n1, -128..=255, "S")?;
    let n2 = in_range(n2.into(), 0..=255, "S")?;
    let n3 = in_range(n3, -128..=255, "S")?;
    let n4 = in_range(n4, -128..=255, "S")?;
    let n5 = in_range(n5, -127..=127, "S")?;

    if n1 == 0 {
        return Ok(Effect::emit(&[opcode::ENVELOPE, 0]));
    }
    Ok(Effect::emit(&[
        opcode::ENVELOPE,
        low_byte(n1),
        n2 as u8,
        low_byte(n3),
        low_byte(n4),
        sign_byte(n5),
    ]))
}

/// `T n1,n2`
fn tempo(cur: &mut Cursor) -> Result<Effect, Fault> {
    let malformed = || Fault::range("'T' parameters are malformed");
    let n1 = read_unsigned(cur).ok_or_else(malformed)?;
    let n1 = in_range(n1.into(), 1..=255, "T")?;
    if !eat_comma(cur) {
        return Err(malformed());
    }
    let n2 = read_unsigned(cur).ok_or_else(malformed)?;
    let n2 = in_range(n2.into(), 0..=255, "T")?;
    Ok(Effect::emit(&[opcode::TEMPO, n1 as u8, n2 as u8]))
}

/// `U%n` absolute, `U+n` / `U-n` relative
fn detune(cur: &mut Cursor) -> Result<Effect, Fault> {
    cur.skip_blanks();
    match cur.peek() {
        Some(b'%') => {
            cur.bump();
            let v = in_range(required(read_signed(cur), "U%")?, -127..=127, "U%")?;
            Ok(Effect::emit(&[opcode::DETUNE, sign_byte(v)]))
        }
        Some(b'+' | b'-') => {
            let v = in_range(required(read_signed(cur), "U+/-")?, -127..=127, "U+/-")?;
            Ok(Effect::emit(&[opcode::DETUNE_REL, low_byte(v)]))
        }
        _ => Err(Fault::range("'U' must be followed by '%', '+' or '-'")),
    }
}

/// `W n` absolute, `W+n` / `W-n` relative
fn noise_frequency(cur: &mut Cursor) -> Result<Effect, Fault> {
    cur.skip_blanks();
    if matches!(cur.peek(), Some(b'+' | b'-')) {
        let v = in_range(required(read_signed(cur), "W+/-")?, -31..=31, "W+/-")?;
        Ok(Effect::emit(&[opcode::NOISE_FREQ_REL, low_byte(v)]))
    } else {
        let v = in_range(required(read_unsigned(cur), "W")?.into(), 0..=31, "W")?;
        Ok(Effect::emit(&[opcode::NOISE_FREQ, v as u8]))
    }
}

/// Two's complement low byte
fn low_byte(v: i32) -> u8 {
    (v & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Result<Effect, Fault> {
        run_with(src, &ChannelState::default(), false)
    }

    fn run_with(src: &str, state: &ChannelState, in_nest: bool) -> Result<Effect, Fault> {
        let mut cur = Cursor::new(src);
        let command = cur.bump().unwrap().to_ascii_uppercase();
        dispatch(command, &mut cur, state, in_nest)
    }

    fn bytes(src: &str) -> Vec<u8> {
        run(src).unwrap().bytes
    }

    fn kind(src: &str) -> ErrorKind {
        run(src).unwrap_err().kind
    }

    #[test]
    fn test_octave_commands() {
        assert_eq!(run("O5").unwrap(), Effect::change(StateChange::Octave(5)));
        assert_eq!(run("o 8").unwrap(), Effect::change(StateChange::Octave(8)));
        assert_eq!(run(">").unwrap(), Effect::change(StateChange::Octave(5)));
        assert_eq!(run(">3").unwrap(), Effect::change(StateChange::Octave(7)));
        assert_eq!(run("<").unwrap(), Effect::change(StateChange::Octave(3)));
        assert_eq!(kind("O9"), ErrorKind::OctaveRange);
        assert_eq!(kind("O0"), ErrorKind::OctaveRange);
        assert_eq!(kind(">5"), ErrorKind::OctaveRange);
        assert_eq!(kind("<4"), ErrorKind::OctaveRange);
        assert_eq!(kind("O"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_volume() {
        assert_eq!(bytes("V0"), vec![0x90]);
        assert_eq!(bytes("V15"), vec![0x9F]);
        assert_eq!(bytes("("), vec![0xB1]);
        assert_eq!(bytes("(15"), vec![0xBF]);
        assert_eq!(bytes(")2"), vec![0xA2]);
        assert_eq!(kind("V16"), ErrorKind::ParameterRange);
        assert_eq!(kind("(0"), ErrorKind::ParameterRange);
        assert_eq!(kind(")16"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_simple_opcodes() {
        assert_eq!(bytes("I200"), vec![0xF4, 200]);
        assert_eq!(bytes("J"), vec![0xFE]);
        assert_eq!(bytes("N"), vec![0xF6]);
        assert_eq!(bytes("P1"), vec![0xED]);
        assert_eq!(bytes("P2"), vec![0xEE]);
        assert_eq!(bytes("P3"), vec![0xEF]);
        assert_eq!(bytes("Q0"), vec![0xFA, 0]);
        assert_eq!(bytes("T120,3"), vec![0xF8, 120, 3]);
        assert_eq!(kind("I256"), ErrorKind::ParameterRange);
        assert_eq!(kind("P4"), ErrorKind::ParameterRange);
        assert_eq!(kind("T0,1"), ErrorKind::ParameterRange);
        assert_eq!(kind("T1"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_length_commands() {
        assert_eq!(
            run("L8").unwrap(),
            Effect::with_change(&[0xF9, 12], StateChange::DefaultLength(12))
        );
        assert_eq!(
            run("L+4.").unwrap(),
            Effect::with_change(&[0xF7, 36], StateChange::PlusLength(36))
        );
        assert_eq!(bytes("L%200"), vec![0xF9, 200]);
        assert_eq!(kind("L"), ErrorKind::ParameterRange);
        assert_eq!(kind("L-8"), ErrorKind::ParameterRange);
        assert_eq!(kind("L1^1^1"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_vibrato() {
        assert_eq!(bytes("M1,2,3,-4"), vec![0xF5, 1, 2, 3, 0x84]);
        assert_eq!(bytes("M 10 , 20 , 30 , 40"), vec![0xF5, 10, 20, 30, 40]);
        assert_eq!(bytes("M%-5"), vec![0xFD, 0x85]);
        assert_eq!(kind("M1,2,3"), ErrorKind::ParameterRange);
        assert_eq!(kind("M1,2,3,128"), ErrorKind::ParameterRange);
        assert_eq!(kind("M%128"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_envelope() {
        assert_eq!(bytes("S0,1,2,3,4"), vec![0xEA, 0]);
        assert_eq!(bytes("S1,2,-3,4,-5"), vec![0xEA, 1, 2, 0xFD, 4, 0x85]);
        assert_eq!(kind("S1,2,3,4"), ErrorKind::ParameterRange);
        assert_eq!(kind("S1,-2,3,4,5"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_detune_and_noise() {
        assert_eq!(bytes("U%-3"), vec![0xFB, 0x83]);
        assert_eq!(bytes("U+3"), vec![0xFC, 3]);
        assert_eq!(bytes("U-3"), vec![0xFC, 0xFD]);
        assert_eq!(bytes("W31"), vec![0xEB, 31]);
        assert_eq!(bytes("W-1"), vec![0xEC, 0xFF]);
        assert_eq!(kind("U3"), ErrorKind::ParameterRange);
        assert_eq!(kind("U+128"), ErrorKind::ParameterRange);
        assert_eq!(kind("W32"), ErrorKind::ParameterRange);
        assert_eq!(kind("W+32"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_key_shift() {
        assert_eq!(run("_-12").unwrap(), Effect::change(StateChange::KeyShift(-12)));
        assert_eq!(run("_+3").unwrap(), Effect::change(StateChange::KeyShift(3)));
        assert_eq!(kind("_13"), ErrorKind::ParameterRange);
        assert_eq!(kind("_"), ErrorKind::ParameterRange);
    }

    #[test]
    fn test_halt_discards_line() {
        let mut cur = Cursor::new("X C D E");
        cur.bump();
        let effect = dispatch(b'X', &mut cur, &ChannelState::default(), false).unwrap();
        assert_eq!(effect, Effect::with_change(&[0xE9], StateChange::Halt));
        assert!(cur.is_eof());
    }

    #[test]
    fn test_return_in_nest() {
        let state = ChannelState::default();
        assert_eq!(run_with("J", &state, true).unwrap_err().kind, ErrorKind::ReturnInNest);
        assert_eq!(run_with("X", &state, true).unwrap_err().kind, ErrorKind::ReturnInNest);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(kind("Z"), ErrorKind::Syntax);
        assert_eq!(kind("1"), ErrorKind::Syntax);
    }
}
