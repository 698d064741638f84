//! Note length expressions
//!
//! Lengths are measured in ticks, 96 to the whole note. An expression is a
//! note-value denominator (`4`, `8`, ...) or a `%` tick count, followed by
//! any number of dots and optionally `^` plus another expression.

use super::cursor::Cursor;
use super::param::{parse_param, ParamFlags};
use crate::error::Fault;

/// Ticks in a whole note
pub const TICKS_PER_WHOLE: u16 = 96;

/// Largest total a length expression may produce
pub const MAX_TICKS: u32 = 32767;

/// Denominators that divide a whole note into an integral tick count
pub const DENOMINATORS: [u16; 12] = [1, 2, 3, 4, 6, 8, 12, 16, 24, 32, 48, 96];

/// A parsed length and the prefix flags of its first term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    pub ticks: u16,
    pub flags: ParamFlags,
}

/// Parse a length expression; a missing value selects `default_ticks`.
pub fn parse_length(cur: &mut Cursor, default_ticks: u16) -> Result<Length, Fault> {
    let param = parse_param(cur);
    let value_column = cur.column();

    let mut ticks = if param.flags.percent {
        if param.flags.no_value {
            return Err(Fault::range("'%' length has no value").at(value_column));
        }
        if !(1..=255).contains(&param.value) {
            return Err(Fault::range("'%' length out of range (1..255)").at(value_column));
        }
        u32::from(param.value)
    } else if param.flags.no_value {
        u32::from(default_ticks)
    } else if DENOMINATORS.contains(&param.value) {
        u32::from(TICKS_PER_WHOLE / param.value)
    } else {
        return Err(Fault::range(
            "invalid length (1,2,3,4,6,8,12,16,24,32,48,96)",
        )
        .at(value_column));
    };

    let dot_column = cur.column();
    let mut dots = 0;
    loop {
        cur.skip_blanks();
        if !cur.eat(b'.') {
            break;
        }
        dots += 1;
    }
    if dots > 0 {
        ticks = apply_dots(ticks, dots)
            .ok_or_else(|| Fault::range("dotted length is not playable").at(dot_column))?;
    }

    loop {
        cur.skip_blanks();
        if !cur.eat(b'^') {
            break;
        }
        ticks += u32::from(parse_length(cur, default_ticks)?.ticks);
    }

    if ticks == 0 || ticks > MAX_TICKS {
        return Err(Fault::range("length out of range (1..32767 ticks)").at(cur.column()));
    }

    Ok(Length {
        ticks: ticks as u16,
        flags: param.flags,
    })
}

/// Add half of the previous addition per dot; `None` if a half would be fractional
pub fn apply_dots(base: u32, dots: usize) -> Option<u32> {
    let mut total = base;
    let mut half = base;
    for _ in 0..dots {
        if half % 2 != 0 {
            return None;
        }
        half /= 2;
        total += half;
    }
    Some(total)
}
