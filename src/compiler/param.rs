//! Numeric parameter parsing

use super::cursor::Cursor;

/// Prefix markers seen while reading a parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamFlags {
    pub percent: bool,
    pub plus: bool,
    pub minus: bool,
    /// No digit followed the prefixes
    pub no_value: bool,
}

/// A parameter as written: flags plus a saturated 16-bit magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub flags: ParamFlags,
    pub value: u16,
}

/// Read `[%][+|-]digits`, blanks allowed between the parts.
///
/// Missing digits are reported through `flags.no_value`, never as an error;
/// the prefix flags are reported either way.
pub fn parse_param(cur: &mut Cursor) -> Param {
    let mut flags = ParamFlags::default();

    cur.skip_blanks();
    if cur.eat(b'%') {
        flags.percent = true;
        cur.skip_blanks();
    }
    if cur.eat(b'-') {
        flags.minus = true;
        cur.skip_blanks();
    } else if cur.eat(b'+') {
        flags.plus = true;
        cur.skip_blanks();
    }

    match read_digits(cur) {
        Some(value) => Param { flags, value },
        None => {
            flags.no_value = true;
            Param { flags, value: 0 }
        }
    }
}

/// Read an unsigned decimal literal after optional blanks
pub fn read_unsigned(cur: &mut Cursor) -> Option<u16> {
    cur.skip_blanks();
    read_digits(cur)
}

/// Read an optionally signed decimal literal after optional blanks
pub fn read_signed(cur: &mut Cursor) -> Option<i32> {
    cur.skip_blanks();
    let negative = match cur.peek() {
        Some(b'-') => {
            cur.bump();
            true
        }
        Some(b'+') => {
            cur.bump();
            false
        }
        _ => false,
    };
    let magnitude = i32::from(read_unsigned(cur)?);
    Some(if negative { -magnitude } else { magnitude })
}

/// Consume a `,` separator after optional blanks
pub fn eat_comma(cur: &mut Cursor) -> bool {
    cur.skip_blanks();
    cur.eat(b',')
}

/// Saturates at 65535 instead of overflowing
fn read_digits(cur: &mut Cursor) -> Option<u16> {
    if !matches!(cur.peek(), Some(b'0'..=b'9')) {
        return None;
    }
    let mut value: u32 = 0;
    while let Some(b @ b'0'..=b'9') = cur.peek() {
        value = (value * 10 + u32::from(b - b'0')).min(u32::from(u16::MAX));
        cur.bump();
    }
    Some(value as u16)
}

/// Signed-magnitude byte: bit 7 is the sign, bits 6-0 the absolute value
pub fn sign_byte(v: i32) -> u8 {
    if v >= 0 {
        (v & 0x7F) as u8
    } else {
        0x80 | ((-v) & 0x7F) as u8
    }
}
