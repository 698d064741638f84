//! Driver bytecode opcodes

/// Note header: tie flag
pub const NOTE_TIE: u8 = 0x40;
/// Note header: length class field (bits 5-4)
pub const NOTE_CLASS_SHIFT: u8 = 4;
/// Note header: tone field, 0 for a rest
pub const NOTE_TONE_MASK: u8 = 0x0F;

/// Octave change, low nibble is the octave
pub const OCTAVE: u8 = 0x80;
/// Absolute volume, low nibble is the volume
pub const VOLUME: u8 = 0x90;
/// Relative volume down by the low nibble
pub const VOLUME_DOWN: u8 = 0xA0;
/// Relative volume up by the low nibble
pub const VOLUME_UP: u8 = 0xB0;

pub const HALT: u8 = 0xE9;
pub const ENVELOPE: u8 = 0xEA;
pub const NOISE_FREQ: u8 = 0xEB;
pub const NOISE_FREQ_REL: u8 = 0xEC;
/// Noise modes 1-3 are 0xED-0xEF
pub const NOISE_MODE: u8 = 0xED;
pub const LOOP_START: u8 = 0xF0;
pub const JUMP_SHORT: u8 = 0xF1;
pub const JUMP_LONG: u8 = 0xF2;
pub const LOOP_EXIT: u8 = 0xF3;
pub const WORK: u8 = 0xF4;
pub const VIBRATO: u8 = 0xF5;
pub const VIBRATO_TOGGLE: u8 = 0xF6;
pub const PLUS_LENGTH: u8 = 0xF7;
pub const TEMPO: u8 = 0xF8;
pub const LENGTH: u8 = 0xF9;
pub const GATE: u8 = 0xFA;
pub const DETUNE: u8 = 0xFB;
pub const DETUNE_REL: u8 = 0xFC;
pub const VIBRATO_DEPTH: u8 = 0xFD;
pub const LOOP_POINT: u8 = 0xFE;
pub const END: u8 = 0xFF;
